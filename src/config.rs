use anyhow::{bail, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub system_prompt: String,
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_system_prompt() -> String {
    "You are a warm, thoughtful coach who helps people reflect on purpose and \
     meaning in their lives. Offer grounded, encouraging guidance in a few \
     short paragraphs, and speak directly to the person asking."
        .to_string()
}

fn default_max_tokens() -> u32 {
    350
}

impl Config {
    /// Read configuration from the process environment. Required variables
    /// must be present and non-blank; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            match get(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => bail!("{} is not set", key),
            }
        };
        let optional = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            discord: DiscordConfig {
                bot_token: required("DISCORD_BOT_TOKEN")?,
            },
            llm: LlmConfig {
                api_key: required("OPENAI_API_KEY")?,
                model: optional("OPENAI_MODEL").unwrap_or_else(default_model),
                base_url: optional("OPENAI_BASE_URL").unwrap_or_else(default_base_url),
                system_prompt: optional("SYSTEM_PROMPT_TEXT")
                    .unwrap_or_else(default_system_prompt),
                max_tokens: default_max_tokens(),
            },
        })
    }
}
