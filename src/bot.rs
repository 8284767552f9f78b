use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{error, info};

use anyhow::Result;

use crate::config::Config;
use crate::llm::{Completion, LlmClient};

pub const COMMAND_PREFIX: &str = "!purpose";

/// Discord rejects messages longer than 2000 characters.
pub const MESSAGE_LIMIT: usize = 2000;

const USAGE_HINT: &str = "Please provide a question or statement, for example: \
     `!purpose I'm worried about my future in a world where there is AGI.`";

const ERROR_REPLY: &str = "Sorry, I had trouble generating a response. Please try again later.";

/// Extract the query from a `!purpose` invocation. Returns `None` for
/// anything that is not the command (including words that merely share the
/// prefix, like `!purposeful`); the query may be empty.
fn parse_command(content: &str) -> Option<&str> {
    let rest = content.strip_prefix(COMMAND_PREFIX)?;
    if rest.is_empty() {
        return Some("");
    }
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Build the outbound messages for one command invocation. An empty query
/// never reaches the completion provider; provider failures are logged and
/// collapse into a single generic reply.
async fn command_replies(llm: &dyn Completion, system_prompt: &str, query: &str) -> Vec<String> {
    if query.is_empty() {
        return vec![USAGE_HINT.to_string()];
    }

    match llm.complete(system_prompt, query).await {
        Ok(text) => split_message(&text, MESSAGE_LIMIT),
        Err(e) => {
            error!("Completion request failed: {:#}", e);
            vec![ERROR_REPLY.to_string()]
        }
    }
}

/// Split long responses at the platform message limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

pub struct Handler {
    llm: LlmClient,
    system_prompt: String,
}

impl Handler {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            llm: LlmClient::new(config.llm.clone())?,
            system_prompt: config.llm.system_prompt.clone(),
        })
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as {} (ID: {})", ready.user.name, ready.user.id);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Skip bot messages so the bot can never trigger itself
        if msg.author.bot {
            return;
        }

        let query = match parse_command(&msg.content) {
            Some(q) => q,
            None => return,
        };

        info!("Command from {}: {:?}", msg.author.name, query);

        if !query.is_empty() {
            // Show a typing indicator while the completion is in flight
            msg.channel_id.broadcast_typing(&ctx.http).await.ok();
        }

        for chunk in command_replies(&self.llm, &self.system_prompt, query).await {
            if let Err(e) = msg.channel_id.say(&ctx.http, chunk).await {
                error!("Failed to send reply: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    struct MockLlm {
        calls: Mutex<Vec<(String, String)>>,
        reply: Option<String>,
    }

    impl MockLlm {
        fn replying(text: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply: Some(text.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply: None,
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Completion for MockLlm {
        async fn complete(&self, system_prompt: &str, user_query: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), user_query.to_string()));
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(anyhow!("simulated timeout")),
            }
        }
    }

    #[test]
    fn ignores_unrelated_messages() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("purpose life"), None);
    }

    #[test]
    fn prefix_must_be_a_whole_token() {
        assert_eq!(parse_command("!purposeful thoughts"), None);
        assert_eq!(parse_command("!purpose"), Some(""));
        assert_eq!(parse_command("!purpose life"), Some("life"));
    }

    #[test]
    fn query_is_trimmed() {
        assert_eq!(parse_command("!purpose   life  "), Some("life"));
        assert_eq!(parse_command("!purpose \t "), Some(""));
    }

    #[tokio::test]
    async fn empty_query_gets_usage_hint_without_calling_llm() {
        let llm = MockLlm::replying("unused");
        let replies = command_replies(&llm, "prompt", "").await;
        assert_eq!(replies, vec![USAGE_HINT.to_string()]);
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn query_is_forwarded_once_with_system_prompt() {
        let llm = MockLlm::replying("Stay curious.");
        let replies = command_replies(&llm, "coach prompt", "life").await;
        assert_eq!(replies, vec!["Stay curious.".to_string()]);
        assert_eq!(
            llm.calls(),
            vec![("coach prompt".to_string(), "life".to_string())]
        );
    }

    #[tokio::test]
    async fn provider_failure_becomes_one_generic_reply() {
        let llm = MockLlm::failing();
        let replies = command_replies(&llm, "prompt", "life").await;
        assert_eq!(replies, vec![ERROR_REPLY.to_string()]);
        assert_eq!(llm.calls().len(), 1);
    }

    #[tokio::test]
    async fn sequential_invocations_are_independent() {
        let llm = MockLlm::replying("ok");
        command_replies(&llm, "prompt", "first").await;
        command_replies(&llm, "prompt", "second").await;
        assert_eq!(
            llm.calls(),
            vec![
                ("prompt".to_string(), "first".to_string()),
                ("prompt".to_string(), "second".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn long_responses_split_within_the_limit() {
        let long = "word ".repeat(1000);
        let llm = MockLlm::replying(&long);
        let replies = command_replies(&llm, "prompt", "life").await;
        assert!(replies.len() > 1);
        assert!(replies.iter().all(|c| c.len() <= MESSAGE_LIMIT));
        assert_eq!(replies.concat(), long);
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(split_message("hello", 2000), vec!["hello".to_string()]);
    }

    #[test]
    fn split_prefers_newline_boundaries() {
        let text = format!("{}\n{}", "a".repeat(1500), "b".repeat(1500));
        let chunks = split_message(&text, 2000);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{}\n", "a".repeat(1500)));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_respects_utf8_boundaries() {
        let text = "é".repeat(3000);
        let chunks = split_message(&text, 2000);
        assert!(chunks.iter().all(|c| c.len() <= 2000));
        assert_eq!(chunks.concat(), text);
    }
}
