mod bot;
mod config;
mod llm;

use anyhow::{Context, Result};
use serenity::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::Handler;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,purposebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded");
    info!("  Model: {}", config.llm.model);
    info!("  Completion endpoint: {}", config.llm.base_url);

    let handler = Handler::new(&config)?;

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(handler)
        .await
        .context("Failed to create Discord client")?;

    info!("Bot is starting...");

    if let Err(e) = client.start().await {
        error!("Discord client error: {:#}", e);
        return Err(e.into());
    }

    Ok(())
}
