//! Client bootstrap: builds the serenity client and runs it until shutdown.

use std::sync::Arc;

use serenity::all::{Client, GatewayIntents};
use tracing::info;

use dcx_core::config::Config;

use crate::handler::Handler;

pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    // MESSAGE_CONTENT is privileged and must be enabled in the developer
    // portal, otherwise exported messages come back with empty content.
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let handler = Handler::new(cfg.clone());

    let mut client = Client::builder(&cfg.discord_bot_token, intents)
        .event_handler(handler)
        .await?;

    info!("starting Discord client");
    client.start().await?;

    Ok(())
}
