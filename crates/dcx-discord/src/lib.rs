//! Discord adapter: slash commands, dispatch, and the serenity-backed
//! history source.

pub mod commands;
pub mod handler;
pub mod router;

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::GetMessages;
use serenity::http::Http;

use dcx_core::{
    domain::{ChannelId, MessageRecord},
    ports::HistorySource,
    Error, Result,
};

/// `HistorySource` backed by the Discord REST API.
///
/// One fetch, no pagination: Discord caps a single history call at 100
/// messages and returns them newest first, which is exactly the order the
/// export serializer expects.
pub struct DiscordHistory {
    http: Arc<Http>,
}

impl DiscordHistory {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HistorySource for DiscordHistory {
    async fn fetch_recent(&self, channel: ChannelId, limit: u8) -> Result<Vec<MessageRecord>> {
        let messages = serenity::model::id::ChannelId::new(channel.0)
            .messages(&self.http, GetMessages::new().limit(limit))
            .await
            .map_err(|e| Error::External(format!("message history fetch failed: {e}")))?;

        Ok(messages
            .into_iter()
            .map(|m| {
                let author_name = m
                    .author
                    .global_name
                    .clone()
                    .unwrap_or_else(|| m.author.name.clone());
                MessageRecord {
                    author_name,
                    content: m.content,
                    timestamp: m.timestamp.to_utc(),
                }
            })
            .collect())
    }
}
