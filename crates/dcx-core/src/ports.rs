use async_trait::async_trait;

use crate::{
    domain::{ChannelId, MessageRecord},
    Result,
};

/// Hexagonal port for the chat-history source.
///
/// Implementations return the most recent messages of a channel **newest
/// first**, exactly as the platform history API hands them out. The export
/// serializer owns the reversal to chronological order; if this trait is ever
/// implemented against a source with a different natural order, that contract
/// must be re-verified, not assumed.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_recent(&self, channel: ChannelId, limit: u8) -> Result<Vec<MessageRecord>>;
}
