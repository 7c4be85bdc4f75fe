use chrono::{DateTime, Utc};

/// Discord channel id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

/// A single chat message as supplied by the history source.
///
/// `content` may be empty and may contain quotes, newlines, or
/// HTML-significant characters; the export serializer owns all escaping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRecord {
    pub author_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
