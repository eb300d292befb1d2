//! In-memory channel directory.
//!
//! Holds the channels created through the REST API and their message
//! history. This is the optional topic-existence collaborator consulted by
//! the WebSocket ingress; the fan-out hub itself never reads it. History is
//! process-local and not persisted across restarts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Default page size for message history.
const DEFAULT_PAGE_LIMIT: usize = 20;
/// Largest page size a client may request.
const MAX_PAGE_LIMIT: usize = 100;

/// A chat channel known to the directory.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A message stored in a channel's history.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    pub id: String,
    pub channel_id: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One page of a channel's message history.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<StoredMessage>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
struct Inner {
    channels: HashMap<String, ChannelInfo>,
    messages: HashMap<String, Vec<StoredMessage>>,
    channel_seq: u64,
    message_seq: u64,
}

/// Thread-safe in-memory store of channels and their history.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    inner: RwLock<Inner>,
}

impl ChannelDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a channel, assigning it the next sequential ID.
    pub async fn create_channel(&self, name: &str) -> ChannelInfo {
        let mut inner = self.inner.write().await;
        inner.channel_seq += 1;
        let channel = ChannelInfo {
            id: inner.channel_seq.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        inner.channels.insert(channel.id.clone(), channel.clone());
        inner.messages.insert(channel.id.clone(), Vec::new());
        channel
    }

    /// Look up a channel by ID.
    pub async fn get_channel(&self, channel_id: &str) -> Option<ChannelInfo> {
        self.inner.read().await.channels.get(channel_id).cloned()
    }

    /// Whether a channel with this ID exists.
    pub async fn exists(&self, channel_id: &str) -> bool {
        self.inner.read().await.channels.contains_key(channel_id)
    }

    /// List all channels, ordered by creation.
    pub async fn list_channels(&self) -> Vec<ChannelInfo> {
        let inner = self.inner.read().await;
        let mut channels: Vec<_> = inner.channels.values().cloned().collect();
        channels.sort_by_key(|c| c.id.parse::<u64>().unwrap_or(u64::MAX));
        channels
    }

    /// Append a message to a channel's history.
    ///
    /// Returns `None` if the channel does not exist.
    pub async fn append_message(
        &self,
        channel_id: &str,
        author: &str,
        content: &str,
    ) -> Option<StoredMessage> {
        let mut inner = self.inner.write().await;
        if !inner.channels.contains_key(channel_id) {
            return None;
        }
        inner.message_seq += 1;
        let message = StoredMessage {
            id: inner.message_seq.to_string(),
            channel_id: channel_id.to_string(),
            author: author.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        inner
            .messages
            .entry(channel_id.to_string())
            .or_default()
            .push(message.clone());
        Some(message)
    }

    /// Fetch one page of a channel's message history.
    ///
    /// `page` is 1-based; `limit` falls back to the default when absent and
    /// is clamped to the maximum. Returns `None` if the channel does not
    /// exist; a page past the end is empty, not an error.
    pub async fn messages(
        &self,
        channel_id: &str,
        page: Option<usize>,
        limit: Option<usize>,
    ) -> Option<MessagePage> {
        let inner = self.inner.read().await;
        if !inner.channels.contains_key(channel_id) {
            return None;
        }

        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0 && *l <= MAX_PAGE_LIMIT)
            .unwrap_or(DEFAULT_PAGE_LIMIT);

        let history = inner.messages.get(channel_id).map(Vec::as_slice).unwrap_or(&[]);
        let total = history.len();
        let start = (page - 1) * limit;
        let messages = if start >= total {
            Vec::new()
        } else {
            history[start..(start + limit).min(total)].to_vec()
        };

        Some(MessagePage {
            messages,
            page,
            limit,
            total,
        })
    }
}
