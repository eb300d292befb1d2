//! Topic registry for Ripple.
//!
//! The hub is the single source of truth for channel membership. Each
//! connection binds to exactly one channel at registration and keeps that
//! binding until it is unregistered.

use crate::channel::{validate_channel_name, Channel, ChannelId, FanoutReport};
use crate::connection::ConnectionId;
use crate::mailbox::{self, MailboxReceiver, DEFAULT_MAILBOX_CAPACITY};
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Hub errors.
#[derive(Debug, Error)]
pub enum HubError {
    /// Invalid channel name.
    #[error("Invalid channel name: {0}")]
    InvalidChannel(&'static str),

    /// Connection is already bound to a channel.
    #[error("Connection already registered: {0}")]
    AlreadyRegistered(ConnectionId),
}

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each connection's outbound mailbox.
    pub mailbox_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

/// Hub statistics.
#[derive(Debug, Clone)]
pub struct HubStats {
    /// Number of channels with at least one member.
    pub channel_count: usize,
    /// Number of registered connections.
    pub connection_count: usize,
}

/// The channel membership registry.
///
/// Membership lives in a sharded concurrent map: broadcasts read a shard
/// guard while register/unregister take the shard writer side, so a member
/// snapshot is never observed torn. Payload delivery goes through each
/// member's mailbox and never touches the registry locks.
pub struct Hub {
    /// Channels indexed by name. An entry exists iff it has members.
    channels: DashMap<ChannelId, Channel>,
    /// Connection bindings (connection -> its one channel).
    bindings: DashMap<ConnectionId, ChannelId>,
    /// Configuration.
    config: HubConfig,
}

impl Hub {
    /// Create a new hub with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a new hub with custom configuration.
    #[must_use]
    pub fn with_config(config: HubConfig) -> Self {
        info!("Creating hub with config: {:?}", config);
        Self {
            channels: DashMap::new(),
            bindings: DashMap::new(),
            config,
        }
    }

    /// Register a connection as a member of a channel.
    ///
    /// Creates the channel entry if absent and allocates the connection's
    /// bounded mailbox. Returns the receiving half for the outbound loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel name is invalid or the connection is
    /// already bound.
    pub fn register(
        &self,
        connection_id: &ConnectionId,
        channel_name: &str,
    ) -> Result<MailboxReceiver, HubError> {
        validate_channel_name(channel_name).map_err(HubError::InvalidChannel)?;

        match self.bindings.entry(connection_id.clone()) {
            Entry::Occupied(_) => {
                return Err(HubError::AlreadyRegistered(connection_id.clone()));
            }
            Entry::Vacant(slot) => {
                slot.insert(channel_name.to_string());
            }
        }

        let (sender, receiver) = mailbox::bounded(self.config.mailbox_capacity);

        let mut entry = self
            .channels
            .entry(channel_name.to_string())
            .or_insert_with(|| {
                debug!(channel = %channel_name, "Creating channel entry");
                Channel::new(channel_name)
            });
        entry.join(connection_id.clone(), sender);

        debug!(
            channel = %channel_name,
            connection = %connection_id,
            members = entry.member_count(),
            "Registered"
        );

        Ok(receiver)
    }

    /// Unregister a connection, closing its mailbox.
    ///
    /// Idempotent: unregistering an unknown connection is a no-op. Removes
    /// the channel entry when its last member leaves.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        let Some((_, channel_name)) = self.bindings.remove(connection_id) else {
            return;
        };

        let mut emptied = false;
        if let Some(mut entry) = self.channels.get_mut(&channel_name) {
            entry.leave(connection_id);
            emptied = entry.is_empty();
        }
        if emptied {
            // Re-checks emptiness under the shard write lock, so a member
            // registering concurrently cannot be reaped with the entry.
            if self
                .channels
                .remove_if(&channel_name, |_, c| c.is_empty())
                .is_some()
            {
                debug!(channel = %channel_name, "Removed empty channel");
            }
        }

        debug!(channel = %channel_name, connection = %connection_id, "Unregistered");
    }

    /// Broadcast a payload to every current member of a channel.
    ///
    /// Non-blocking per member: a full mailbox drops the payload for that
    /// recipient only. Broadcasting to an absent or empty channel is a
    /// silent no-op.
    pub fn broadcast(&self, channel_name: &str, payload: &Bytes) -> FanoutReport {
        if let Some(entry) = self.channels.get(channel_name) {
            let report = entry.fan_out(payload);
            trace!(
                channel = %channel_name,
                delivered = report.delivered,
                dropped = report.dropped,
                "Broadcast"
            );
            report
        } else {
            trace!(channel = %channel_name, "Broadcast to absent channel");
            FanoutReport::default()
        }
    }

    /// Check if a channel has any members.
    #[must_use]
    pub fn channel_exists(&self, channel_name: &str) -> bool {
        self.channels.contains_key(channel_name)
    }

    /// Get the member count for a channel.
    #[must_use]
    pub fn member_count(&self, channel_name: &str) -> usize {
        self.channels
            .get(channel_name)
            .map(|c| c.member_count())
            .unwrap_or(0)
    }

    /// Get all channel names with at least one member.
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|e| e.key().clone()).collect()
    }

    /// Get the channel a connection is bound to.
    #[must_use]
    pub fn binding(&self, connection_id: &ConnectionId) -> Option<ChannelId> {
        self.bindings.get(connection_id).map(|b| b.value().clone())
    }

    /// Get hub statistics.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            channel_count: self.channels.len(),
            connection_count: self.bindings.len(),
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_register_and_unregister() {
        let hub = Hub::new();

        let rx = hub.register(&conn("conn-1"), "general").unwrap();
        assert!(hub.channel_exists("general"));
        assert_eq!(hub.member_count("general"), 1);
        assert_eq!(hub.binding(&conn("conn-1")).as_deref(), Some("general"));
        drop(rx);

        hub.unregister(&conn("conn-1"));
        assert!(!hub.channel_exists("general"));
        assert!(hub.binding(&conn("conn-1")).is_none());
    }

    #[test]
    fn test_register_invalid_channel() {
        let hub = Hub::new();
        assert!(matches!(
            hub.register(&conn("conn-1"), ""),
            Err(HubError::InvalidChannel(_))
        ));
        // Nothing allocated on rejection.
        assert_eq!(hub.stats().connection_count, 0);
    }

    #[test]
    fn test_register_twice_is_rejected() {
        let hub = Hub::new();
        let _rx = hub.register(&conn("conn-1"), "general").unwrap();
        assert!(matches!(
            hub.register(&conn("conn-1"), "random"),
            Err(HubError::AlreadyRegistered(_))
        ));
        // Original binding untouched.
        assert_eq!(hub.binding(&conn("conn-1")).as_deref(), Some("general"));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let hub = Hub::new();
        let _rx = hub.register(&conn("conn-1"), "general").unwrap();

        hub.unregister(&conn("conn-1"));
        assert!(!hub.channel_exists("general"));

        // Second unregister is a no-op, not an error.
        hub.unregister(&conn("conn-1"));
        assert_eq!(hub.stats().connection_count, 0);
        assert_eq!(hub.stats().channel_count, 0);
    }

    #[test]
    fn test_broadcast_fans_out_including_sender() {
        let hub = Hub::new();
        let mut rx_a = hub.register(&conn("a"), "general").unwrap();
        let mut rx_b = hub.register(&conn("b"), "general").unwrap();

        let payload = Bytes::from_static(b"hi");
        let report = hub.broadcast("general", &payload);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.dropped, 0);

        // Self-echo policy: the publisher is a member like any other.
        assert_eq!(rx_a.try_recv().as_deref(), Some(&b"hi"[..]));
        assert_eq!(rx_b.try_recv().as_deref(), Some(&b"hi"[..]));
    }

    #[test]
    fn test_broadcast_no_members_is_noop() {
        let hub = Hub::new();
        let report = hub.broadcast("nobody-home", &Bytes::from_static(b"hi"));
        assert_eq!(report, FanoutReport::default());
    }

    #[test]
    fn test_broadcast_does_not_cross_channels() {
        let hub = Hub::new();
        let mut rx_general = hub.register(&conn("b"), "general").unwrap();
        let mut rx_random = hub.register(&conn("c"), "random").unwrap();

        hub.broadcast("random", &Bytes::from_static(b"psst"));

        assert_eq!(rx_random.try_recv().as_deref(), Some(&b"psst"[..]));
        assert!(rx_general.try_recv().is_none());
    }

    #[test]
    fn test_broadcast_preserves_publish_order() {
        let hub = Hub::new();
        let mut rx = hub.register(&conn("b"), "general").unwrap();

        hub.broadcast("general", &Bytes::from_static(b"m1"));
        hub.broadcast("general", &Bytes::from_static(b"m2"));

        assert_eq!(rx.try_recv().as_deref(), Some(&b"m1"[..]));
        assert_eq!(rx.try_recv().as_deref(), Some(&b"m2"[..]));
    }

    #[test]
    fn test_full_mailbox_drops_for_that_member_only() {
        let hub = Hub::with_config(HubConfig {
            mailbox_capacity: 1,
        });
        let mut rx_slow = hub.register(&conn("slow"), "general").unwrap();
        let mut rx_fast = hub.register(&conn("fast"), "general").unwrap();

        let first = hub.broadcast("general", &Bytes::from_static(b"m1"));
        assert_eq!(first, FanoutReport { delivered: 2, dropped: 0 });

        // slow's mailbox is full; only fast gets m2 once slow stops draining.
        let second = hub.broadcast("general", &Bytes::from_static(b"m2"));
        assert_eq!(second.delivered + second.dropped, 2);
        assert_eq!(second.dropped, 1);

        assert_eq!(rx_slow.try_recv().as_deref(), Some(&b"m1"[..]));
        assert!(rx_slow.try_recv().is_none());
        assert_eq!(rx_fast.try_recv().as_deref(), Some(&b"m1"[..]));
        assert_eq!(rx_fast.try_recv().as_deref(), Some(&b"m2"[..]));
    }

    #[test]
    fn test_channel_cleanup_leaves_no_stale_state() {
        let hub = Hub::new();
        let _rx1 = hub.register(&conn("a"), "general").unwrap();
        hub.unregister(&conn("a"));
        assert!(!hub.channel_exists("general"));

        // Re-creating the channel starts from an empty member set.
        let _rx2 = hub.register(&conn("b"), "general").unwrap();
        assert_eq!(hub.member_count("general"), 1);
    }

    #[tokio::test]
    async fn test_unregister_closes_mailbox_after_drain() {
        let hub = Hub::new();
        let mut rx = hub.register(&conn("a"), "general").unwrap();

        hub.broadcast("general", &Bytes::from_static(b"pending"));
        hub.unregister(&conn("a"));

        // Pending payloads drain first, then the closed signal arrives.
        assert_eq!(rx.recv().await.as_deref(), Some(&b"pending"[..]));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_stats() {
        let hub = Hub::new();
        let _rx1 = hub.register(&conn("a"), "general").unwrap();
        let _rx2 = hub.register(&conn("b"), "general").unwrap();
        let _rx3 = hub.register(&conn("c"), "random").unwrap();

        let stats = hub.stats();
        assert_eq!(stats.channel_count, 2);
        assert_eq!(stats.connection_count, 3);

        let mut names = hub.channel_names();
        names.sort();
        assert_eq!(names, vec!["general", "random"]);
    }
}
