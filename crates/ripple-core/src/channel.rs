//! Channel abstraction for Ripple.
//!
//! A channel is a named topic grouping the connections that should receive
//! each other's messages.

use crate::connection::ConnectionId;
use crate::mailbox::{MailboxSender, PushOutcome};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Maximum channel name length.
pub const MAX_CHANNEL_NAME_LENGTH: usize = 256;

/// A channel identifier.
pub type ChannelId = String;

/// Validate a channel name.
///
/// # Errors
///
/// Returns an error message if the channel name is invalid.
pub fn validate_channel_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Channel name cannot be empty");
    }
    if name.len() > MAX_CHANNEL_NAME_LENGTH {
        return Err("Channel name too long");
    }
    if !name.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Err("Channel name contains invalid characters");
    }
    Ok(())
}

/// Result of fanning one payload out to a channel's members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Members whose mailbox accepted the payload.
    pub delivered: usize,
    /// Members whose mailbox was full or already closed.
    pub dropped: usize,
}

/// A named topic and the mailboxes of its current members.
#[derive(Debug)]
pub struct Channel {
    name: ChannelId,
    members: HashMap<ConnectionId, MailboxSender>,
}

impl Channel {
    /// Create a new empty channel.
    #[must_use]
    pub fn new(name: impl Into<ChannelId>) -> Self {
        Self {
            name: name.into(),
            members: HashMap::new(),
        }
    }

    /// Get the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Check if a connection is a member.
    #[must_use]
    pub fn is_member(&self, connection_id: &ConnectionId) -> bool {
        self.members.contains_key(connection_id)
    }

    /// Check if the channel has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add a member, taking ownership of its mailbox sender.
    pub fn join(&mut self, connection_id: ConnectionId, sender: MailboxSender) {
        debug!(channel = %self.name, connection = %connection_id, "Member joined");
        self.members.insert(connection_id, sender);
    }

    /// Remove a member, dropping its mailbox sender.
    ///
    /// Returns `true` if the connection was a member. Dropping the sender
    /// closes the mailbox, which terminates the member's outbound loop.
    pub fn leave(&mut self, connection_id: &ConnectionId) -> bool {
        let removed = self.members.remove(connection_id).is_some();
        if removed {
            debug!(channel = %self.name, connection = %connection_id, "Member left");
        }
        removed
    }

    /// Fan one payload out to every member with a non-blocking push each.
    ///
    /// A full or closed mailbox drops the payload for that member only;
    /// the remaining members are unaffected.
    pub fn fan_out(&self, payload: &Bytes) -> FanoutReport {
        let mut report = FanoutReport::default();
        for (connection_id, sender) in &self.members {
            match sender.try_push(payload.clone()) {
                PushOutcome::Delivered => report.delivered += 1,
                PushOutcome::Dropped => {
                    trace!(
                        channel = %self.name,
                        connection = %connection_id,
                        "Mailbox full, message dropped"
                    );
                    report.dropped += 1;
                }
                PushOutcome::Closed => {
                    trace!(
                        channel = %self.name,
                        connection = %connection_id,
                        "Mailbox closed, member draining"
                    );
                    report.dropped += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox;

    #[test]
    fn test_channel_join_leave() {
        let mut channel = Channel::new("general");
        assert_eq!(channel.name(), "general");
        assert!(channel.is_empty());

        let (tx, _rx) = mailbox::bounded(4);
        channel.join(ConnectionId::new("conn-1"), tx);
        assert_eq!(channel.member_count(), 1);
        assert!(channel.is_member(&ConnectionId::new("conn-1")));

        assert!(channel.leave(&ConnectionId::new("conn-1")));
        assert!(channel.is_empty());

        // Leaving a non-member is a no-op.
        assert!(!channel.leave(&ConnectionId::new("conn-1")));
    }

    #[test]
    fn test_channel_name_validation() {
        assert!(validate_channel_name("general").is_ok());
        assert!(validate_channel_name("room:42").is_ok());
        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name("line\nbreak").is_err());

        let long_name = "a".repeat(MAX_CHANNEL_NAME_LENGTH + 1);
        assert!(validate_channel_name(&long_name).is_err());
    }

    #[test]
    fn test_fan_out_reaches_all_members() {
        let mut channel = Channel::new("general");
        let (tx1, mut rx1) = mailbox::bounded(4);
        let (tx2, mut rx2) = mailbox::bounded(4);
        channel.join(ConnectionId::new("conn-1"), tx1);
        channel.join(ConnectionId::new("conn-2"), tx2);

        let report = channel.fan_out(&Bytes::from_static(b"hello"));
        assert_eq!(report, FanoutReport { delivered: 2, dropped: 0 });
        assert_eq!(rx1.try_recv().as_deref(), Some(&b"hello"[..]));
        assert_eq!(rx2.try_recv().as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_full_mailbox_isolates_slow_member() {
        let mut channel = Channel::new("general");
        let (tx_slow, mut rx_slow) = mailbox::bounded(1);
        let (tx_fast, mut rx_fast) = mailbox::bounded(4);
        channel.join(ConnectionId::new("slow"), tx_slow);
        channel.join(ConnectionId::new("fast"), tx_fast);

        // Fill the slow member's mailbox.
        let first = channel.fan_out(&Bytes::from_static(b"m1"));
        assert_eq!(first, FanoutReport { delivered: 2, dropped: 0 });

        // The slow member loses the next message; the fast one still gets it.
        let second = channel.fan_out(&Bytes::from_static(b"m2"));
        assert_eq!(second, FanoutReport { delivered: 1, dropped: 1 });

        assert_eq!(rx_slow.try_recv().as_deref(), Some(&b"m1"[..]));
        assert!(rx_slow.try_recv().is_none());
        assert_eq!(rx_fast.try_recv().as_deref(), Some(&b"m1"[..]));
        assert_eq!(rx_fast.try_recv().as_deref(), Some(&b"m2"[..]));
    }

    #[test]
    fn test_fan_out_to_empty_channel_is_noop() {
        let channel = Channel::new("empty");
        let report = channel.fan_out(&Bytes::from_static(b"hello"));
        assert_eq!(report, FanoutReport::default());
    }
}
