//! # ripple-core
//!
//! Channel registry and non-blocking fan-out for the Ripple realtime server.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Hub** - Registry mapping channel names to their current members
//! - **Channel** - One named topic and its member mailboxes
//! - **Mailbox** - Bounded per-connection outbound queue
//! - **WireMessage** - The JSON envelope exchanged with clients
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Ingress   │────▶│     Hub     │────▶│   Channel   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │   Mailbox   │──▶ outbound loop
//!                                         └─────────────┘
//! ```
//!
//! A connection binds to exactly one channel for its whole lifetime. The
//! hub owns the sending half of each member's mailbox; publishing fans the
//! payload out with one non-blocking push per member, so a slow consumer
//! loses messages instead of stalling the channel.

pub mod channel;
pub mod connection;
pub mod hub;
pub mod mailbox;
pub mod message;

pub use channel::{validate_channel_name, Channel, ChannelId, FanoutReport};
pub use connection::ConnectionId;
pub use hub::{Hub, HubConfig, HubError, HubStats};
pub use mailbox::{MailboxReceiver, MailboxSender, PushOutcome, DEFAULT_MAILBOX_CAPACITY};
pub use message::WireMessage;
