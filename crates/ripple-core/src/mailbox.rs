//! Bounded per-connection outbound mailbox.
//!
//! Each connection owns the receiving half of one mailbox; the hub owns the
//! sending half. Pushes never block: when the mailbox is full the incoming
//! payload is dropped for that recipient only (drop-newest-on-full).
//! Dropping the last sender closes the mailbox, which is the termination
//! signal for the connection's outbound loop.

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Default mailbox capacity in pending payloads.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Outcome of a non-blocking mailbox push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Payload enqueued for delivery.
    Delivered,
    /// Mailbox at capacity; payload discarded for this recipient.
    Dropped,
    /// Receiver is gone; the connection is draining or closed.
    Closed,
}

/// Sending half of a mailbox. Held only by the hub.
///
/// Deliberately not `Clone`: the hub owning the sole sender means removing
/// a member from its channel also closes the mailbox.
#[derive(Debug)]
pub struct MailboxSender {
    tx: mpsc::Sender<Bytes>,
    dropped: Arc<AtomicU64>,
}

/// Receiving half of a mailbox, consumed by the connection's outbound loop.
#[derive(Debug)]
pub struct MailboxReceiver {
    rx: mpsc::Receiver<Bytes>,
    dropped: Arc<AtomicU64>,
}

/// Create a mailbox with the given capacity.
#[must_use]
pub fn bounded(capacity: usize) -> (MailboxSender, MailboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        MailboxSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        MailboxReceiver { rx, dropped },
    )
}

impl MailboxSender {
    /// Attempt to enqueue a payload without blocking.
    pub fn try_push(&self, payload: Bytes) -> PushOutcome {
        match self.tx.try_send(payload) {
            Ok(()) => PushOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("mailbox full, payload dropped");
                PushOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => PushOutcome::Closed,
        }
    }

    /// Number of payloads dropped because this mailbox was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Whether the receiving half has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl MailboxReceiver {
    /// Receive the next pending payload in FIFO order.
    ///
    /// Returns `None` once every sender is dropped and the queue is drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Non-blocking receive, for callers that must not suspend.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }

    /// Number of payloads dropped because this mailbox was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
