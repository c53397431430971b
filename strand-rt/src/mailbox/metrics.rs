//! Per-mailbox atomic counters.
//!
//! Depth is intentionally absent here: the channel's own counters answer that
//! (see [`super::Mailbox::len`] / [`super::MailboxSender::depth`]), so the hot
//! path carries no extra atomic for it.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

// Layer 3: Internal module imports
// (none)

/// Cumulative counters for one mailbox.
///
/// # Example
/// ```rust
/// use strand_rt::mailbox::MailboxMetrics;
///
/// let metrics = MailboxMetrics::new();
/// metrics.record_enqueued();
/// metrics.record_processed();
/// assert_eq!(metrics.enqueued_count(), 1);
/// assert_eq!(metrics.processed_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MailboxMetrics {
    enqueued: AtomicU64,
    processed: AtomicU64,
    rejected: AtomicU64,
    last_turn: RwLock<Option<DateTime<Utc>>>,
}

impl MailboxMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful enqueue.
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dequeued (about to be processed) message.
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        *self.last_turn.write() = Some(Utc::now());
    }

    /// Record an enqueue rejected by the overflow policy.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Total messages accepted into the mailbox.
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Total messages dequeued for processing.
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Total messages rejected at enqueue.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Timestamp of the most recent dequeue, if any.
    pub fn last_turn_at(&self) -> Option<DateTime<Utc>> {
        *self.last_turn.read()
    }
}
