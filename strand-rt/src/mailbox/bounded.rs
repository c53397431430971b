// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio::sync::mpsc;

// Layer 3: Internal module imports
use super::error::{MailboxError, TryRecvError};
use super::metrics::MailboxMetrics;
use super::overflow::OverflowPolicy;

/// Bounded FIFO mailbox owned by exactly one activation worker.
///
/// Built on `tokio::mpsc`; the queue depth is read from the channel's own
/// counters rather than a separate atomic. The receiver half is not
/// cloneable; single-consumer ownership is what gives the turn loop its
/// single-threaded semantics without a mutex.
///
/// # Example
/// ```rust
/// use strand_rt::mailbox::{Mailbox, OverflowPolicy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (mut mailbox, sender) = Mailbox::new(16, OverflowPolicy::Reject);
/// sender.send("turn").await.unwrap();
/// assert_eq!(mailbox.recv().await, Some("turn"));
/// # }
/// ```
pub struct Mailbox<T> {
    receiver: mpsc::Receiver<T>,
    capacity: usize,
    metrics: Arc<MailboxMetrics>,
}

/// Cloneable producer half of a [`Mailbox`].
pub struct MailboxSender<T> {
    sender: mpsc::Sender<T>,
    policy: OverflowPolicy,
    capacity: usize,
    metrics: Arc<MailboxMetrics>,
}

impl<T: Send + 'static> Mailbox<T> {
    /// Create a mailbox with the given capacity and overflow policy.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> (Self, MailboxSender<T>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let metrics = Arc::new(MailboxMetrics::new());

        let mailbox = Self {
            receiver,
            capacity,
            metrics: Arc::clone(&metrics),
        };
        let sender = MailboxSender {
            sender,
            policy,
            capacity,
            metrics,
        };
        (mailbox, sender)
    }

    /// Receive the next message; `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        let item = self.receiver.recv().await;
        if item.is_some() {
            self.metrics.record_processed();
        }
        item
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        match self.receiver.try_recv() {
            Ok(item) => {
                self.metrics.record_processed();
                Ok(item)
            }
            Err(mpsc::error::TryRecvError::Empty) => Err(TryRecvError::Empty),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(TryRecvError::Closed),
        }
    }

    /// Stop accepting new messages; already-queued ones remain receivable.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    /// Messages currently queued (the channel's own counter).
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Configured capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shared counters for this mailbox.
    pub fn metrics(&self) -> &Arc<MailboxMetrics> {
        &self.metrics
    }
}

impl<T: Send + 'static> MailboxSender<T> {
    /// Send a message under the configured overflow policy.
    pub async fn send(&self, item: T) -> Result<(), MailboxError> {
        match self.policy.apply(&self.sender, item).await {
            Ok(()) => {
                self.metrics.record_enqueued();
                Ok(())
            }
            Err(err) => {
                if matches!(err, MailboxError::Full { .. }) {
                    self.metrics.record_rejected();
                }
                Err(err)
            }
        }
    }

    /// Send without blocking regardless of policy.
    pub fn try_send(&self, item: T) -> Result<(), MailboxError> {
        match self.sender.try_send(item) {
            Ok(()) => {
                self.metrics.record_enqueued();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.record_rejected();
                Err(MailboxError::Full {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(MailboxError::Closed),
        }
    }

    /// Messages currently queued, derived from the channel's permit counter.
    pub fn depth(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    /// Whether the receiving activation has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Whether two senders feed the same mailbox incarnation.
    pub fn same_channel(&self, other: &Self) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Shared counters for this mailbox.
    pub fn metrics(&self) -> &Arc<MailboxMetrics> {
        &self.metrics
    }
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            policy: self.policy,
            capacity: self.capacity,
            metrics: Arc::clone(&self.metrics),
        }
    }
}
