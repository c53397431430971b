//! Overflow handling for full mailboxes.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// Layer 3: Internal module imports
use super::error::MailboxError;

/// What a producer experiences when the mailbox is at capacity.
///
/// # Policy selection
///
/// - **Reject** (default): the sender gets [`MailboxError::Full`]
///   immediately; the silo loop converts that into an error reply, so callers
///   see overload instead of unbounded queueing.
/// - **Block**: the producer waits for space. Appropriate when the caller
///   prefers backpressure over failures.
///
/// # Example
/// ```rust
/// use strand_rt::mailbox::OverflowPolicy;
///
/// assert_eq!(OverflowPolicy::default(), OverflowPolicy::Reject);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverflowPolicy {
    /// Return an error to the producer immediately.
    #[default]
    Reject,

    /// Block the producer until space becomes available.
    Block,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "Reject"),
            Self::Block => write!(f, "Block"),
        }
    }
}

impl OverflowPolicy {
    /// Deliver `item` according to this policy.
    pub(crate) async fn apply<T: Send>(
        &self,
        sender: &mpsc::Sender<T>,
        item: T,
    ) -> Result<(), MailboxError> {
        match self {
            Self::Block => sender.send(item).await.map_err(|_| MailboxError::Closed),
            Self::Reject => sender.try_send(item).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => MailboxError::Full {
                    capacity: sender.max_capacity(),
                },
                mpsc::error::TrySendError::Closed(_) => MailboxError::Closed,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_default_is_reject() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::Reject);
    }

    #[test]
    fn test_display() {
        assert_eq!(OverflowPolicy::Reject.to_string(), "Reject");
        assert_eq!(OverflowPolicy::Block.to_string(), "Block");
    }

    #[tokio::test]
    async fn test_reject_on_full() {
        let (sender, _receiver) = mpsc::channel::<u32>(1);
        sender.try_send(1).unwrap();

        let result = OverflowPolicy::Reject.apply(&sender, 2).await;
        assert!(matches!(result, Err(MailboxError::Full { capacity: 1 })));
    }

    #[tokio::test]
    async fn test_block_waits_for_space() {
        use std::time::Duration;

        let (sender, mut receiver) = mpsc::channel::<u32>(1);
        sender.try_send(1).unwrap();

        let blocked = {
            let sender = sender.clone();
            tokio::spawn(async move { OverflowPolicy::Block.apply(&sender, 2).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(receiver.recv().await, Some(1));

        blocked.await.unwrap().unwrap();
        assert_eq!(receiver.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (sender, receiver) = mpsc::channel::<u32>(1);
        drop(receiver);

        let result = OverflowPolicy::Reject.apply(&sender, 1).await;
        assert!(matches!(result, Err(MailboxError::Closed)));

        let result = OverflowPolicy::Block.apply(&sender, 1).await;
        assert!(matches!(result, Err(MailboxError::Closed)));
    }
}
