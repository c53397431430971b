//! Mailbox error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Mailbox send failures.
#[derive(Debug, Error)]
pub enum MailboxError {
    /// Mailbox is at capacity and the overflow policy rejects.
    #[error("Mailbox is full (capacity: {capacity})")]
    Full { capacity: usize },

    /// Mailbox is closed (activation stopped).
    #[error("Mailbox is closed")]
    Closed,
}

/// Non-blocking receive failures.
#[derive(Debug, Error)]
pub enum TryRecvError {
    /// No messages queued.
    #[error("Mailbox is empty")]
    Empty,

    /// Mailbox is closed and fully drained.
    #[error("Mailbox is closed")]
    Closed,
}
