//! Per-activation bounded FIFO mailboxes with overflow control.

pub mod bounded;
pub mod error;
pub mod metrics;
pub mod overflow;

pub use bounded::{Mailbox, MailboxSender};
pub use error::{MailboxError, TryRecvError};
pub use metrics::MailboxMetrics;
pub use overflow::OverflowPolicy;
