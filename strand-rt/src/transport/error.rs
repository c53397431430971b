//! Transport error types.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Failures of the envelope transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No connection exists for the target silo.
    #[error("Unknown peer silo: {0}")]
    UnknownPeer(SiloId),

    /// The stream to the peer dropped; pending calls for it were failed.
    #[error("Connection to {0} lost")]
    ConnectionLost(SiloId),

    /// Dialing the peer failed.
    #[error("Connect to {peer} failed: {reason}")]
    ConnectFailed { peer: SiloId, reason: String },

    /// The per-call deadline elapsed; a late reply will be dropped silently.
    #[error("Call timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The caller cancelled the pending call.
    #[error("Call cancelled by caller")]
    Cancelled,

    /// The transport is stopping; new and in-flight calls are rejected.
    #[error("Transport is shutting down")]
    ShuttingDown,

    /// The transport was never started (no listener bound).
    #[error("Transport is not running")]
    NotStarted,

    /// Frame (de)serialization failed.
    #[error("Envelope codec error: {0}")]
    Codec(String),

    /// Socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
