//! Silo lifecycle error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::membership::MembershipError;
use crate::transport::TransportError;

/// Failures while starting, running, or stopping a silo.
#[derive(Debug, Error)]
pub enum SiloError {
    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The silo was already started.
    #[error("Silo is already running")]
    AlreadyRunning,

    /// The silo is not running.
    #[error("Silo is not running")]
    NotRunning,

    /// Transport failure during start/stop.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Membership failure during start/stop.
    #[error(transparent)]
    Membership(#[from] MembershipError),
}
