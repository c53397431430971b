//! Membership error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Failures of the membership subsystem.
///
/// Backend failures are loud by design: when the discovery store is
/// unreachable the operation fails and the placement ring keeps serving its
/// last known snapshot.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// Operation requires a registered participant.
    #[error("Silo is not registered with the cluster")]
    NotRegistered,

    /// A silo with this id is already registered through this participant.
    #[error("Silo already registered: {0}")]
    AlreadyRegistered(SiloId),

    /// The discovery backend rejected or lost the operation.
    #[error("Membership store unavailable: {0}")]
    StoreUnavailable(String),

    /// Live view shrank below the configured quorum.
    #[error("Quorum lost: {live} live silos, {required} required")]
    QuorumLost { live: usize, required: usize },
}
