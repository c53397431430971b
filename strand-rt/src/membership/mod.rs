//! Cluster membership: live-silo view, heartbeats, join/leave events,
//! eviction policies, and actor placement on top of the hash ring.

pub mod error;
pub mod eviction;
pub mod in_memory;
pub mod traits;
pub mod types;

pub use error::MembershipError;
pub use eviction::EvictionPolicy;
pub use in_memory::{InMemoryMembership, MembershipStore};
pub use traits::MembershipProvider;
pub use types::{
    HealthReport, MembershipConfig, MembershipEvent, QuorumPolicy, SiloInfo, SiloStatus,
};
