//! The membership contract.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::sync::broadcast;

// Layer 3: Internal module imports
use super::error::MembershipError;
use super::types::{HealthReport, MembershipEvent, SiloInfo};
use crate::util::SiloId;

/// Cluster-view provider: registration, liveness, discovery, and placement.
///
/// Implementations own the placement ring for their view: ring updates are
/// applied before the corresponding [`MembershipEvent`] is delivered, so a
/// subscriber observing a join can already route to the new silo.
///
/// A provider may also be a *passive observer*: constructed without a self
/// identity, never registering or heartbeating. Observers participate only in
/// discovery and routing; this is the mode external clients use.
///
/// Backend failures are surfaced loudly as
/// [`MembershipError::StoreUnavailable`]; the ring keeps serving its last
/// known snapshot.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    /// Announce this silo to the cluster. Other participants learn of it
    /// within one heartbeat period.
    async fn register(&self, info: SiloInfo) -> Result<(), MembershipError>;

    /// Refresh this silo's liveness record.
    async fn heartbeat(&self) -> Result<(), MembershipError>;

    /// Graceful exit from the cluster view.
    async fn unregister(&self) -> Result<(), MembershipError>;

    /// Silos whose heartbeat falls inside the liveness window.
    async fn active_silos(&self) -> Result<Vec<SiloInfo>, MembershipError>;

    /// This participant's identity; `None` for passive observers.
    fn current_silo_id(&self) -> Option<SiloId>;

    /// Resolve the silo owning an actor key on the current view.
    ///
    /// Returns `None` iff the view is empty.
    fn get_actor_silo(&self, actor_type: &str, actor_id: &str) -> Option<SiloId>;

    /// Subscribe to view-change events.
    fn subscribe(&self) -> broadcast::Receiver<MembershipEvent>;

    /// Publish a load sample for this silo, feeding score-based eviction.
    async fn report_health(&self, report: HealthReport) -> Result<(), MembershipError>;
}
