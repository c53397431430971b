// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::eviction::EvictionPolicy;
use crate::util::SiloId;

/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Default liveness window as a multiple of the heartbeat interval.
pub const DEFAULT_LIVENESS_MULTIPLIER: u32 = 3;

/// Silo lifecycle status as seen by the cluster view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiloStatus {
    /// Announced but not yet serving.
    Joining,
    /// Registered and serving.
    Active,
    /// Graceful exit in progress.
    ShuttingDown,
    /// Heartbeat lapsed or eviction fired.
    Dead,
}

/// One silo's record in the cluster view.
///
/// # Example
/// ```rust
/// use strand_rt::membership::SiloInfo;
/// use strand_rt::util::SiloId;
///
/// let info = SiloInfo::new(SiloId::new("silo-a"), "10.0.0.5", 7070);
/// assert_eq!(info.endpoint(), "10.0.0.5:7070");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiloInfo {
    /// Globally unique silo identity.
    pub silo_id: SiloId,

    /// Address other silos should dial.
    pub advertised_address: String,

    /// Port of the envelope transport.
    pub port: u16,

    /// Current lifecycle status.
    pub status: SiloStatus,

    /// Last observed heartbeat.
    pub last_heartbeat: DateTime<Utc>,
}

impl SiloInfo {
    /// Create a record in the `Joining` state with a fresh heartbeat.
    pub fn new(silo_id: SiloId, advertised_address: impl Into<String>, port: u16) -> Self {
        Self {
            silo_id,
            advertised_address: advertised_address.into(),
            port,
            status: SiloStatus::Joining,
            last_heartbeat: Utc::now(),
        }
    }

    /// Dialable `host:port` endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.advertised_address, self.port)
    }

    /// Whether the heartbeat falls inside the liveness window at `now`.
    pub fn is_live(&self, window: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.last_heartbeat);
        age.num_milliseconds() <= window.as_millis() as i64
    }
}

/// View-change events, delivered after the ring already reflects the change.
#[derive(Debug, Clone)]
pub enum MembershipEvent {
    /// A silo joined; routing to it is already possible.
    SiloJoined(SiloInfo),
    /// A silo left or was evicted.
    SiloLeft(SiloId),
}

/// Self-reported load sample feeding score-based eviction.
///
/// `cpu` and `memory` are utilization fractions in `[0, 1]`; `latency_ms` is
/// the silo's recent request latency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub cpu: f64,
    pub memory: f64,
    pub latency_ms: f64,
}

impl HealthReport {
    /// Composite health score in `[0, 1]`, higher is healthier.
    ///
    /// Weighted 30/30/40 across CPU, memory, and latency. The latency term is
    /// `clamp(1 - latency_ms / 1000, 0, 1)`: 0 ms scores 1.0, one second or
    /// worse scores 0.0, linear in between.
    pub fn score(&self) -> f64 {
        let cpu = (1.0 - self.cpu).clamp(0.0, 1.0);
        let memory = (1.0 - self.memory).clamp(0.0, 1.0);
        let latency = (1.0 - self.latency_ms / 1000.0).clamp(0.0, 1.0);
        0.3 * cpu + 0.3 * memory + 0.4 * latency
    }
}

/// What a silo does when the live view shrinks below quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QuorumPolicy {
    /// Keep serving; the at-most-one-activation invariant becomes best-effort.
    #[default]
    Continue,
    /// Unregister and stop routing.
    SelfEvict,
}

/// Membership configuration.
///
/// # Example
/// ```rust
/// use strand_rt::membership::MembershipConfig;
/// use std::time::Duration;
///
/// let config = MembershipConfig {
///     heartbeat_interval: Duration::from_secs(2),
///     ..MembershipConfig::default()
/// };
/// assert_eq!(config.liveness_window(), Duration::from_secs(6));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipConfig {
    /// Heartbeat period (default 10 s).
    pub heartbeat_interval: Duration,

    /// Liveness window = `heartbeat_interval * liveness_multiplier`.
    pub liveness_multiplier: u32,

    /// Virtual nodes per silo on the placement ring.
    pub virtual_nodes: usize,

    /// Eviction policy applied by the heartbeat sweep.
    pub eviction: EvictionPolicy,

    /// Minimum live silos before split-brain handling kicks in (0 disables).
    pub quorum_minimum: usize,

    /// Behavior on quorum loss.
    pub quorum_policy: QuorumPolicy,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            liveness_multiplier: DEFAULT_LIVENESS_MULTIPLIER,
            virtual_nodes: crate::ring::DEFAULT_VIRTUAL_NODES,
            eviction: EvictionPolicy::TimeoutBased,
            quorum_minimum: 0,
            quorum_policy: QuorumPolicy::Continue,
        }
    }
}

impl MembershipConfig {
    /// The window inside which a heartbeat counts as live.
    pub fn liveness_window(&self) -> Duration {
        self.heartbeat_interval * self.liveness_multiplier
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.heartbeat_interval.is_zero() {
            return Err("heartbeat_interval must be > 0".to_string());
        }
        if self.liveness_multiplier == 0 {
            return Err("liveness_multiplier must be > 0".to_string());
        }
        if self.virtual_nodes == 0 {
            return Err("virtual_nodes must be > 0".to_string());
        }
        Ok(())
    }
}
