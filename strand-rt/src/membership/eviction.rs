//! Eviction policies applied by the heartbeat sweep.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::types::SiloInfo;
use crate::util::SiloId;

/// How the sweep decides that a silo must leave the view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum EvictionPolicy {
    /// Heartbeat older than the liveness window.
    #[default]
    TimeoutBased,

    /// Health score below `threshold` for `consecutive` observations.
    HealthScoreBased { threshold: f64, consecutive: u32 },

    /// Either condition triggers.
    Hybrid { threshold: f64, consecutive: u32 },

    /// Operator-driven removal only.
    Manual,
}

/// Per-sweep state: consecutive below-threshold observations per silo.
#[derive(Debug, Default)]
pub(crate) struct EvictionTracker {
    below_threshold: HashMap<SiloId, u32>,
}

impl EvictionTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Evaluate one silo under `policy`; returns true when it must be evicted.
    pub(crate) fn observe(
        &mut self,
        policy: &EvictionPolicy,
        info: &SiloInfo,
        health_score: Option<f64>,
        liveness_window: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        let timed_out = !info.is_live(liveness_window, now);

        match policy {
            EvictionPolicy::Manual => false,
            EvictionPolicy::TimeoutBased => timed_out,
            EvictionPolicy::HealthScoreBased {
                threshold,
                consecutive,
            } => self.observe_health(&info.silo_id, health_score, *threshold, *consecutive),
            EvictionPolicy::Hybrid {
                threshold,
                consecutive,
            } => {
                let unhealthy =
                    self.observe_health(&info.silo_id, health_score, *threshold, *consecutive);
                timed_out || unhealthy
            }
        }
    }

    /// Drop tracking state for a silo that left the view.
    pub(crate) fn forget(&mut self, silo_id: &SiloId) {
        self.below_threshold.remove(silo_id);
    }

    fn observe_health(
        &mut self,
        silo_id: &SiloId,
        score: Option<f64>,
        threshold: f64,
        consecutive: u32,
    ) -> bool {
        match score {
            Some(score) if score < threshold => {
                let count = self.below_threshold.entry(silo_id.clone()).or_insert(0);
                *count += 1;
                *count >= consecutive
            }
            // A healthy or missing sample resets the streak.
            _ => {
                self.below_threshold.remove(silo_id);
                false
            }
        }
    }
}
