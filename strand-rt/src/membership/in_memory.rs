//! In-process membership backend.
//!
//! `MembershipStore` plays the role of the external coordination store: one
//! record per silo keyed by silo id, refreshed by heartbeats and read through
//! the liveness window, plus a pub/sub channel for join/leave notifications.
//! `InMemoryMembership` is one participant's view over that store; external
//! backends implement [`MembershipProvider`] with the same semantics.

// Layer 1: Standard library imports
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::error::MembershipError;
use super::eviction::EvictionTracker;
use super::traits::MembershipProvider;
use super::types::{
    HealthReport, MembershipConfig, MembershipEvent, QuorumPolicy, SiloInfo, SiloStatus,
};
use crate::ring::HashRing;
use crate::util::SiloId;

const NOTIFY_CHANNEL_CAPACITY: usize = 256;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Store-level notifications, one per actual record mutation.
#[derive(Debug, Clone)]
enum StoreNotification {
    Joined(SiloInfo),
    Left(SiloId),
}

/// Shared silo table standing in for the external coordination store.
///
/// All participants of one logical cluster hold the same `Arc<MembershipStore>`.
pub struct MembershipStore {
    silos: DashMap<SiloId, SiloInfo>,
    health: DashMap<SiloId, f64>,
    notify: broadcast::Sender<StoreNotification>,
}

impl MembershipStore {
    /// Create an empty store.
    pub fn new() -> Arc<Self> {
        let (notify, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);
        Arc::new(Self {
            silos: DashMap::new(),
            health: DashMap::new(),
            notify,
        })
    }

    /// Number of records currently held (live or not).
    pub fn record_count(&self) -> usize {
        self.silos.len()
    }

    fn upsert(&self, info: SiloInfo) {
        self.silos.insert(info.silo_id.clone(), info.clone());
        let _ = self.notify.send(StoreNotification::Joined(info));
    }

    fn touch(&self, silo_id: &SiloId) -> bool {
        match self.silos.get_mut(silo_id) {
            Some(mut entry) => {
                entry.last_heartbeat = Utc::now();
                true
            }
            None => false,
        }
    }

    fn remove(&self, silo_id: &SiloId) -> bool {
        self.health.remove(silo_id);
        if self.silos.remove(silo_id).is_some() {
            let _ = self.notify.send(StoreNotification::Left(silo_id.clone()));
            true
        } else {
            false
        }
    }

    fn set_health(&self, silo_id: &SiloId, score: f64) {
        self.health.insert(silo_id.clone(), score);
    }

    fn health_of(&self, silo_id: &SiloId) -> Option<f64> {
        self.health.get(silo_id).map(|entry| *entry.value())
    }

    fn snapshot(&self) -> Vec<SiloInfo> {
        self.silos.iter().map(|entry| entry.value().clone()).collect()
    }

    fn live(&self, window: std::time::Duration) -> Vec<SiloInfo> {
        let now = Utc::now();
        self.silos
            .iter()
            .filter(|entry| entry.value().is_live(window, now))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreNotification> {
        self.notify.subscribe()
    }
}

struct Inner {
    store: Arc<MembershipStore>,
    config: MembershipConfig,
    ring: HashRing,
    own: RwLock<Option<SiloInfo>>,
    events: broadcast::Sender<MembershipEvent>,
    tracker: Mutex<EvictionTracker>,
}

impl Inner {
    /// Apply a view change: ring first, event second.
    ///
    /// The ring mutation result doubles as the dedup guard, so a change
    /// applied synchronously by the local mutator is not re-announced when
    /// its own store notification arrives through the listener.
    fn apply(&self, notification: StoreNotification) {
        match notification {
            StoreNotification::Joined(info) => {
                if self.ring.add_node(&info.silo_id) {
                    debug!(silo = %info.silo_id, "silo joined view");
                    let _ = self.events.send(MembershipEvent::SiloJoined(info));
                }
            }
            StoreNotification::Left(silo_id) => {
                if self.ring.remove_node(&silo_id) {
                    self.tracker.lock().forget(&silo_id);
                    debug!(silo = %silo_id, "silo left view");
                    let _ = self.events.send(MembershipEvent::SiloLeft(silo_id));
                }
            }
        }
    }

    /// One pass of the heartbeat-driven maintenance: refresh own liveness,
    /// evaluate the eviction policy, check quorum.
    fn sweep(&self) {
        let now = Utc::now();
        let window = self.config.liveness_window();

        if let Some(own) = self.own.read().as_ref() {
            self.store.touch(&own.silo_id);
        }

        for info in self.store.snapshot() {
            let health = self.store.health_of(&info.silo_id);
            let evict = self.tracker.lock().observe(
                &self.config.eviction,
                &info,
                health,
                window,
                now,
            );
            if evict {
                warn!(silo = %info.silo_id, "evicting silo from cluster view");
                self.store.remove(&info.silo_id);
                self.apply(StoreNotification::Left(info.silo_id));
            }
        }

        if self.config.quorum_minimum > 0 {
            let live = self.store.live(window).len();
            if live < self.config.quorum_minimum {
                warn!(
                    live,
                    required = self.config.quorum_minimum,
                    "cluster below quorum"
                );
                if self.config.quorum_policy == QuorumPolicy::SelfEvict {
                    if let Some(own) = self.own.write().take() {
                        self.store.remove(&own.silo_id);
                        self.apply(StoreNotification::Left(own.silo_id));
                    }
                }
            }
        }
    }
}

/// One participant's (or observer's) view over a [`MembershipStore`].
///
/// # Example
/// ```rust,no_run
/// use strand_rt::membership::{
///     InMemoryMembership, MembershipConfig, MembershipProvider, MembershipStore, SiloInfo,
/// };
/// use strand_rt::util::SiloId;
///
/// # async fn example() -> Result<(), strand_rt::membership::MembershipError> {
/// let store = MembershipStore::new();
/// let membership = InMemoryMembership::new(store, MembershipConfig::default());
/// membership
///     .register(SiloInfo::new(SiloId::new("silo-a"), "127.0.0.1", 7070))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct InMemoryMembership {
    inner: Arc<Inner>,
}

impl InMemoryMembership {
    /// Create a participant over `store`. Call
    /// [`register`](MembershipProvider::register) to join the cluster.
    pub fn new(store: Arc<MembershipStore>, config: MembershipConfig) -> Self {
        Self::build(store, config)
    }

    /// Create a passive observer: discovery and routing only, no identity,
    /// no heartbeat. This is the mode external clients use.
    pub fn observer(store: Arc<MembershipStore>, config: MembershipConfig) -> Self {
        Self::build(store, config)
    }

    fn build(store: Arc<MembershipStore>, config: MembershipConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(Inner {
            ring: HashRing::with_virtual_nodes(config.virtual_nodes),
            store: Arc::clone(&store),
            config,
            own: RwLock::new(None),
            events,
            tracker: Mutex::new(EvictionTracker::new()),
        });

        // Seed the ring with the silos that are already live.
        let window = inner.config.liveness_window();
        for info in inner.store.live(window) {
            inner.apply(StoreNotification::Joined(info));
        }

        Self::spawn_listener(Arc::downgrade(&inner), store.subscribe());

        Self { inner }
    }

    /// Forward store notifications into this participant's view.
    ///
    /// The task holds only a weak reference so dropping the membership view
    /// stops it; it also exits when the store itself is dropped.
    fn spawn_listener(
        weak: Weak<Inner>,
        mut notifications: broadcast::Receiver<StoreNotification>,
    ) {
        tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(notification) => {
                        let Some(inner) = weak.upgrade() else { break };
                        inner.apply(notification);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "membership notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn spawn_ticker(weak: Weak<Inner>) {
        tokio::spawn(async move {
            let interval = match weak.upgrade() {
                Some(inner) => inner.config.heartbeat_interval,
                None => return,
            };
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so the sweep runs one
            // full period after registration.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.own.read().is_none() {
                    break;
                }
                inner.sweep();
            }
        });
    }
}

#[async_trait::async_trait]
impl MembershipProvider for InMemoryMembership {
    async fn register(&self, info: SiloInfo) -> Result<(), MembershipError> {
        {
            let mut own = self.inner.own.write();
            if let Some(existing) = own.as_ref() {
                return Err(MembershipError::AlreadyRegistered(existing.silo_id.clone()));
            }
            let mut info = info;
            info.status = SiloStatus::Active;
            info.last_heartbeat = Utc::now();
            *own = Some(info);
        }

        let info = self
            .inner
            .own
            .read()
            .clone()
            .ok_or(MembershipError::NotRegistered)?;

        self.inner.store.upsert(info.clone());
        // Synchronous ring update: callers can route to self immediately.
        self.inner.apply(StoreNotification::Joined(info));
        Self::spawn_ticker(Arc::downgrade(&self.inner));
        Ok(())
    }

    async fn heartbeat(&self) -> Result<(), MembershipError> {
        let silo_id = {
            let own = self.inner.own.read();
            own.as_ref()
                .map(|info| info.silo_id.clone())
                .ok_or(MembershipError::NotRegistered)?
        };
        if !self.inner.store.touch(&silo_id) {
            // Record disappeared (evicted elsewhere); re-announce it.
            if let Some(info) = self.inner.own.read().clone() {
                self.inner.store.upsert(info);
            }
        }
        Ok(())
    }

    async fn unregister(&self) -> Result<(), MembershipError> {
        let info = self
            .inner
            .own
            .write()
            .take()
            .ok_or(MembershipError::NotRegistered)?;
        self.inner.store.remove(&info.silo_id);
        self.inner.apply(StoreNotification::Left(info.silo_id));
        Ok(())
    }

    async fn active_silos(&self) -> Result<Vec<SiloInfo>, MembershipError> {
        Ok(self.inner.store.live(self.inner.config.liveness_window()))
    }

    fn current_silo_id(&self) -> Option<SiloId> {
        self.inner
            .own
            .read()
            .as_ref()
            .map(|info| info.silo_id.clone())
    }

    fn get_actor_silo(&self, actor_type: &str, actor_id: &str) -> Option<SiloId> {
        self.inner.ring.get_node(actor_type, actor_id)
    }

    fn subscribe(&self) -> broadcast::Receiver<MembershipEvent> {
        self.inner.events.subscribe()
    }

    async fn report_health(&self, report: HealthReport) -> Result<(), MembershipError> {
        let silo_id = self
            .inner
            .own
            .read()
            .as_ref()
            .map(|info| info.silo_id.clone())
            .ok_or(MembershipError::NotRegistered)?;
        self.inner.store.set_health(&silo_id, report.score());
        Ok(())
    }
}
