// Layer 1: Standard library imports
use std::net::SocketAddr;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

// Layer 3: Internal module imports
use super::config::SiloConfig;
use super::errors::SiloError;
use crate::actor::Invocation;
use crate::dispatch::ActorManifest;
use crate::mailbox::MailboxError;
use crate::membership::{MembershipError, MembershipProvider, SiloInfo};
use crate::message::Envelope;
use crate::registry::ActivationRegistry;
use crate::router::Router;
use crate::transport::{TcpTransport, Transport, TransportError};
use crate::util::SiloId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SiloState {
    Created,
    Running,
    Stopped,
}

/// One cluster process: hosts activations and serves inbound invocations.
///
/// Wires the four runtime pillars together (transport, router, activation
/// registry, dispatch manifest) and runs the inbound loop: every envelope
/// classified as a request is resolved against the manifest, handed to the
/// owning activation's mailbox, and answered through
/// [`Transport::send_response`]. Responses on the shared event are left
/// alone; they belong to the pending map and the connection forwarders.
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use strand_rt::dispatch::ActorManifest;
/// use strand_rt::membership::{InMemoryMembership, MembershipConfig, MembershipStore};
/// use strand_rt::silo::{Silo, SiloConfig};
/// use strand_rt::util::SiloId;
///
/// # async fn example(manifest: Arc<ActorManifest>) -> Result<(), strand_rt::silo::SiloError> {
/// let config = SiloConfig::default();
/// let membership = Arc::new(InMemoryMembership::new(
///     MembershipStore::new(),
///     config.membership.clone(),
/// ));
/// let silo = Silo::new(
///     SiloId::new("silo-a"),
///     "127.0.0.1:0".parse().unwrap(),
///     manifest,
///     membership,
///     config,
/// )?;
/// silo.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct Silo {
    inner: Arc<SiloInner>,
}

struct SiloInner {
    silo_id: SiloId,
    config: SiloConfig,
    membership: Arc<dyn MembershipProvider>,
    transport: Arc<dyn Transport>,
    router: Arc<Router>,
    registry: ActivationRegistry,
    state: RwLock<SiloState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Silo {
    /// Create a silo with a TCP transport bound to `bind_addr` on start.
    pub fn new(
        silo_id: SiloId,
        bind_addr: SocketAddr,
        manifest: Arc<ActorManifest>,
        membership: Arc<dyn MembershipProvider>,
        config: SiloConfig,
    ) -> Result<Self, SiloError> {
        let transport: Arc<dyn Transport> = Arc::new(TcpTransport::new(
            silo_id.clone(),
            bind_addr,
            config.transport.clone(),
        ));
        Self::with_transport(silo_id, manifest, membership, transport, config)
    }

    /// Create a silo over an externally constructed transport.
    pub fn with_transport(
        silo_id: SiloId,
        manifest: Arc<ActorManifest>,
        membership: Arc<dyn MembershipProvider>,
        transport: Arc<dyn Transport>,
        config: SiloConfig,
    ) -> Result<Self, SiloError> {
        config.validate().map_err(SiloError::InvalidConfig)?;

        let router = Arc::new(Router::new(
            Arc::clone(&membership),
            Arc::clone(&transport),
            Some(Arc::clone(&manifest)),
            config.call_timeout,
        ));
        let registry = ActivationRegistry::new(
            manifest,
            Arc::clone(&transport),
            Arc::clone(&router),
            config.mailbox_capacity,
            config.overflow,
            config.idle_deactivation,
        );

        Ok(Self {
            inner: Arc::new(SiloInner {
                silo_id,
                config,
                membership,
                transport,
                router,
                registry,
                state: RwLock::new(SiloState::Created),
                tasks: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Bind the transport, join the cluster, and start serving requests.
    pub async fn start(&self) -> Result<(), SiloError> {
        {
            let mut state = self.inner.state.write();
            match *state {
                SiloState::Running => return Err(SiloError::AlreadyRunning),
                SiloState::Stopped => return Err(SiloError::NotRunning),
                SiloState::Created => *state = SiloState::Running,
            }
        }

        self.inner.transport.start().await?;
        let bound = self
            .inner
            .transport
            .local_addr()
            .ok_or(TransportError::NotStarted)?;
        let advertised = self
            .inner
            .config
            .advertised_address
            .clone()
            .unwrap_or_else(|| bound.ip().to_string());

        self.inner
            .membership
            .register(SiloInfo::new(
                self.inner.silo_id.clone(),
                advertised,
                bound.port(),
            ))
            .await?;

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(SiloInner::inbound_loop(inner));
        self.inner.tasks.lock().push(task);

        info!(silo = %self.inner.silo_id, addr = %bound, "silo started");
        Ok(())
    }

    /// Graceful stop: leave the view, drain mailboxes up to the configured
    /// deadline, then stop the transport (which fails whatever is still
    /// pending with shutdown errors).
    pub async fn stop(&self) -> Result<(), SiloError> {
        {
            let mut state = self.inner.state.write();
            match *state {
                SiloState::Running => *state = SiloState::Stopped,
                _ => return Err(SiloError::NotRunning),
            }
        }

        match self.inner.membership.unregister().await {
            Ok(()) | Err(MembershipError::NotRegistered) => {}
            Err(error) => warn!(%error, "unregister failed during stop"),
        }

        let drained = self
            .inner
            .registry
            .drain_all(self.inner.config.shutdown_timeout)
            .await;
        if !drained {
            warn!(
                silo = %self.inner.silo_id,
                deadline = ?self.inner.config.shutdown_timeout,
                "drain deadline exceeded; remaining work will fail with shutdown errors"
            );
        }

        self.inner.transport.stop().await?;
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }

        info!(silo = %self.inner.silo_id, "silo stopped");
        Ok(())
    }

    /// This silo's identity.
    pub fn silo_id(&self) -> &SiloId {
        &self.inner.silo_id
    }

    /// The caller-side router bound to this silo's transport.
    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.inner.router)
    }

    /// The underlying transport.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    /// The membership view this silo participates in.
    pub fn membership(&self) -> Arc<dyn MembershipProvider> {
        Arc::clone(&self.inner.membership)
    }

    /// Live activations hosted here.
    pub fn activation_count(&self) -> usize {
        self.inner.registry.activation_count()
    }

    /// Mailbox depth of one hosted activation, if live.
    pub fn mailbox_depth(&self, actor_type: &str, actor_id: &str) -> Option<usize> {
        self.inner
            .registry
            .get(&crate::util::ActorKey::new(actor_type, actor_id))
            .map(|handle| handle.mailbox_depth())
    }

    /// Whether the silo is serving.
    pub fn is_running(&self) -> bool {
        *self.inner.state.read() == SiloState::Running
    }
}

impl SiloInner {
    /// Inbound side of the dual-filter rule: consume requests, ignore
    /// responses.
    async fn inbound_loop(inner: Arc<SiloInner>) {
        let mut envelopes = inner.transport.subscribe();
        loop {
            match envelopes.recv().await {
                Ok(envelope) if envelope.is_request() => inner.handle_request(envelope).await,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(silo = %inner.silo_id, skipped, "inbound loop lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Dispatch pipeline: manifest lookup → activation → mailbox enqueue.
    /// Hand-off only; the activation worker runs the turn and replies.
    async fn handle_request(&self, envelope: Envelope) {
        if *self.state.read() != SiloState::Running {
            self.respond(envelope.error_response("silo is shutting down"))
                .await;
            return;
        }

        let key = envelope.actor_key();
        // Link the callee's turn to the caller's token when the call
        // originated on this silo (the local fast path).
        let cancellation = self
            .transport
            .pending_cancellation(&envelope.message_id)
            .map(|caller| caller.child_token())
            .unwrap_or_default();

        let mut attempts = 0;
        loop {
            attempts += 1;
            let handle = match self.registry.get_or_create(&key) {
                Ok(handle) => handle,
                Err(error) => {
                    self.respond(envelope.error_response(error.to_string())).await;
                    return;
                }
            };

            let invocation =
                Invocation::with_cancellation(envelope.clone(), cancellation.clone());
            match handle.enqueue(invocation).await {
                Ok(()) => return,
                // Lost a race with a deactivating worker; one retry lands on
                // a fresh activation.
                Err(MailboxError::Closed) if attempts < 2 => continue,
                Err(MailboxError::Closed) => {
                    self.respond(envelope.error_response("activation is deactivating"))
                        .await;
                    return;
                }
                Err(error @ MailboxError::Full { .. }) => {
                    self.respond(
                        envelope.error_response(format!("mailbox overflow for {key}: {error}")),
                    )
                    .await;
                    return;
                }
            }
        }
    }

    async fn respond(&self, response: Envelope) {
        if let Err(error) = self.transport.send_response(response).await {
            warn!(silo = %self.silo_id, %error, "failed to emit reply");
        }
    }
}
