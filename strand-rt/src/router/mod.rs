//! Caller-side routing: placement resolution, local/remote choice, and the
//! call contract the generated proxy layer builds on.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// Layer 3: Internal module imports
use crate::actor::turn;
use crate::dispatch::ActorManifest;
use crate::membership::{MembershipError, MembershipProvider};
use crate::message::Envelope;
use crate::transport::{Transport, TransportError};
use crate::util::ActorKey;

/// Call failures as the caller sees them.
#[derive(Debug, Error)]
pub enum CallError {
    /// No silo owns the key (empty ring, or the owner vanished from the live
    /// view). Not retried by the runtime.
    #[error("No route for {key}: {reason}")]
    Routing { key: ActorKey, reason: String },

    /// Transport-level failure; the caller may retry.
    #[error(transparent)]
    Transport(TransportError),

    /// The per-call deadline elapsed; any late reply is dropped.
    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the call.
    #[error("Call cancelled")]
    Cancelled,

    /// The callee replied with an error envelope (dispatch or handler
    /// failure); indistinguishable in flow from a successful reply.
    #[error("Remote error: {0}")]
    Remote(String),

    /// A turn called back into its own non-reentrant activation.
    #[error("Re-entrant call to non-reentrant activation {0}")]
    Reentrancy(ActorKey),

    /// Membership lookup failed.
    #[error(transparent)]
    Membership(#[from] MembershipError),
}

/// Per-call overrides.
#[derive(Debug, Default)]
pub struct CallOptions {
    /// Deadline for this call; falls back to the router default.
    pub timeout: Option<Duration>,

    /// Caller-held cancellation handle.
    pub cancellation: Option<CancellationToken>,
}

/// Routes one outgoing invocation: resolve the owning silo on the current
/// membership view, pick the local fast path or the peer stream, and map the
/// response envelope back to payload-or-error.
///
/// A proxy method is exactly one [`call`](Router::call): frame the arguments,
/// call, deframe the single return segment. Proxies (and any other caller)
/// never see a server-side activation; the router is the only doorway.
pub struct Router {
    membership: Arc<dyn MembershipProvider>,
    transport: Arc<dyn Transport>,
    manifest: Option<Arc<ActorManifest>>,
    default_timeout: Duration,
}

impl Router {
    /// Create a router.
    ///
    /// `manifest` supplies per-type re-entrancy options on silos; pure
    /// clients pass `None` (no turns ever run there, so the re-entrancy rule
    /// cannot trigger).
    pub fn new(
        membership: Arc<dyn MembershipProvider>,
        transport: Arc<dyn Transport>,
        manifest: Option<Arc<ActorManifest>>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            membership,
            transport,
            manifest,
            default_timeout,
        }
    }

    /// Invoke `method_name` on the addressed actor with the default timeout.
    pub async fn call(
        &self,
        actor_type: &str,
        actor_id: &str,
        method_name: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, CallError> {
        self.call_with(
            actor_type,
            actor_id,
            method_name,
            payload,
            CallOptions::default(),
        )
        .await
    }

    /// Invoke with explicit timeout/cancellation options.
    pub async fn call_with(
        &self,
        actor_type: &str,
        actor_id: &str,
        method_name: &str,
        payload: Vec<u8>,
        options: CallOptions,
    ) -> Result<Vec<u8>, CallError> {
        let key = ActorKey::new(actor_type, actor_id);

        // Re-entrancy rule: a nested call back into the running activation is
        // failed here, not enqueued behind the turn it would deadlock with.
        if turn::is_on_call_chain(&key) && !self.type_is_reentrant(actor_type) {
            return Err(CallError::Reentrancy(key));
        }

        let target =
            self.membership
                .get_actor_silo(actor_type, actor_id)
                .ok_or_else(|| CallError::Routing {
                    key: key.clone(),
                    reason: "placement ring is empty".to_string(),
                })?;

        let local = *self.transport.local_silo_id() == target;
        if !local {
            let silos = self.membership.active_silos().await?;
            let info = silos
                .into_iter()
                .find(|silo| silo.silo_id == target)
                .ok_or_else(|| CallError::Routing {
                    key: key.clone(),
                    reason: format!("owning silo {target} is not in the live view"),
                })?;
            self.transport
                .connect(&info)
                .await
                .map_err(CallError::Transport)?;
        }
        debug!(actor = %key, method = %method_name, %target, local, "routing call");

        let envelope = Envelope::request_for(&key, method_name, payload);
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let cancellation = options.cancellation.unwrap_or_default();

        let response = self
            .transport
            .send(&target, envelope, timeout, &cancellation)
            .await
            .map_err(|error| match error {
                TransportError::Timeout { timeout } => CallError::Timeout(timeout),
                TransportError::Cancelled => CallError::Cancelled,
                other => CallError::Transport(other),
            })?;

        if response.is_error {
            Err(CallError::Remote(
                response
                    .error_message
                    .unwrap_or_else(|| "unspecified remote error".to_string()),
            ))
        } else {
            Ok(response.response_payload.unwrap_or_default())
        }
    }

    /// The router's default per-call timeout.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn type_is_reentrant(&self, actor_type: &str) -> bool {
        self.manifest
            .as_ref()
            .and_then(|manifest| manifest.get(actor_type))
            .map(|registration| registration.reentrant())
            .unwrap_or(false)
    }
}
