//! Turn-scoped execution context.

// Layer 1: Standard library imports
use std::future::Future;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use crate::router::Router;
use crate::util::ActorKey;

tokio::task_local! {
    /// Activation keys on the current synchronous call chain.
    ///
    /// Set for the duration of one turn; the router consults it to fail
    /// re-entrant calls into non-reentrant activations instead of
    /// deadlocking behind the running turn.
    static CALL_CHAIN: Vec<ActorKey>;
}

/// Run `future` with `chain` as the active call chain.
pub(crate) async fn scoped<F: Future>(chain: Vec<ActorKey>, future: F) -> F::Output {
    CALL_CHAIN.scope(chain, future).await
}

/// Whether `key` is on the current call chain (false outside any turn).
pub(crate) fn is_on_call_chain(key: &ActorKey) -> bool {
    CALL_CHAIN
        .try_with(|chain| chain.contains(key))
        .unwrap_or(false)
}

/// Per-turn context handed to dispatchers and lifecycle hooks.
///
/// Carries the activation's identity, the invocation's cancellation token
/// (observed by handlers at their own suspension points), and a router handle
/// for outgoing calls.
pub struct TurnContext {
    key: ActorKey,
    cancellation: CancellationToken,
    router: Option<Arc<Router>>,
}

impl TurnContext {
    pub(crate) fn new(
        key: ActorKey,
        cancellation: CancellationToken,
        router: Option<Arc<Router>>,
    ) -> Self {
        Self {
            key,
            cancellation,
            router,
        }
    }

    /// Context with a fresh token and no router; for tests and tooling.
    pub fn detached(key: ActorKey) -> Self {
        Self::new(key, CancellationToken::new(), None)
    }

    /// The activation this turn runs on.
    pub fn key(&self) -> &ActorKey {
        &self.key
    }

    /// The invocation's cancellation token.
    ///
    /// Cancellation is cooperative: a handler that suspends should check or
    /// select on this token if it wants to observe caller-side cancellation.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Router for calls to other actors; `None` in detached contexts.
    pub fn router(&self) -> Option<&Arc<Router>> {
        self.router.as_ref()
    }
}

impl std::fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("key", &self.key)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_empty_outside_turn() {
        let key = ActorKey::new("Counter", "c1");
        assert!(!is_on_call_chain(&key));
    }

    #[tokio::test]
    async fn test_chain_visible_inside_scope() {
        let key = ActorKey::new("Counter", "c1");
        let other = ActorKey::new("Counter", "c2");

        scoped(vec![key.clone()], async {
            assert!(is_on_call_chain(&key));
            assert!(!is_on_call_chain(&other));
        })
        .await;

        assert!(!is_on_call_chain(&key));
    }

    #[tokio::test]
    async fn test_chain_does_not_cross_spawn() {
        let key = ActorKey::new("Counter", "c1");
        scoped(vec![key.clone()], async move {
            let handle = tokio::spawn(async move { is_on_call_chain(&key) });
            assert!(!handle.await.unwrap_or(true));
        })
        .await;
    }

    #[test]
    fn test_detached_context() {
        let ctx = TurnContext::detached(ActorKey::new("Counter", "c1"));
        assert_eq!(ctx.key().actor_id(), "c1");
        assert!(!ctx.cancellation().is_cancelled());
        assert!(ctx.router().is_none());
    }
}
