//! The per-activation turn loop.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::traits::{ActorInstance, FailureAction};
use super::turn::{self, TurnContext};
use crate::dispatch::ActorTypeRegistration;
use crate::mailbox::Mailbox;
use crate::message::Envelope;
use crate::router::Router;
use crate::transport::Transport;
use crate::util::ActorKey;

/// One queued invocation: the request envelope plus its cancellation token.
pub struct Invocation {
    pub envelope: Envelope,
    pub cancellation: CancellationToken,
}

impl Invocation {
    /// Wrap a request envelope with a fresh token.
    pub fn new(envelope: Envelope) -> Self {
        Self {
            envelope,
            cancellation: CancellationToken::new(),
        }
    }

    /// Wrap a request envelope with an explicit token.
    pub fn with_cancellation(envelope: Envelope, cancellation: CancellationToken) -> Self {
        Self {
            envelope,
            cancellation,
        }
    }
}

/// Items carried by an activation mailbox.
pub enum TurnItem {
    /// Dispatch one request.
    Invoke(Invocation),
    /// Lifecycle signal: finish queued work and deactivate.
    Stop,
}

/// Drives one activation: materializes the instance, runs `on_activate` as
/// the first turn, then dequeues one message at a time and runs each handler
/// to completion before taking the next. At most one turn is ever in flight,
/// which is the whole single-threaded-actor guarantee.
pub struct ActivationWorker;

impl ActivationWorker {
    /// Spawn the worker task for `key`.
    ///
    /// `on_exit` is invoked exactly once, before the drain pass, so the
    /// registry drops its handle while queued stragglers are still served.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn spawn(
        key: ActorKey,
        registration: Arc<ActorTypeRegistration>,
        mailbox: Mailbox<TurnItem>,
        transport: Arc<dyn Transport>,
        router: Arc<Router>,
        idle_deactivation: Duration,
        on_exit: Box<dyn FnOnce() + Send>,
    ) -> JoinHandle<()> {
        tokio::spawn(Self::run(
            key,
            registration,
            mailbox,
            transport,
            router,
            idle_deactivation,
            on_exit,
        ))
    }

    async fn run(
        key: ActorKey,
        registration: Arc<ActorTypeRegistration>,
        mut mailbox: Mailbox<TurnItem>,
        transport: Arc<dyn Transport>,
        router: Arc<Router>,
        idle_deactivation: Duration,
        on_exit: Box<dyn FnOnce() + Send>,
    ) {
        let mut instance = registration.create(key.actor_id());

        // First turn: on_activate, before any user message.
        let mut ctx = TurnContext::new(
            key.clone(),
            CancellationToken::new(),
            Some(Arc::clone(&router)),
        );
        let activated =
            turn::scoped(vec![key.clone()], instance.on_activate(&mut ctx)).await;
        if let Err(error) = activated {
            warn!(actor = %key, %error, "activation failed to start");
            on_exit();
            mailbox.close();
            while let Ok(item) = mailbox.try_recv() {
                if let TurnItem::Invoke(invocation) = item {
                    let response = invocation
                        .envelope
                        .error_response(format!("activation failed: {error}"));
                    Self::respond(&transport, response).await;
                }
            }
            return;
        }
        debug!(actor = %key, "activated");

        loop {
            tokio::select! {
                item = mailbox.recv() => match item {
                    Some(TurnItem::Invoke(invocation)) => {
                        let action = Self::process_turn(
                            instance.as_mut(),
                            &registration,
                            &key,
                            &router,
                            &transport,
                            invocation,
                        )
                        .await;
                        if action == FailureAction::Deactivate {
                            debug!(actor = %key, "deactivating after handler failure");
                            break;
                        }
                    }
                    Some(TurnItem::Stop) | None => break,
                },
                _ = tokio::time::sleep(idle_deactivation) => {
                    debug!(actor = %key, "idle deactivation");
                    break;
                }
            }
        }

        // Unregister first so new requests materialize a fresh activation,
        // then serve whatever already made it into the queue.
        on_exit();
        mailbox.close();
        loop {
            match mailbox.try_recv() {
                Ok(TurnItem::Invoke(invocation)) => {
                    let _ = Self::process_turn(
                        instance.as_mut(),
                        &registration,
                        &key,
                        &router,
                        &transport,
                        invocation,
                    )
                    .await;
                }
                Ok(TurnItem::Stop) => continue,
                Err(_) => break,
            }
        }

        // Final turn: on_deactivate.
        let mut ctx = TurnContext::new(
            key.clone(),
            CancellationToken::new(),
            Some(Arc::clone(&router)),
        );
        turn::scoped(vec![key.clone()], instance.on_deactivate(&mut ctx)).await;
        debug!(actor = %key, "deactivated");
    }

    async fn process_turn(
        instance: &mut dyn ActorInstance,
        registration: &Arc<ActorTypeRegistration>,
        key: &ActorKey,
        router: &Arc<Router>,
        transport: &Arc<dyn Transport>,
        invocation: Invocation,
    ) -> FailureAction {
        let Invocation {
            envelope,
            cancellation,
        } = invocation;

        if cancellation.is_cancelled() {
            Self::respond(transport, envelope.error_response("invocation cancelled")).await;
            return FailureAction::Continue;
        }

        let mut ctx = TurnContext::new(key.clone(), cancellation, Some(Arc::clone(router)));
        let result = turn::scoped(
            vec![key.clone()],
            registration
                .dispatcher()
                .invoke(instance, &mut ctx, &envelope.method_name, &envelope.payload),
        )
        .await;

        match result {
            Ok(reply) => {
                Self::respond(transport, envelope.response(reply)).await;
                FailureAction::Continue
            }
            Err(error) => {
                debug!(actor = %key, method = %envelope.method_name, %error, "turn failed");
                Self::respond(transport, envelope.error_response(error.to_string())).await;
                instance.on_handler_error(&error)
            }
        }
    }

    async fn respond(transport: &Arc<dyn Transport>, response: Envelope) {
        if let Err(error) = transport.send_response(response).await {
            warn!(%error, "failed to emit response envelope");
        }
    }
}
