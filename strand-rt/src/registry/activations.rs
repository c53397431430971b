// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tracing::debug;

// Layer 3: Internal module imports
use crate::actor::{ActivationWorker, Invocation, TurnItem};
use crate::dispatch::{ActorManifest, DispatchError};
use crate::mailbox::{Mailbox, MailboxError, MailboxSender, OverflowPolicy};
use crate::router::Router;
use crate::transport::Transport;
use crate::util::ActorKey;

/// Cheap handle onto one live activation: its mailbox producer side.
#[derive(Clone)]
pub struct ActivationHandle {
    key: ActorKey,
    sender: MailboxSender<TurnItem>,
}

impl ActivationHandle {
    /// The activation's identity.
    pub fn key(&self) -> &ActorKey {
        &self.key
    }

    /// Enqueue an invocation under the mailbox's overflow policy.
    pub async fn enqueue(&self, invocation: Invocation) -> Result<(), MailboxError> {
        self.sender.send(TurnItem::Invoke(invocation)).await
    }

    /// Current queue depth (the channel's own counter).
    pub fn mailbox_depth(&self) -> usize {
        self.sender.depth()
    }

    /// Whether the worker already closed this mailbox.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Ask the activation to finish queued work and deactivate.
    ///
    /// Best-effort: a full mailbox drops the signal, so shutdown paths retry.
    pub fn try_stop(&self) {
        let _ = self.sender.try_send(TurnItem::Stop);
    }
}

/// Per-silo concurrent table `ActorKey → ActivationHandle`.
///
/// `get_or_create` is the only way activations come to life; the underlying
/// map's entry API holds the shard lock across the factory call, which is
/// what guarantees at-most-one concurrent creation per key on this silo.
pub struct ActivationRegistry {
    activations: Arc<DashMap<ActorKey, ActivationHandle>>,
    manifest: Arc<ActorManifest>,
    transport: Arc<dyn Transport>,
    router: Arc<Router>,
    mailbox_capacity: usize,
    overflow: OverflowPolicy,
    idle_deactivation: Duration,
}

impl ActivationRegistry {
    /// Create an empty registry.
    pub fn new(
        manifest: Arc<ActorManifest>,
        transport: Arc<dyn Transport>,
        router: Arc<Router>,
        mailbox_capacity: usize,
        overflow: OverflowPolicy,
        idle_deactivation: Duration,
    ) -> Self {
        Self {
            activations: Arc::new(DashMap::new()),
            manifest,
            transport,
            router,
            mailbox_capacity,
            overflow,
            idle_deactivation,
        }
    }

    /// Resolve the live activation for `key`, materializing it on first use.
    ///
    /// Creation implicitly schedules `on_activate` as the activation's first
    /// turn.
    pub fn get_or_create(&self, key: &ActorKey) -> Result<ActivationHandle, DispatchError> {
        if let Some(handle) = self.activations.get(key) {
            return Ok(handle.value().clone());
        }

        let registration = self.manifest.get(key.actor_type()).ok_or_else(|| {
            DispatchError::UnknownActorType {
                actor_type: key.actor_type().to_string(),
            }
        })?;

        let handle = self
            .activations
            .entry(key.clone())
            .or_insert_with(|| {
                let (mailbox, sender) = Mailbox::new(self.mailbox_capacity, self.overflow);
                let handle = ActivationHandle {
                    key: key.clone(),
                    sender,
                };

                let activations = Arc::clone(&self.activations);
                let exit_key = key.clone();
                let exit_sender = handle.sender.clone();
                let on_exit = Box::new(move || {
                    // Only evict our own incarnation; a successor registered
                    // under the same key stays.
                    activations
                        .remove_if(&exit_key, |_, current| {
                            current.sender.same_channel(&exit_sender)
                        });
                });

                debug!(actor = %key, "creating activation");
                ActivationWorker::spawn(
                    key.clone(),
                    registration,
                    mailbox,
                    Arc::clone(&self.transport),
                    Arc::clone(&self.router),
                    self.idle_deactivation,
                    on_exit,
                );
                handle
            })
            .value()
            .clone();

        Ok(handle)
    }

    /// The live activation for `key`, if any.
    pub fn get(&self, key: &ActorKey) -> Option<ActivationHandle> {
        self.activations.get(key).map(|entry| entry.value().clone())
    }

    /// Number of live activations on this silo.
    pub fn activation_count(&self) -> usize {
        self.activations.len()
    }

    /// Drain every activation: signal stop, then wait for the table to empty.
    ///
    /// Returns true when all activations deactivated inside `deadline`.
    pub async fn drain_all(&self, deadline: Duration) -> bool {
        let started = tokio::time::Instant::now();
        loop {
            if self.activations.is_empty() {
                return true;
            }
            for entry in self.activations.iter() {
                entry.value().try_stop();
            }
            if started.elapsed() >= deadline {
                return self.activations.is_empty();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;
    use crate::actor::{ActorInstance, TurnContext};
    use crate::dispatch::Dispatcher;
    use crate::membership::{InMemoryMembership, MembershipConfig, MembershipStore};
    use crate::message::{Envelope, PayloadWriter};
    use crate::transport::{TcpTransport, TransportConfig};
    use crate::util::SiloId;
    use async_trait::async_trait;

    #[derive(Default)]
    struct Counter {
        value: u64,
    }

    impl ActorInstance for Counter {
        fn as_any_mut(&mut self) -> &mut (dyn std::any::Any + Send) {
            self
        }
    }

    struct CounterDispatcher;

    #[async_trait]
    impl Dispatcher for CounterDispatcher {
        async fn invoke(
            &self,
            instance: &mut dyn ActorInstance,
            _ctx: &mut TurnContext,
            method_name: &str,
            _payload: &[u8],
        ) -> Result<Vec<u8>, DispatchError> {
            let counter: &mut Counter = instance
                .as_any_mut()
                .downcast_mut()
                .ok_or(DispatchError::TypeMismatch { expected: "Counter" })?;
            match method_name {
                "Increment" => {
                    counter.value += 1;
                    Ok(PayloadWriter::single(&counter.value.to_le_bytes()))
                }
                other => Err(DispatchError::UnknownMethod {
                    actor_type: "Counter".to_string(),
                    method_name: other.to_string(),
                }),
            }
        }
    }

    fn registry() -> ActivationRegistry {
        let mut manifest = ActorManifest::new();
        manifest.register(
            "Counter",
            |_actor_id| Box::new(Counter::default()),
            CounterDispatcher,
        );
        let manifest = Arc::new(manifest);

        let silo_id = SiloId::new("silo-test");
        let transport: Arc<dyn Transport> = Arc::new(TcpTransport::new(
            silo_id,
            "127.0.0.1:0".parse().unwrap(),
            TransportConfig::default(),
        ));
        let membership = Arc::new(InMemoryMembership::observer(
            MembershipStore::new(),
            MembershipConfig::default(),
        ));
        let router = Arc::new(Router::new(
            membership,
            Arc::clone(&transport),
            Some(Arc::clone(&manifest)),
            Duration::from_secs(5),
        ));

        ActivationRegistry::new(
            manifest,
            transport,
            router,
            16,
            OverflowPolicy::Reject,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_get_or_create_single_activation() {
        let registry = registry();
        let key = ActorKey::new("Counter", "c1");

        let h1 = registry.get_or_create(&key).unwrap();
        let h2 = registry.get_or_create(&key).unwrap();

        assert_eq!(registry.activation_count(), 1);
        assert!(h1.sender.same_channel(&h2.sender));
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_yields_one_activation() {
        let registry = Arc::new(registry());
        let key = ActorKey::new("Counter", "c1");

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let key = key.clone();
                tokio::spawn(async move { registry.get_or_create(&key).map(|_| ()) })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(registry.activation_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_type_rejected() {
        let registry = registry();
        let key = ActorKey::new("Nope", "x");
        let result = registry.get_or_create(&key);
        assert!(matches!(
            result,
            Err(DispatchError::UnknownActorType { .. })
        ));
        assert_eq!(registry.activation_count(), 0);
    }

    #[tokio::test]
    async fn test_enqueued_turn_produces_response_envelope() {
        let registry = registry();
        let key = ActorKey::new("Counter", "c1");
        let handle = registry.get_or_create(&key).unwrap();

        let mut responses = registry.transport.subscribe();
        let request = Envelope::request_for(&key, "Increment", Vec::new());
        let message_id = request.message_id;
        handle.enqueue(Invocation::new(request)).await.unwrap();

        let response = responses.recv().await.unwrap();
        assert!(response.is_response());
        assert_eq!(response.message_id, message_id);
        assert_eq!(handle.mailbox_depth(), 0);
    }

    #[tokio::test]
    async fn test_drain_all_empties_registry() {
        let registry = registry();
        for i in 0..3 {
            registry
                .get_or_create(&ActorKey::new("Counter", format!("c{i}")))
                .unwrap();
        }
        assert_eq!(registry.activation_count(), 3);

        let drained = registry.drain_all(Duration::from_secs(2)).await;
        assert!(drained);
        assert_eq!(registry.activation_count(), 0);
    }
}
