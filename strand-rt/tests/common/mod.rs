//! Shared fixtures: a `Counter` actor with a hand-written dispatcher in the
//! exact shape generated code takes, plus cluster bootstrap helpers.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strand_rt::membership::MembershipStore;
use strand_rt::prelude::*;

/// Counter state: a running value plus the order in which `Append` arguments
/// arrived (used by FIFO assertions).
#[derive(Default)]
pub struct Counter {
    pub value: u64,
    pub seq: Vec<u32>,
}

impl ActorInstance for Counter {
    fn as_any_mut(&mut self) -> &mut (dyn std::any::Any + Send) {
        self
    }
}

pub struct CounterDispatcher;

#[async_trait]
impl Dispatcher for CounterDispatcher {
    async fn invoke(
        &self,
        instance: &mut dyn ActorInstance,
        ctx: &mut TurnContext,
        method_name: &str,
        payload: &[u8],
    ) -> Result<Vec<u8>, DispatchError> {
        let counter: &mut Counter = instance
            .as_any_mut()
            .downcast_mut()
            .ok_or(DispatchError::TypeMismatch { expected: "Counter" })?;

        match method_name {
            "Increment" => {
                PayloadReader::new(payload).expect_end()?;
                counter.value += 1;
                Ok(PayloadWriter::single(&counter.value.to_le_bytes()))
            }
            "Get" => {
                PayloadReader::new(payload).expect_end()?;
                Ok(PayloadWriter::single(&counter.value.to_le_bytes()))
            }
            "Append" => {
                let mut reader = PayloadReader::new(payload);
                let raw = reader.next_segment()?;
                reader.expect_end()?;
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(raw);
                counter.seq.push(u32::from_le_bytes(bytes));
                Ok(PayloadWriter::single(&[]))
            }
            "ReadSeq" => {
                PayloadReader::new(payload).expect_end()?;
                let mut out = Vec::with_capacity(counter.seq.len() * 4);
                for value in &counter.seq {
                    out.extend_from_slice(&value.to_le_bytes());
                }
                Ok(PayloadWriter::single(&out))
            }
            "Sleep" => {
                let mut reader = PayloadReader::new(payload);
                let raw = reader.next_segment()?;
                reader.expect_end()?;
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(raw);
                tokio::time::sleep(Duration::from_millis(u64::from_le_bytes(bytes))).await;
                Ok(PayloadWriter::single(&counter.value.to_le_bytes()))
            }
            "Fail" => Err(DispatchError::Handler(
                "synthetic handler failure".to_string(),
            )),
            "CallSelf" => {
                let router = ctx
                    .router()
                    .cloned()
                    .ok_or_else(|| DispatchError::Handler("no router in context".to_string()))?;
                let nested = router
                    .call(
                        ctx.key().actor_type(),
                        ctx.key().actor_id(),
                        "Increment",
                        Vec::new(),
                    )
                    .await;
                match nested {
                    Err(error) => Ok(PayloadWriter::single(error.to_string().as_bytes())),
                    Ok(_) => Err(DispatchError::Handler(
                        "nested self-call unexpectedly succeeded".to_string(),
                    )),
                }
            }
            other => Err(DispatchError::UnknownMethod {
                actor_type: "Counter".to_string(),
                method_name: other.to_string(),
            }),
        }
    }
}

pub fn counter_manifest() -> Arc<ActorManifest> {
    let mut manifest = ActorManifest::new();
    manifest.register(
        "Counter",
        |_actor_id| Box::new(Counter::default()),
        CounterDispatcher,
    );
    Arc::new(manifest)
}

/// Tight timings so cluster tests converge fast.
pub fn fast_config() -> SiloConfig {
    SiloConfig::builder()
        .with_call_timeout(Duration::from_secs(2))
        .with_membership(MembershipConfig {
            heartbeat_interval: Duration::from_millis(50),
            ..MembershipConfig::default()
        })
        .build()
        .unwrap()
}

/// Start a silo on an ephemeral port, keeping a concrete transport handle for
/// socket-level assertions.
pub async fn start_silo(
    name: &str,
    store: &Arc<MembershipStore>,
    config: SiloConfig,
) -> (Silo, Arc<TcpTransport>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let silo_id = SiloId::new(name);
    let transport = Arc::new(TcpTransport::new(
        silo_id.clone(),
        "127.0.0.1:0".parse().unwrap(),
        config.transport.clone(),
    ));
    let membership = Arc::new(InMemoryMembership::new(
        Arc::clone(store),
        config.membership.clone(),
    ));
    let silo = Silo::with_transport(
        silo_id,
        counter_manifest(),
        membership,
        Arc::clone(&transport) as Arc<dyn Transport>,
        config,
    )
    .unwrap();
    silo.start().await.unwrap();
    (silo, transport)
}

/// Wait until this silo's view holds `expected` live members and its
/// placement ring routes to all of them.
pub async fn wait_for_view(silo: &Silo, expected: usize) {
    let membership = silo.membership();
    for _ in 0..100 {
        let live = membership.active_silos().await.unwrap();
        if live.len() == expected {
            let mut owners = std::collections::HashSet::new();
            for i in 0..1000 {
                if let Some(owner) = membership.get_actor_silo("Counter", &format!("probe-{i}")) {
                    owners.insert(owner);
                }
            }
            if owners.len() == expected {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("view never reached {expected} members");
}

/// Find an actor id whose key the current view places on `target`, waiting
/// out ring-sync latency if needed.
pub async fn key_owned_by(silo: &Silo, actor_type: &str, target: &SiloId) -> String {
    let membership = silo.membership();
    for _ in 0..100 {
        for i in 0..10_000 {
            let id = format!("probe-{i}");
            if membership.get_actor_silo(actor_type, &id).as_ref() == Some(target) {
                return id;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no key found that maps to {target}");
}

/// Deframe a single-segment u64 reply.
pub fn read_u64(payload: &[u8]) -> u64 {
    let segment = PayloadReader::single(payload).unwrap();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(segment);
    u64::from_le_bytes(bytes)
}

/// Frame a single u64 argument.
pub fn write_u64(value: u64) -> Vec<u8> {
    PayloadWriter::single(&value.to_le_bytes())
}

/// Frame a single u32 argument.
pub fn write_u32(value: u32) -> Vec<u8> {
    PayloadWriter::single(&value.to_le_bytes())
}
