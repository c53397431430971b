//! # strand-rt - Virtual-Actor Cluster Runtime
//!
//! A cluster of processes ("silos") hosting location-transparent,
//! uniquely-addressed stateful actors. Callers invoke methods against actor
//! references; the runtime locates or activates the target on some silo,
//! delivers the invocation over a persistent bi-directional transport,
//! executes it under a turn-based concurrency discipline, and returns the
//! reply. Activations are virtual: a caller never learns whether the target
//! existed before the call.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strand_rt::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Register actor types: one factory + one dispatcher per type.
//!     let mut manifest = ActorManifest::new();
//!     manifest.register(
//!         "Counter",
//!         |_actor_id| Box::new(Counter::default()),
//!         CounterDispatcher,
//!     );
//!
//!     // 2. Join a cluster and start serving.
//!     let config = SiloConfig::default();
//!     let store = MembershipStore::new();
//!     let membership = Arc::new(InMemoryMembership::new(store, config.membership.clone()));
//!     let silo = Silo::new(
//!         SiloId::new("silo-a"),
//!         "127.0.0.1:7070".parse()?,
//!         Arc::new(manifest),
//!         membership,
//!         config,
//!     )?;
//!     silo.start().await?;
//!
//!     // 3. Call actors by identity; placement and activation are implicit.
//!     let router = silo.router();
//!     let reply = router.call("Counter", "c1", "Increment", Vec::new()).await?;
//!     println!("counter is now {:?}", reply);
//!
//!     silo.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Core guarantees
//!
//! - **Turn-based execution**: parallel across activations, single-threaded
//!   within one. A handler runs to completion (through its awaits) before the
//!   next message is dequeued, so actor state needs no locks.
//! - **Virtual activation**: the first request routed to an actor key
//!   materializes it via its registered factory; idle activations quietly
//!   deactivate. At most one activation per key exists under stable
//!   membership.
//! - **Uniform envelopes**: one message shape carries requests and responses,
//!   on the wire and in process; a single predicate
//!   (`response_payload.is_some() || is_error`) separates the two flows.
//! - **Consistent placement**: a CRC32 ring with 150 virtual nodes per silo
//!   maps `(actor_type, actor_id)` to its owning silo; adding a silo moves
//!   roughly `1/N` of the key space.
//!
//! # Module Organization
//!
//! ## Cluster plane
//! - [`ring`] - Consistent-hash placement ring with copy-on-write snapshots
//! - [`membership`] - Live-silo view, heartbeats, join/leave events, eviction
//!
//! ## Messaging plane
//! - [`message`] - The unified envelope and length-delimited payload framing
//! - [`transport`] - Bi-directional framed streams, pending-call map, local
//!   fast path
//!
//! ## Execution plane
//! - [`actor`] - Activation instances, lifecycle hooks, the turn loop
//! - [`mailbox`] - Bounded FIFO queues with overflow policies
//! - [`dispatch`] - Factories, dispatchers, and the static manifest
//! - [`registry`] - Per-silo table of live activations
//!
//! ## Wiring
//! - [`router`] - Caller-side placement resolution and call semantics
//! - [`silo`] - The hosting process: configuration, start/stop, inbound loop
//! - [`util`] - Identifiers ([`util::SiloId`], [`util::ActorKey`],
//!   [`util::MessageId`])

pub mod actor;
pub mod dispatch;
pub mod mailbox;
pub mod membership;
pub mod message;
pub mod prelude;
pub mod registry;
pub mod ring;
pub mod router;
pub mod silo;
pub mod transport;
pub mod util;

// Re-export commonly used types
pub use actor::{ActorInstance, FailureAction, Invocation, TurnContext, TurnItem};
pub use dispatch::{ActorManifest, ActorTypeOptions, DispatchError, Dispatcher};
pub use mailbox::{Mailbox, MailboxError, MailboxMetrics, MailboxSender, OverflowPolicy};
pub use membership::{
    EvictionPolicy, HealthReport, InMemoryMembership, MembershipConfig, MembershipError,
    MembershipEvent, MembershipProvider, MembershipStore, QuorumPolicy, SiloInfo, SiloStatus,
};
pub use message::{Envelope, FramingError, PayloadReader, PayloadWriter};
pub use registry::{ActivationHandle, ActivationRegistry};
pub use ring::HashRing;
pub use router::{CallError, CallOptions, Router};
pub use silo::{Silo, SiloConfig, SiloError};
pub use transport::{TcpTransport, Transport, TransportConfig, TransportError};
pub use util::{ActorKey, MessageId, SiloId};
