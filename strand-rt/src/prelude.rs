//! Convenience re-exports for host and actor code.
//!
//! ```rust
//! use strand_rt::prelude::*;
//! ```

pub use crate::actor::{ActorInstance, FailureAction, TurnContext};
pub use crate::dispatch::{ActorManifest, ActorTypeOptions, DispatchError, Dispatcher};
pub use crate::membership::{
    InMemoryMembership, MembershipConfig, MembershipProvider, MembershipStore, SiloInfo,
};
pub use crate::message::{Envelope, PayloadReader, PayloadWriter};
pub use crate::router::{CallError, CallOptions, Router};
pub use crate::silo::{Silo, SiloConfig, SiloError};
pub use crate::transport::{TcpTransport, Transport, TransportConfig};
pub use crate::util::{ActorKey, MessageId, SiloId};
