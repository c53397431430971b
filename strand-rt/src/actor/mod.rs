//! Activations: the live in-memory actors and their turn-based execution.

pub mod activation;
pub mod traits;
pub mod turn;

pub use activation::{ActivationWorker, Invocation, TurnItem};
pub use traits::{ActorInstance, FailureAction, HookError};
pub use turn::TurnContext;
