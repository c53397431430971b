// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::turn::TurnContext;
use crate::dispatch::DispatchError;

/// Error type for lifecycle hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// A live activation instance.
///
/// User actor types implement this trait (usually with nothing beyond
/// `as_any_mut`) and expose their behavior through a [`Dispatcher`]
/// registered for the same type name. The runtime guarantees that all calls
/// into one instance (hooks and dispatched turns alike) run strictly one at
/// a time, so implementations need no interior synchronization.
///
/// [`Dispatcher`]: crate::dispatch::Dispatcher
///
/// # Example
/// ```rust
/// use strand_rt::actor::ActorInstance;
///
/// #[derive(Default)]
/// struct Counter {
///     value: u64,
/// }
///
/// impl ActorInstance for Counter {
///     fn as_any_mut(&mut self) -> &mut (dyn std::any::Any + Send) {
///         self
///     }
/// }
/// ```
#[async_trait]
pub trait ActorInstance: Send + 'static {
    /// Downcast access for the typed dispatcher.
    fn as_any_mut(&mut self) -> &mut (dyn Any + Send);

    /// First turn of a fresh activation, before any message is dispatched.
    ///
    /// A failure here aborts the activation: queued invocations are failed
    /// and the registry entry is removed.
    async fn on_activate(&mut self, _ctx: &mut TurnContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Final turn before the activation is dropped.
    async fn on_deactivate(&mut self, _ctx: &mut TurnContext) {}

    /// Decide what happens to the activation after a failed turn.
    ///
    /// The caller already received the error reply; this only steers the
    /// activation's own lifecycle.
    fn on_handler_error(&mut self, _error: &DispatchError) -> FailureAction {
        FailureAction::Continue
    }
}

/// Lifecycle decision after a failed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureAction {
    /// Keep the activation and process the next message.
    #[default]
    Continue,

    /// Deactivate: drain, run `on_deactivate`, drop the instance.
    Deactivate,
}
