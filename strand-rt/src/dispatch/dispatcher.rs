// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use thiserror::Error;

// Layer 3: Internal module imports
use crate::actor::{ActorInstance, TurnContext};
use crate::message::FramingError;

/// Dispatch-stage failures, all surfaced to the caller as error replies.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The routing key named a type absent from the manifest.
    #[error("No such actor type: {actor_type}")]
    UnknownActorType { actor_type: String },

    /// The method name matched no dispatch entry.
    #[error("No such method: {actor_type}::{method_name}")]
    UnknownMethod {
        actor_type: String,
        method_name: String,
    },

    /// The activation was not of the type this dispatcher serves.
    #[error("Activation is not a {expected}")]
    TypeMismatch { expected: &'static str },

    /// The payload violated the length-delimited framing.
    #[error("Payload framing violation: {0}")]
    Framing(#[from] FramingError),

    /// The typed handler itself failed.
    #[error("Handler failed: {0}")]
    Handler(String),
}

/// Per-actor-type method switch.
///
/// A dispatcher is the server-side half of the generated-proxy contract: a
/// precomputed match over method names that (1) deframes the payload into
/// typed arguments, (2) calls the typed method on the downcast activation,
/// and (3) frames the return value into a reply payload. No runtime
/// reflection is involved; implementations are emitted from the actor
/// interface declarations (or written by hand in exactly that shape) and
/// registered once at silo startup.
///
/// # Example
/// ```rust
/// use async_trait::async_trait;
/// use strand_rt::actor::{ActorInstance, TurnContext};
/// use strand_rt::dispatch::{DispatchError, Dispatcher};
/// use strand_rt::message::{PayloadReader, PayloadWriter};
///
/// #[derive(Default)]
/// struct Counter {
///     value: u64,
/// }
///
/// impl Counter {
///     fn increment(&mut self) -> u64 {
///         self.value += 1;
///         self.value
///     }
/// }
///
/// impl ActorInstance for Counter {
///     fn as_any_mut(&mut self) -> &mut (dyn std::any::Any + Send) {
///         self
///     }
/// }
///
/// struct CounterDispatcher;
///
/// #[async_trait]
/// impl Dispatcher for CounterDispatcher {
///     async fn invoke(
///         &self,
///         instance: &mut dyn ActorInstance,
///         _ctx: &mut TurnContext,
///         method_name: &str,
///         payload: &[u8],
///     ) -> Result<Vec<u8>, DispatchError> {
///         let counter: &mut Counter = instance
///             .as_any_mut()
///             .downcast_mut()
///             .ok_or(DispatchError::TypeMismatch { expected: "Counter" })?;
///         match method_name {
///             "Increment" => {
///                 PayloadReader::new(payload).expect_end()?;
///                 let value = counter.increment();
///                 Ok(PayloadWriter::single(&value.to_le_bytes()))
///             }
///             other => Err(DispatchError::UnknownMethod {
///                 actor_type: "Counter".to_string(),
///                 method_name: other.to_string(),
///             }),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Decode `method_name`/`payload`, run the typed method on `instance`,
    /// and return the framed reply payload.
    async fn invoke(
        &self,
        instance: &mut dyn ActorInstance,
        ctx: &mut TurnContext,
        method_name: &str,
        payload: &[u8],
    ) -> Result<Vec<u8>, DispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::UnknownMethod {
            actor_type: "Counter".to_string(),
            method_name: "Nope".to_string(),
        };
        assert_eq!(err.to_string(), "No such method: Counter::Nope");

        let err = DispatchError::TypeMismatch { expected: "Counter" };
        assert!(err.to_string().contains("not a Counter"));
    }

    #[test]
    fn test_framing_error_conversion() {
        let err: DispatchError = FramingError::MissingSegment.into();
        assert!(matches!(err, DispatchError::Framing(_)));
        assert!(err.to_string().contains("framing"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DispatchError>();
    }
}
