//! Typed method dispatch: per-type dispatchers, factories, and the static
//! registration manifest.

pub mod dispatcher;
pub mod manifest;

pub use dispatcher::{DispatchError, Dispatcher};
pub use manifest::{ActorManifest, ActorTypeOptions, ActorTypeRegistration};
