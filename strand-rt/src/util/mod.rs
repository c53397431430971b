//! Utility types and helpers for the cluster runtime

pub mod ids;

pub use ids::{ActorKey, MessageId, SiloId};
