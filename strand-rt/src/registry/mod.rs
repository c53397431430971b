//! Per-silo table of live activations.

pub mod activations;

pub use activations::{ActivationHandle, ActivationRegistry};
