//! The silo: one process hosting activations, wired into the cluster.

pub mod config;
pub mod errors;
#[allow(clippy::module_inception)]
pub mod silo;

pub use config::{SiloConfig, SiloConfigBuilder};
pub use errors::SiloError;
pub use silo::Silo;
