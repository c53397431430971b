//! Wire and in-process messaging: the unified envelope and payload framing.

pub mod envelope;
pub mod framing;

pub use envelope::Envelope;
pub use framing::{FramingError, PayloadReader, PayloadWriter};
