//! Silo-to-silo envelope transport.
//!
//! One bi-directional framed TCP stream per remote silo carries request and
//! response envelopes interleaved; responses are demultiplexed strictly by
//! `message_id`. Local targets short-circuit the sockets entirely.

pub mod backoff;
pub mod codec;
pub mod error;
pub mod tcp;
pub mod traits;

pub use backoff::ReconnectBackoff;
pub use error::TransportError;
pub use tcp::{TcpTransport, TransportConfig};
pub use traits::Transport;
