//! Wire frames: length-delimited, bincode-encoded.
//!
//! The concrete codec is a deployment concern as long as both peers agree;
//! this pairing (a compact schema-described binary encoding inside
//! `LengthDelimitedCodec` frames) is the in-tree default.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

// Layer 3: Internal module imports
use super::error::TransportError;
use crate::message::Envelope;
use crate::util::SiloId;

/// Everything that travels a silo-to-silo stream.
///
/// `Hello` is sent once by the dialing side so the acceptor can key the
/// stream by peer silo id; every later frame is an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Frame {
    Hello { silo_id: SiloId },
    Envelope(Envelope),
}

/// Wrap a TCP stream with the length-delimited frame layer.
pub(crate) fn framed(stream: TcpStream) -> Framed<TcpStream, LengthDelimitedCodec> {
    Framed::new(stream, LengthDelimitedCodec::new())
}

/// Serialize one frame.
pub(crate) fn encode_frame(frame: &Frame) -> Result<Bytes, TransportError> {
    bincode::serialize(frame)
        .map(Bytes::from)
        .map_err(|e| TransportError::Codec(e.to_string()))
}

/// Deserialize one frame.
pub(crate) fn decode_frame(bytes: &[u8]) -> Result<Frame, TransportError> {
    bincode::deserialize(bytes).map_err(|e| TransportError::Codec(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_hello_roundtrip() {
        let frame = Frame::Hello {
            silo_id: SiloId::new("silo-a"),
        };
        let bytes = encode_frame(&frame).unwrap();
        match decode_frame(&bytes).unwrap() {
            Frame::Hello { silo_id } => assert_eq!(silo_id, SiloId::new("silo-a")),
            other => panic!("expected hello frame, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = Envelope::request("Counter", "c1", "Add", vec![9, 9]);
        let frame = Frame::Envelope(envelope.clone());
        let bytes = encode_frame(&frame).unwrap();
        match decode_frame(&bytes).unwrap() {
            Frame::Envelope(decoded) => {
                assert_eq!(decoded.message_id, envelope.message_id);
                assert_eq!(decoded.payload, vec![9, 9]);
            }
            other => panic!("expected envelope frame, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            decode_frame(&[0xff; 3]),
            Err(TransportError::Codec(_))
        ));
    }
}
