//! Length-delimited parameter framing.
//!
//! A request payload is the concatenation of one segment per method
//! parameter, in declaration order; each segment is a 32-bit little-endian
//! length followed by exactly that many bytes. Return values use the same
//! framing with a single segment. The reader hands out exactly-bounded
//! sub-slices, so a buggy per-parameter codec cannot corrupt the demarcation
//! of later segments.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::{BufMut, BytesMut};
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Framing violations detected while reading a payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Fewer than four bytes remained where a segment length was expected.
    #[error("Truncated segment length at offset {offset} ({remaining} bytes remaining)")]
    TruncatedLength { offset: usize, remaining: usize },

    /// A segment declared more bytes than the payload still holds.
    #[error("Truncated segment at offset {offset}: declared {declared} bytes, {available} available")]
    TruncatedSegment {
        offset: usize,
        declared: usize,
        available: usize,
    },

    /// A handler read fewer segments than the payload carried.
    #[error("Trailing bytes after final segment: {remaining} remaining")]
    TrailingBytes { remaining: usize },

    /// A handler asked for more segments than the payload carried.
    #[error("Missing segment: payload exhausted")]
    MissingSegment,
}

/// Writer side of the framing: appends length-prefixed segments.
///
/// # Example
/// ```rust
/// use strand_rt::message::{PayloadReader, PayloadWriter};
///
/// let mut writer = PayloadWriter::new();
/// writer.push(b"hello");
/// writer.push(&42u64.to_le_bytes());
/// let payload = writer.finish();
///
/// let mut reader = PayloadReader::new(&payload);
/// assert_eq!(reader.next_segment().unwrap(), b"hello");
/// ```
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one parameter segment.
    pub fn push(&mut self, segment: &[u8]) -> &mut Self {
        self.buf.put_u32_le(segment.len() as u32);
        self.buf.put_slice(segment);
        self
    }

    /// Consume the writer and return the framed payload.
    pub fn finish(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Frame a single segment; the shape used for return values.
    pub fn single(segment: &[u8]) -> Vec<u8> {
        let mut writer = Self::new();
        writer.push(segment);
        writer.finish()
    }
}

/// Reader side of the framing: yields exactly-bounded segment slices.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    /// Wrap a framed payload.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Read the next segment.
    ///
    /// Reads the four-byte length, then constrains the returned slice to
    /// exactly that many bytes.
    pub fn next_segment(&mut self) -> Result<&'a [u8], FramingError> {
        let remaining = self.buf.len() - self.pos;
        if remaining == 0 {
            return Err(FramingError::MissingSegment);
        }
        if remaining < 4 {
            return Err(FramingError::TruncatedLength {
                offset: self.pos,
                remaining,
            });
        }

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        let declared = u32::from_le_bytes(len_bytes) as usize;
        let body_start = self.pos + 4;
        let available = self.buf.len() - body_start;

        if declared > available {
            return Err(FramingError::TruncatedSegment {
                offset: self.pos,
                declared,
                available,
            });
        }

        self.pos = body_start + declared;
        Ok(&self.buf[body_start..body_start + declared])
    }

    /// Assert that every segment has been consumed.
    ///
    /// A handler that leaves bytes behind declared fewer parameters than the
    /// caller framed; that is a protocol error, not a silent truncation.
    pub fn expect_end(&self) -> Result<(), FramingError> {
        let remaining = self.buf.len() - self.pos;
        if remaining != 0 {
            return Err(FramingError::TrailingBytes { remaining });
        }
        Ok(())
    }

    /// Read a single-segment payload; the shape used for return values.
    pub fn single(buf: &'a [u8]) -> Result<&'a [u8], FramingError> {
        let mut reader = Self::new(buf);
        let segment = reader.next_segment()?;
        reader.expect_end()?;
        Ok(segment)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_multiple_segments() {
        let mut writer = PayloadWriter::new();
        writer.push(b"first");
        writer.push(b"");
        writer.push(&7u32.to_le_bytes());
        let payload = writer.finish();

        let mut reader = PayloadReader::new(&payload);
        assert_eq!(reader.next_segment().unwrap(), b"first");
        assert_eq!(reader.next_segment().unwrap(), b"");
        assert_eq!(reader.next_segment().unwrap(), 7u32.to_le_bytes());
        reader.expect_end().unwrap();
    }

    #[test]
    fn test_single_helpers() {
        let payload = PayloadWriter::single(b"value");
        assert_eq!(PayloadReader::single(&payload).unwrap(), b"value");
    }

    #[test]
    fn test_empty_payload_has_no_segments() {
        let mut reader = PayloadReader::new(&[]);
        assert_eq!(reader.next_segment(), Err(FramingError::MissingSegment));
        // And an empty payload is a valid zero-parameter frame.
        PayloadReader::new(&[]).expect_end().unwrap();
    }

    #[test]
    fn test_truncated_length_prefix() {
        let payload = vec![5, 0]; // two of four length bytes
        let mut reader = PayloadReader::new(&payload);
        assert_eq!(
            reader.next_segment(),
            Err(FramingError::TruncatedLength {
                offset: 0,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_truncated_segment_body() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&10u32.to_le_bytes());
        payload.extend_from_slice(b"short");

        let mut reader = PayloadReader::new(&payload);
        assert_eq!(
            reader.next_segment(),
            Err(FramingError::TruncatedSegment {
                offset: 0,
                declared: 10,
                available: 5
            })
        );
    }

    #[test]
    fn test_trailing_bytes_detected() {
        let mut writer = PayloadWriter::new();
        writer.push(b"one");
        writer.push(b"two");
        let payload = writer.finish();

        let mut reader = PayloadReader::new(&payload);
        reader.next_segment().unwrap();
        assert_eq!(
            reader.expect_end(),
            Err(FramingError::TrailingBytes { remaining: 7 })
        );
    }

    #[test]
    fn test_corrupt_length_does_not_shift_other_segments() {
        // Property: corrupting one segment's length raises a framing error
        // rather than silently re-demarcating the remainder.
        let mut writer = PayloadWriter::new();
        writer.push(b"aaaa");
        writer.push(b"bbbb");
        let mut payload = writer.finish();

        // Inflate the first length beyond the buffer.
        payload[0] = 0xff;

        let mut reader = PayloadReader::new(&payload);
        assert!(matches!(
            reader.next_segment(),
            Err(FramingError::TruncatedSegment { .. })
        ));
    }

    #[test]
    fn test_reader_isolates_segment_bounds() {
        let mut writer = PayloadWriter::new();
        writer.push(&[0xde, 0xad]);
        writer.push(&[0xbe, 0xef]);
        let payload = writer.finish();

        let mut reader = PayloadReader::new(&payload);
        let first = reader.next_segment().unwrap();
        let second = reader.next_segment().unwrap();

        // Sub-slices are exactly bounded; no overlap.
        assert_eq!(first, &[0xde, 0xad]);
        assert_eq!(second, &[0xbe, 0xef]);
    }
}
