//! Byte sinks and byte sources.
//!
//! These only move raw bytes. All encoding logic lives in [super::ser] and [super::de].

use std::io;

use super::err::{DecodeError, EncodeError};

/// Destination for encoded bytes.
pub trait ByteSink {
    /// Append all of `bytes` to the sink, or fail without a partial guarantee.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError>;
}

/// Origin of encoded bytes.
pub trait ByteSource {
    /// Fill `buf` completely, advancing the cursor by `buf.len()`.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), DecodeError>;

    /// Number of bytes left, if the source knows it.
    ///
    /// Used to reject impossible length prefixes before allocating.
    fn remaining(&self) -> Option<usize> {
        None
    }
}

/// Owned, growable buffer. Never runs out of space.
impl ByteSink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Caller-owned fixed buffer.
///
/// Writing past the end returns [EncodeError::SinkExhausted]; nothing of the
/// rejected write is copied.
pub struct SliceSink<'buf> {
    slice: &'buf mut [u8],
    offset: usize,
}

impl<'buf> SliceSink<'buf> {
    pub fn new(slice: &'buf mut [u8]) -> Self {
        Self { slice, offset: 0 }
    }

    /// Number of bytes written so far
    pub fn position(&self) -> usize {
        self.offset
    }

    /// The written prefix of the buffer
    pub fn written(&self) -> &[u8] {
        &self.slice[..self.offset]
    }
}

impl<'buf> ByteSink for SliceSink<'buf> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        let remaining = self.slice.len() - self.offset;
        if bytes.len() > remaining {
            return Err(EncodeError::SinkExhausted {
                needed: bytes.len(),
                remaining,
            });
        }

        self.slice[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
        Ok(())
    }
}

/// Adapter for any [io::Write], owned or borrowed (`&mut W` is also [io::Write]).
pub struct StreamSink<W> {
    inner: W,
}

impl<W: io::Write> StreamSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> ByteSink for StreamSink<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.inner.write_all(bytes).map_err(EncodeError::Io)
    }
}

/// A reference into an existing slice of bytes, with a read cursor.
pub struct SliceSource<'arr> {
    slice: &'arr [u8],
    offset: usize,
}

impl<'arr> SliceSource<'arr> {
    /// Create a new source on a byte slice
    pub fn from_slice(s: &'arr [u8]) -> Self {
        Self {
            slice: s,
            offset: 0,
        }
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Returns `true` if every byte has been consumed
    pub fn is_end(&self) -> bool {
        self.offset == self.slice.len()
    }

    /// Peek at the next byte in the slice
    pub fn peek(&self) -> Option<&u8> {
        self.slice.get(self.offset)
    }

    fn distance_to_end(&self) -> usize {
        self.slice.len() - self.offset
    }
}

impl<'arr> From<&'arr [u8]> for SliceSource<'arr> {
    fn from(s: &'arr [u8]) -> Self {
        Self::from_slice(s)
    }
}

impl<'arr> ByteSource for SliceSource<'arr> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        let remaining = self.distance_to_end();
        if buf.len() > remaining {
            return Err(DecodeError::UnexpectedEof {
                needed: buf.len(),
                remaining,
            });
        }

        buf.copy_from_slice(&self.slice[self.offset..self.offset + buf.len()]);
        self.offset += buf.len();
        Ok(())
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.distance_to_end())
    }
}

/// Adapter for any [io::Read], owned or borrowed.
pub struct StreamSource<R> {
    inner: R,
}

impl<R: io::Read> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: io::Read> ByteSource for StreamSource<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => DecodeError::UnexpectedEof {
                needed: buf.len(),
                remaining: 0,
            },
            _ => DecodeError::Io(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_sink_exhaustion() {
        let mut buf = [0_u8; 4];
        let mut sink = SliceSink::new(&mut buf);

        sink.write_bytes(&[1, 2, 3]).unwrap();
        let err = sink.write_bytes(&[4, 5]).unwrap_err();

        assert!(matches!(
            err,
            EncodeError::SinkExhausted {
                needed: 2,
                remaining: 1
            }
        ));
        // rejected write leaves the prefix untouched
        assert_eq!(sink.written(), &[1, 2, 3]);
    }

    #[test]
    fn test_slice_source_cursor() {
        let bytes = [10_u8, 20, 30];
        let mut source = SliceSource::from_slice(&bytes);

        let mut two = [0_u8; 2];
        source.read_bytes(&mut two).unwrap();
        assert_eq!(two, [10, 20]);
        assert_eq!(source.peek(), Some(&30));
        assert_eq!(source.remaining(), Some(1));

        let err = source.read_bytes(&mut two).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnexpectedEof {
                needed: 2,
                remaining: 1
            }
        ));
        // failed read does not advance
        assert_eq!(source.position(), 2);
        assert!(!source.is_end());
    }

    #[test]
    fn test_stream_adapters() {
        let mut out = Vec::new();
        {
            let mut sink = StreamSink::new(&mut out);
            sink.write_bytes(b"abc").unwrap();
        }

        let mut source = StreamSource::new(io::Cursor::new(out));
        let mut buf = [0_u8; 3];
        source.read_bytes(&mut buf).unwrap();
        assert_eq!(&buf, b"abc");

        let err = source.read_bytes(&mut buf).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
    }
}
