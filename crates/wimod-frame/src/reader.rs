use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::Bytes;
use tracing::debug;

use crate::assembler::ReceiveAssembler;
use crate::codec::{decode_frame, Frame};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 256;

/// Reads complete, checksum-verified frames from any `Read` stream.
///
/// Malformed frames are logged and skipped; callers only ever see valid ones.
pub struct FrameReader<T> {
    inner: T,
    assembler: ReceiveAssembler,
    pending: VecDeque<Bytes>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            assembler: ReceiveAssembler::new(),
            pending: VecDeque::new(),
        }
    }

    /// Read the next valid frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            while let Some(body) = self.pending.pop_front() {
                match decode_frame(&body) {
                    Ok(frame) => return Ok(frame),
                    Err(err) => debug!(%err, len = body.len(), "discarding frame"),
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            let pending = &mut self.pending;
            self.assembler.feed(&chunk[..read], |body| {
                pending.push_back(Bytes::copy_from_slice(body));
            });
        }
    }

    /// Receive-side state of the underlying assembler.
    pub fn assembler(&self) -> &ReceiveAssembler {
        &self.assembler
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;
    use crate::slip::{END, ESC};

    fn wire(frames: &[(u8, u8, &[u8])]) -> Vec<u8> {
        let mut out = BytesMut::new();
        for (dst, msg, payload) in frames {
            encode_frame(*dst, *msg, payload, &mut out).unwrap();
        }
        out.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[(0x01, 0x02, &[0x00])])));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.key(), (0x01, 0x02));
        assert_eq!(frame.payload.as_ref(), &[0x00]);
    }

    #[test]
    fn read_multiple_frames_in_one_chunk() {
        let bytes = wire(&[(0x01, 0x02, b"a"), (0x01, 0x04, b"b"), (0x02, 0x06, b"c")]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        assert_eq!(reader.read_frame().unwrap().msg_id, 0x02);
        assert_eq!(reader.read_frame().unwrap().msg_id, 0x04);
        assert_eq!(reader.read_frame().unwrap().msg_id, 0x06);
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn malformed_frames_are_skipped() {
        let mut bytes = vec![END, 0x01, 0x02, END];
        bytes.extend(wire(&[(0x01, 0x04, &[0x00])]));
        let mut damaged = wire(&[(0x01, 0x02, &[0x00])]);
        damaged[2] ^= 0x01;
        bytes.extend(damaged);
        bytes.extend(wire(&[(0x01, 0x06, &[])]));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_frame().unwrap().msg_id, 0x04);
        assert_eq!(reader.read_frame().unwrap().msg_id, 0x06);
        assert_eq!(reader.assembler().stats().frames, 4);
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[(0x01, 0x04, &[ESC, END, 0x11])]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), &[ESC, END, 0x11]);
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut bytes = wire(&[(0x01, 0x02, b"cut")]);
        bytes.pop();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire(&[(0x01, 0x02, &[0x00])])),
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_frame().unwrap().msg_id, 0x02);
    }

    #[test]
    fn would_block_propagates_io_error() {
        let mut framed = FrameReader::new(WouldBlockReader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    struct WouldBlockReader;

    impl Read for WouldBlockReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }
}
