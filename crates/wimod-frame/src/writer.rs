use std::time::Duration;

use bytes::BytesMut;
use tracing::trace;
use wimod_transport::Transport;

use crate::codec::{encode_frame, Frame, MAX_PACKET_SIZE};
use crate::error::Result;

/// Encodes frames and writes them to a [`Transport`].
///
/// Each frame goes out in a single `Transport::write` call, so a writer kept
/// behind a lock never interleaves the bytes of two frames.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Transport> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_PACKET_SIZE),
        }
    }

    /// Write a complete frame.
    pub fn write_frame(&mut self, frame: &Frame, timeout: Duration) -> Result<()> {
        self.send(frame.dst_id, frame.msg_id, frame.payload.as_ref(), timeout)
    }

    /// Encode and send a message.
    pub fn send(&mut self, dst_id: u8, msg_id: u8, payload: &[u8], timeout: Duration) -> Result<()> {
        self.buf.clear();
        encode_frame(dst_id, msg_id, payload, &mut self.buf)?;

        trace!(dst_id, msg_id, wire_len = self.buf.len(), "sending frame");
        self.inner.write(&self.buf, timeout)?;
        Ok(())
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
