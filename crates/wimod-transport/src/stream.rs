use std::io::{ErrorKind, Write};
use std::time::Duration;

use tracing::trace;

use crate::deadline::Deadline;
use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Adapts any `Write` stream to [`Transport`].
///
/// Line configuration is meaningless for a generic stream and is accepted as
/// a no-op. The deadline is checked between partial writes; a single blocking
/// `write` on the inner stream is bounded only by the stream's own timeout.
pub struct StreamTransport<S> {
    inner: S,
    open: bool,
}

impl<S: Write + Send> StreamTransport<S> {
    /// Wrap an already-connected stream. The transport starts out open.
    pub fn new(inner: S) -> Self {
        Self { inner, open: true }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the transport and return the inner stream.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Whether the transport is currently open.
    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl<S: Write + Send> Transport for StreamTransport<S> {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.inner.flush()?;
        }
        Ok(())
    }

    fn configure(&mut self, baud_rate: u32, flow_control: bool) -> Result<()> {
        trace!(baud_rate, flow_control, "stream transport ignores line configuration");
        Ok(())
    }

    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<()> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }

        let deadline = Deadline::after(timeout);
        let mut offset = 0usize;
        while offset < buf.len() {
            if deadline.is_expired() {
                return Err(TransportError::Timeout(timeout));
            }
            match self.inner.write(&buf[offset..]) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}
