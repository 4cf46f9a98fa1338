use std::time::Duration;

use crate::error::Result;

/// The byte-level capability a link needs from its physical transport.
///
/// Implementations are driven from behind a connection-scoped lock, so a
/// single `write` call is never interleaved with another one.
pub trait Transport: Send {
    /// Acquire the underlying device.
    fn open(&mut self) -> Result<()>;

    /// Release the underlying device. Closing a closed transport is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Set line speed and hardware flow control.
    fn configure(&mut self, baud_rate: u32, flow_control: bool) -> Result<()>;

    /// Write all of `buf`, failing if that takes longer than `timeout`.
    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn configure(&mut self, baud_rate: u32, flow_control: bool) -> Result<()> {
        (**self).configure(baud_rate, flow_control)
    }

    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<()> {
        (**self).write(buf, timeout)
    }
}
