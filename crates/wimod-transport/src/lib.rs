//! Byte transport abstraction for serial-attached radio modules.
//!
//! This is the lowest layer of wimod. The link layer above only needs four
//! things from a transport: open it, close it, set the line parameters, and
//! write a burst of bytes within a deadline. Received bytes flow the other way
//! through a plain [`std::io::Read`] handle owned by a receive pump.
//!
//! - [`Transport`]: the capability consumed by the link layer
//! - [`StreamTransport`]: adapter for any `Write` stream (sockets, pipes, ptys)
//! - [`SerialPort`]: termios-backed tty device (unix only)

pub mod deadline;
pub mod error;
pub mod stream;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use deadline::Deadline;
pub use error::{Result, TransportError};
pub use stream::StreamTransport;
pub use traits::Transport;

#[cfg(unix)]
pub use serial::{SerialPort, SerialReader};
