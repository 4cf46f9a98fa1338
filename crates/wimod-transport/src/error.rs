use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device at the specified path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The write did not complete before its deadline.
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    /// The requested baud rate has no termios equivalent.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    /// The transport has not been opened, or was closed.
    #[error("transport not open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, TransportError>;
