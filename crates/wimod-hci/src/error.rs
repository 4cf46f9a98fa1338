use std::fmt;
use std::time::Duration;

/// Why a response was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFault {
    /// The status byte was not OK.
    Status(u8),
    /// The payload was shorter than the message requires.
    TooShort { len: usize, min: usize },
}

impl fmt::Display for ResponseFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status {status:#04x}"),
            Self::TooShort { len, min } => write!(f, "payload length {len}, need {min}"),
        }
    }
}

/// Errors that can occur in HCI operations.
#[derive(Debug, thiserror::Error)]
pub enum HciError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] wimod_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] wimod_frame::FrameError),

    /// No matching response arrived in time.
    #[error("response timed out after {0:?}")]
    Timeout(Duration),

    /// A matching response arrived but could not be accepted.
    #[error("invalid response to message {msg_id:#04x}: {fault}")]
    InvalidResponse { msg_id: u8, fault: ResponseFault },
}

impl HciError {
    /// Normalize frame errors that only wrap a transport failure.
    pub(crate) fn from_send(err: wimod_frame::FrameError) -> Self {
        match err {
            wimod_frame::FrameError::Transport(err) => Self::Transport(err),
            other => Self::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, HciError>;
