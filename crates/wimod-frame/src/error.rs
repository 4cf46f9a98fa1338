use wimod_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A received body is shorter than header plus checksum.
    #[error("malformed frame: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    /// A received body failed checksum verification.
    #[error("malformed frame: checksum residue {residue:#06x}")]
    BadChecksum { residue: u16 },

    /// Writing the encoded frame failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error occurred while reading frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether this error describes a damaged inbound frame.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::TooShort { .. } | Self::BadChecksum { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
