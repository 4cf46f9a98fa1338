//! Host-side link layer for WiMOD radio modules attached over a serial line.
//!
//! The host talks to the module with SLIP-framed, CRC-protected HCI messages.
//! Requests are matched to responses by endpoint and message id.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte transport abstraction (serial tty, generic streams)
//! - [`frame`]: SLIP framing, CRC trailer and the streaming receive assembler
//! - [`hci`]: Request/response engine, device management and device lifecycle

/// Re-export transport types.
pub mod transport {
    pub use wimod_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wimod_frame::*;
}

/// Re-export HCI types.
pub mod hci {
    pub use wimod_hci::*;
}
