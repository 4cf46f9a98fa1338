//! SLIP framing, checksums and stream reassembly for the WiMOD HCI protocol.
//!
//! Every message on the wire is a SLIP-delimited body of the form:
//! - 1-byte destination (service access point) id
//! - 1-byte message id
//! - 0..=300 payload bytes
//! - 2-byte little-endian CRC-CCITT trailer
//!
//! Input arrives in arbitrary chunks; [`ReceiveAssembler`] turns any
//! fragmentation of the byte stream back into complete frame bodies.

pub mod assembler;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod reader;
pub mod slip;
pub mod writer;

pub use assembler::{AssemblerState, AssemblerStats, ReceiveAssembler};
pub use codec::{
    decode_frame, encode_frame, Frame, CHECKSUM_SIZE, HEADER_SIZE, MAX_PACKET_SIZE, MAX_PAYLOAD,
    MIN_FRAME_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
