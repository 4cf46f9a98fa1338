//! CRC-CCITT frame check sequence.
//!
//! The trailer is the X.25 / HDLC flavour of CRC-CCITT: reflected polynomial
//! 0x1021, initial value 0xFFFF, result inverted, sent little-endian. Running
//! the same CRC over a body together with its correct trailer always yields
//! [`GOOD_RESIDUE`].

use crc::{Crc, CRC_16_IBM_SDLC};

const HCI_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Checksum of an undamaged body including its own trailer.
pub const GOOD_RESIDUE: u16 = 0x0F47;

/// Compute the trailer value for a frame header and payload.
pub fn compute(dst_id: u8, msg_id: u8, payload: &[u8]) -> u16 {
    let mut digest = HCI_CRC.digest();
    digest.update(&[dst_id, msg_id]);
    digest.update(payload);
    digest.finalize()
}

/// Checksum of a full received body, trailer included.
pub fn residue(body: &[u8]) -> u16 {
    HCI_CRC.checksum(body)
}

/// Whether a full received body carries a valid trailer.
pub fn verify(body: &[u8]) -> bool {
    residue(body) == GOOD_RESIDUE
}
