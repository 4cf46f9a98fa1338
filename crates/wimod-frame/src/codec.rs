use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum;
use crate::error::{FrameError, Result};
use crate::slip;

/// Destination id + message id.
pub const HEADER_SIZE: usize = 2;

/// CRC-CCITT trailer.
pub const CHECKSUM_SIZE: usize = 2;

/// Smallest valid body: header and trailer with an empty payload.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Maximum payload carried by a single frame.
pub const MAX_PAYLOAD: usize = 300;

/// Largest body before escaping.
pub const MAX_BODY_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD + CHECKSUM_SIZE;

/// Largest frame on the wire: both delimiters around a fully escaped body.
pub const MAX_PACKET_SIZE: usize = slip::max_encoded_len(MAX_BODY_SIZE);

/// A decoded HCI message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Service access point the message is addressed to or comes from.
    pub dst_id: u8,
    /// Message identifier within that service.
    pub msg_id: u8,
    /// Message payload, header and trailer excluded.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(dst_id: u8, msg_id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            dst_id,
            msg_id,
            payload: payload.into(),
        }
    }

    /// The `(dst_id, msg_id)` pair used for routing.
    pub fn key(&self) -> (u8, u8) {
        (self.dst_id, self.msg_id)
    }

    /// Size of the unescaped body (header + payload + trailer).
    pub fn body_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE
    }
}

/// Append the unescaped body (header, payload, little-endian checksum) to `dst`.
pub fn encode_body(dst_id: u8, msg_id: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    check_payload_len(payload.len())?;
    let crc = checksum::compute(dst_id, msg_id, payload);

    dst.reserve(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    dst.put_u8(dst_id);
    dst.put_u8(msg_id);
    dst.put_slice(payload);
    dst.put_u16_le(crc);
    Ok(())
}

/// Encode a complete frame into its wire form and append it to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────┬────────┬────────┬───────────────┬──────────────┬──────┐
/// │ 0xC0 │ dst id │ msg id │ payload       │ CRC (2B LE)  │ 0xC0 │
/// │      │ (1B)   │ (1B)   │ (0..300B)     │              │      │
/// └──────┴────────┴────────┴───────────────┴──────────────┴──────┘
///          └──────────────── SLIP-escaped ───────────────┘
/// ```
pub fn encode_frame(dst_id: u8, msg_id: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let mut body = BytesMut::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    encode_body(dst_id, msg_id, payload, &mut body)?;
    slip::encode(&body, dst);
    Ok(())
}

/// Validate a de-framed body and split it into a [`Frame`].
///
/// `body` is the unescaped content between two delimiters, trailer included.
pub fn decode_frame(body: &[u8]) -> Result<Frame> {
    if body.len() < MIN_FRAME_SIZE {
        return Err(FrameError::TooShort {
            len: body.len(),
            min: MIN_FRAME_SIZE,
        });
    }

    let residue = checksum::residue(body);
    if residue != checksum::GOOD_RESIDUE {
        return Err(FrameError::BadChecksum { residue });
    }

    let payload = &body[HEADER_SIZE..body.len() - CHECKSUM_SIZE];
    check_payload_len(payload.len())?;

    Ok(Frame {
        dst_id: body[0],
        msg_id: body[1],
        payload: Bytes::copy_from_slice(payload),
    })
}

fn check_payload_len(len: usize) -> Result<()> {
    if len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_PAYLOAD,
        });
    }
    Ok(())
}
