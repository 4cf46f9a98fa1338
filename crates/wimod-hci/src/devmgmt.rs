//! Device management service: liveness probe and device identification.

use std::time::Duration;

use tracing::debug;
use wimod_transport::Transport;

use crate::error::{HciError, ResponseFault, Result};
use crate::link::HciLink;

/// Service access point of the device management service.
pub const DEVMGMT_ID: u8 = 0x01;

pub const DEVMGMT_MSG_PING_REQ: u8 = 0x01;
pub const DEVMGMT_MSG_PING_RSP: u8 = 0x02;
pub const DEVMGMT_MSG_GET_DEVICE_INFO_REQ: u8 = 0x03;
pub const DEVMGMT_MSG_GET_DEVICE_INFO_RSP: u8 = 0x04;

/// Bytes of device information following the status byte.
pub const DEVICE_INFO_LEN: usize = 9;

/// Identification block returned by a device-info query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    raw: [u8; DEVICE_INFO_LEN],
}

impl DeviceInfo {
    /// Wrap the info bytes exactly as received.
    pub fn from_bytes(raw: [u8; DEVICE_INFO_LEN]) -> Self {
        Self { raw }
    }

    /// The info bytes exactly as received.
    pub fn as_bytes(&self) -> &[u8; DEVICE_INFO_LEN] {
        &self.raw
    }

    /// Radio module type code.
    pub fn module_type(&self) -> u8 {
        self.raw[0]
    }

    /// Device address, little-endian on the wire.
    pub fn device_address(&self) -> u32 {
        u32::from_le_bytes([self.raw[1], self.raw[2], self.raw[3], self.raw[4]])
    }

    /// Device id, little-endian on the wire.
    pub fn device_id(&self) -> u32 {
        u32::from_le_bytes([self.raw[5], self.raw[6], self.raw[7], self.raw[8]])
    }
}

/// Check that the module answers at all.
pub fn ping<T: Transport>(link: &HciLink<T>, timeout: Duration) -> Result<()> {
    link.send_and_wait(
        DEVMGMT_ID,
        DEVMGMT_MSG_PING_REQ,
        &[],
        DEVMGMT_MSG_PING_RSP,
        timeout,
    )?;
    debug!("ping answered");
    Ok(())
}

/// Query the module's identification block.
pub fn get_device_info<T: Transport>(link: &HciLink<T>, timeout: Duration) -> Result<DeviceInfo> {
    let info = link.send_and_wait(
        DEVMGMT_ID,
        DEVMGMT_MSG_GET_DEVICE_INFO_REQ,
        &[],
        DEVMGMT_MSG_GET_DEVICE_INFO_RSP,
        timeout,
    )?;

    let raw: [u8; DEVICE_INFO_LEN] = info
        .get(..DEVICE_INFO_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(HciError::InvalidResponse {
            msg_id: DEVMGMT_MSG_GET_DEVICE_INFO_RSP,
            fault: ResponseFault::TooShort {
                len: info.len() + 1,
                min: DEVICE_INFO_LEN + 1,
            },
        })?;

    Ok(DeviceInfo::from_bytes(raw))
}
