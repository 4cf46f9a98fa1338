//! Request/response dispatch and device management for WiMOD HCI links.
//!
//! [`HciLink`] is the per-connection engine: it writes requests through a
//! [`Transport`](wimod_transport::Transport), reassembles whatever bytes the
//! receive side hands it, and routes each valid inbound frame to the first
//! waiter registered for its `(dst_id, msg_id)` pair.
//!
//! [`Device`] wraps a link with the open / configure / probe / remove
//! lifecycle of a physical module.

pub mod completion;
pub mod device;
pub mod devmgmt;
pub mod error;
pub mod link;
pub mod registry;

pub use completion::Completion;
pub use device::{Device, DeviceConfig};
pub use devmgmt::{
    get_device_info, ping, DeviceInfo, DEVMGMT_ID, DEVMGMT_MSG_GET_DEVICE_INFO_REQ,
    DEVMGMT_MSG_GET_DEVICE_INFO_RSP, DEVMGMT_MSG_PING_REQ, DEVMGMT_MSG_PING_RSP,
};
pub use error::{HciError, ResponseFault, Result};
pub use link::{HciLink, STATUS_OK};
pub use registry::{Dispatchee, MatchKey, Registration, Registry};
