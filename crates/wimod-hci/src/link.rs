use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, debug_span, error, trace, warn};
use wimod_frame::{decode_frame, AssemblerStats, FrameWriter, ReceiveAssembler};
use wimod_transport::{Deadline, Transport};

use crate::completion::Completion;
use crate::error::{HciError, ResponseFault, Result};
use crate::registry::{MatchKey, Registry};

/// Status byte of a successful response.
pub const STATUS_OK: u8 = 0x00;

/// One HCI connection: encode-and-write on the way out, reassemble and
/// dispatch on the way in.
///
/// The write path and the receive path each have their own lock, so any
/// number of requesters can wait concurrently while a single receive context
/// feeds bytes.
pub struct HciLink<T> {
    writer: Mutex<FrameWriter<T>>,
    assembler: Mutex<ReceiveAssembler>,
    registry: Registry,
}

impl<T: Transport> HciLink<T> {
    /// Create a link over an already-open transport.
    pub fn new(transport: T) -> Self {
        Self {
            writer: Mutex::new(FrameWriter::new(transport)),
            assembler: Mutex::new(ReceiveAssembler::new()),
            registry: Registry::new(),
        }
    }

    /// Waiters currently registered on this link.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run `f` with exclusive access to the transport.
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        f(writer.get_mut())
    }

    /// Consume the link and return the transport.
    pub fn into_transport(self) -> T {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_inner()
    }

    /// Encode and write one message without waiting for a reply.
    ///
    /// `timeout` covers waiting for the write lock as well as the write.
    pub fn send(&self, dst_id: u8, msg_id: u8, payload: &[u8], timeout: Duration) -> Result<()> {
        self.send_before(dst_id, msg_id, payload, Deadline::after(timeout), timeout)
    }

    fn send_before(
        &self,
        dst_id: u8,
        msg_id: u8,
        payload: &[u8],
        deadline: Deadline,
        timeout: Duration,
    ) -> Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let budget = deadline.remaining();
        if budget.is_zero() {
            debug!(dst_id, msg_id, "deadline passed while waiting to write");
            return Err(HciError::Timeout(timeout));
        }
        writer
            .send(dst_id, msg_id, payload, budget)
            .map_err(HciError::from_send)
    }

    /// Send a request and wait for the frame matching `(dst_id, rsp_msg_id)`.
    ///
    /// Returns the raw response payload. A single deadline bounds the wait for
    /// the write lock, the write itself and the wait for the response. The
    /// waiter is registered before the request is written and removed on
    /// every return path; a response that arrives after the deadline is
    /// dropped by the dispatcher.
    pub fn request(
        &self,
        dst_id: u8,
        req_msg_id: u8,
        payload: &[u8],
        rsp_msg_id: u8,
        timeout: Duration,
    ) -> Result<Bytes> {
        let deadline = Deadline::after(timeout);
        let _span = debug_span!("request", dst_id, req_msg_id, rsp_msg_id).entered();

        let completion = Arc::new(Completion::new());
        let _registration = self
            .registry
            .register(MatchKey::new(dst_id, rsp_msg_id), completion.clone());

        if let Err(err) = self.send_before(dst_id, req_msg_id, payload, deadline, timeout) {
            error!(%err, "send failed");
            return Err(err);
        }

        match completion.wait(deadline.remaining()) {
            Some(response) => {
                trace!(len = response.len(), "response received");
                Ok(response)
            }
            None => {
                warn!(?timeout, "response timeout");
                Err(HciError::Timeout(timeout))
            }
        }
    }

    /// Send a request and return the response payload after its status byte.
    ///
    /// A status other than [`STATUS_OK`], or an empty response, is an
    /// [`HciError::InvalidResponse`].
    pub fn send_and_wait(
        &self,
        dst_id: u8,
        req_msg_id: u8,
        payload: &[u8],
        rsp_msg_id: u8,
        timeout: Duration,
    ) -> Result<Bytes> {
        let response = self.request(dst_id, req_msg_id, payload, rsp_msg_id, timeout)?;
        check_status(rsp_msg_id, &response)?;
        Ok(response.slice(1..))
    }

    /// Feed bytes received from the transport.
    ///
    /// Each completed frame is validated and dispatched before this returns.
    /// Returns the number of bytes consumed, which is always `data.len()`.
    pub fn receive_buf(&self, data: &[u8]) -> usize {
        let mut assembler = self.assembler.lock().unwrap_or_else(PoisonError::into_inner);
        assembler.feed(data, |body| self.process_frame(body))
    }

    /// Validate one de-framed body and hand it to the first matching waiter.
    pub fn process_frame(&self, body: &[u8]) {
        let frame = match decode_frame(body) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(len = body.len(), %err, "discarding packet");
                return;
            }
        };

        debug!(
            dst_id = frame.dst_id,
            msg_id = frame.msg_id,
            len = frame.payload.len(),
            "processing incoming packet"
        );
        if !self.registry.dispatch(&frame) {
            debug!(
                dst_id = frame.dst_id,
                msg_id = frame.msg_id,
                "no waiter for packet"
            );
        }
    }

    /// Receive-side counters.
    pub fn assembler_stats(&self) -> AssemblerStats {
        self.assembler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats()
    }
}

impl<T> std::fmt::Debug for HciLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HciLink")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Check the leading status byte of a response payload.
pub(crate) fn check_status(msg_id: u8, response: &[u8]) -> Result<()> {
    let Some(&status) = response.first() else {
        return Err(HciError::InvalidResponse {
            msg_id,
            fault: ResponseFault::TooShort { len: 0, min: 1 },
        });
    };

    if status != STATUS_OK {
        warn!(msg_id, status, "device reported error status");
        return Err(HciError::InvalidResponse {
            msg_id,
            fault: ResponseFault::Status(status),
        });
    }
    Ok(())
}
