use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use wimod_transport::{Transport, TransportError};

use crate::devmgmt::{self, DeviceInfo};
use crate::error::{HciError, Result};
use crate::link::HciLink;

/// Line and request settings used when probing a module.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Serial line speed.
    pub baud_rate: u32,
    /// Enable RTS/CTS hardware flow control.
    pub flow_control: bool,
    /// Deadline for each request, write included.
    pub timeout: Duration,
    /// Largest chunk handed to the link per read.
    pub read_chunk_size: usize,
    /// How long shutdown waits for the receive pump before detaching it.
    pub stop_timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            flow_control: false,
            timeout: Duration::from_secs(3),
            read_chunk_size: 256,
            stop_timeout: Duration::from_secs(1),
        }
    }
}

/// A probed radio module with a running receive pump.
///
/// The receive handle should return periodically (a read timeout, surfaced as
/// `TimedOut` or `WouldBlock`) so that the pump can observe shutdown. A pump
/// stuck in a read for longer than [`DeviceConfig::stop_timeout`] is detached
/// and finishes on its own once that read returns.
pub struct Device<T: Transport + 'static> {
    link: Arc<HciLink<T>>,
    info: DeviceInfo,
    config: DeviceConfig,
    pump: Option<ReceivePump>,
    closed: bool,
}

impl<T: Transport + 'static> Device<T> {
    /// Open and configure `transport`, start feeding bytes from `reader` into
    /// the link, and identify the module.
    ///
    /// On failure everything acquired so far is released before returning.
    pub fn probe<R>(mut transport: T, reader: R, config: DeviceConfig) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        info!(baud_rate = config.baud_rate, "probing");

        transport.open()?;
        if let Err(err) = transport.configure(config.baud_rate, config.flow_control) {
            error!(%err, "failed to configure transport");
            let _ = transport.close();
            return Err(err.into());
        }

        let link = Arc::new(HciLink::new(transport));
        let pump = match ReceivePump::spawn(Arc::clone(&link), reader, config.read_chunk_size) {
            Ok(pump) => pump,
            Err(err) => {
                let _ = link.with_transport(|transport| transport.close());
                return Err(HciError::Transport(TransportError::Io(err)));
            }
        };

        match devmgmt::get_device_info(&link, config.timeout) {
            Ok(info) => {
                info!(
                    module_type = format_args!("{:#04x}", info.module_type()),
                    device_address = format_args!("{:#010x}", info.device_address()),
                    "device probed"
                );
                Ok(Self {
                    link,
                    info,
                    config,
                    pump: Some(pump),
                    closed: false,
                })
            }
            Err(err) => {
                error!(%err, "failed to obtain device info");
                pump.stop(config.stop_timeout);
                let _ = link.with_transport(|transport| transport.close());
                Err(err)
            }
        }
    }

    /// Identification obtained while probing.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Settings the device was probed with.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// The underlying link, for requests beyond device management.
    pub fn link(&self) -> &Arc<HciLink<T>> {
        &self.link
    }

    /// Liveness probe using the configured timeout.
    pub fn ping(&self) -> Result<()> {
        devmgmt::ping(&self.link, self.config.timeout)
    }

    /// Query the identification block again.
    pub fn device_info(&self) -> Result<DeviceInfo> {
        devmgmt::get_device_info(&self.link, self.config.timeout)
    }

    /// Stop the receive pump and close the transport.
    pub fn remove(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(pump) = self.pump.take() {
            pump.stop(self.config.stop_timeout);
        }
        self.link.with_transport(|transport| transport.close())?;
        info!("removed");
        Ok(())
    }
}

impl<T: Transport + 'static> Drop for Device<T> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!(%err, "failed to close transport");
        }
    }
}

impl<T: Transport + 'static> std::fmt::Debug for Device<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("info", &self.info)
            .field("config", &self.config)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Background thread moving received bytes into the link.
struct ReceivePump {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    /// Disconnects when the thread exits. Wrapped so that `Device` stays `Sync`.
    exited: Mutex<mpsc::Receiver<()>>,
}

impl ReceivePump {
    fn spawn<T, R>(link: Arc<HciLink<T>>, reader: R, chunk_size: usize) -> std::io::Result<Self>
    where
        T: Transport + 'static,
        R: Read + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let (exit_tx, exited) = mpsc::channel();
        let handle = {
            let shutdown = Arc::clone(&shutdown);
            std::thread::Builder::new()
                .name("wimod-rx".to_string())
                .spawn(move || {
                    let _exit_tx: mpsc::Sender<()> = exit_tx;
                    run_pump(&link, reader, &shutdown, chunk_size.max(1));
                })?
        };
        Ok(Self {
            shutdown,
            handle,
            exited: Mutex::new(exited),
        })
    }

    /// Ask the pump to stop and join it, giving up after `timeout`.
    fn stop(self, timeout: Duration) {
        self.shutdown.store(true, Ordering::Release);
        let exited = self.exited.into_inner().unwrap_or_else(PoisonError::into_inner);
        match exited.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(?timeout, "receive pump still blocked in read, detaching");
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    error!("receive pump panicked");
                }
            }
        }
    }
}

fn run_pump<T: Transport, R: Read>(
    link: &HciLink<T>,
    mut reader: R,
    shutdown: &AtomicBool,
    chunk_size: usize,
) {
    let mut buf = vec![0u8; chunk_size];
    while !shutdown.load(Ordering::Acquire) {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("receive stream closed");
                break;
            }
            Ok(n) => {
                link.receive_buf(&buf[..n]);
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                continue;
            }
            Err(err) => {
                error!(%err, "receive failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_module_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert!(!config.flow_control);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.stop_timeout, Duration::from_secs(1));
    }
}
