#![allow(dead_code)]

use std::os::unix::net::UnixStream;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wimod_frame::{Frame, FrameError, FrameReader, FrameWriter};
use wimod_hci::{Device, DeviceConfig};
use wimod_transport::{StreamTransport, Transport};

pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

pub type HostTransport = StreamTransport<UnixStream>;

/// How the simulated module reacts to one request.
pub enum Reply {
    /// Send a well-formed frame.
    Frame(u8, u8, Vec<u8>),
    /// Write raw bytes as-is.
    Raw(Vec<u8>),
    /// Stay silent.
    Ignore,
}

/// Radio module stand-in on the far end of a socket pair.
///
/// Runs until the host closes its end and returns every request it saw.
pub struct SimulatedModule {
    handle: JoinHandle<Vec<Frame>>,
}

impl SimulatedModule {
    pub fn spawn<F>(stream: UnixStream, mut answer: F) -> Self
    where
        F: FnMut(&Frame) -> Reply + Send + 'static,
    {
        let handle = thread::spawn(move || {
            let mut reader =
                FrameReader::new(stream.try_clone().expect("module stream should clone"));
            let mut writer = FrameWriter::new(StreamTransport::new(stream));
            let mut seen = Vec::new();

            loop {
                let frame = match reader.read_frame() {
                    Ok(frame) => frame,
                    Err(FrameError::ConnectionClosed) => break,
                    Err(err) => panic!("module read failed: {err}"),
                };
                match answer(&frame) {
                    Reply::Frame(dst_id, msg_id, payload) => writer
                        .send(dst_id, msg_id, &payload, WRITE_TIMEOUT)
                        .expect("module reply should be written"),
                    Reply::Raw(bytes) => writer
                        .get_mut()
                        .write(&bytes, WRITE_TIMEOUT)
                        .expect("module raw reply should be written"),
                    Reply::Ignore => {}
                }
                seen.push(frame);
            }
            seen
        });
        Self { handle }
    }

    /// Wait for the host to hang up and return the requests received.
    pub fn join(self) -> Vec<Frame> {
        self.handle.join().expect("module thread should not panic")
    }
}

/// Socket pair wired as (host transport, host receive handle, module end).
pub fn host_and_module() -> (HostTransport, UnixStream, UnixStream) {
    let (host, module) = UnixStream::pair().expect("socket pair should be creatable");
    host.set_read_timeout(Some(Duration::from_millis(20)))
        .expect("read timeout should apply");
    let rx = host.try_clone().expect("host stream should clone");
    (StreamTransport::new(host), rx, module)
}

/// Answer device-info queries with `info` and pings with OK.
pub fn healthy_module(info: [u8; 9]) -> impl FnMut(&Frame) -> Reply + Send + 'static {
    move |frame| match (frame.dst_id, frame.msg_id) {
        (0x01, 0x01) => Reply::Frame(0x01, 0x02, vec![0x00]),
        (0x01, 0x03) => {
            let mut payload = vec![0x00];
            payload.extend_from_slice(&info);
            Reply::Frame(0x01, 0x04, payload)
        }
        _ => Reply::Ignore,
    }
}

pub fn quick_config() -> DeviceConfig {
    DeviceConfig {
        timeout: Duration::from_millis(500),
        ..DeviceConfig::default()
    }
}

pub fn probe_healthy(info: [u8; 9]) -> (Device<HostTransport>, SimulatedModule) {
    let (transport, rx, module_end) = host_and_module();
    let module = SimulatedModule::spawn(module_end, healthy_module(info));
    let device = Device::probe(transport, rx, quick_config()).expect("probe should succeed");
    (device, module)
}
