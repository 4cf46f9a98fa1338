use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::deadline::Deadline;
use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Inter-read timeout in deciseconds (`VTIME`). Keeps receive pumps responsive
/// to shutdown without busy-waiting.
const READ_TIMEOUT_DECISECONDS: libc::cc_t = 1;

/// A tty-attached serial device.
///
/// Opening does not reconfigure the line; call [`Transport::configure`]
/// afterwards to switch it to raw mode at the wanted speed.
pub struct SerialPort {
    path: PathBuf,
    file: Option<File>,
}

impl SerialPort {
    /// Line speeds accepted by [`Transport::configure`].
    pub const SUPPORTED_BAUD_RATES: [u32; 7] =
        [4_800, 9_600, 19_200, 38_400, 57_600, 115_200, 230_400];

    /// Create a closed port handle for a device path such as `/dev/ttyUSB0`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    /// Device path this port was created with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the device is currently open.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Clone the open descriptor into a read handle for a receive pump.
    pub fn reader(&self) -> Result<SerialReader> {
        let file = self.file.as_ref().ok_or(TransportError::NotOpen)?;
        Ok(SerialReader {
            file: file.try_clone()?,
        })
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(TransportError::NotOpen)
    }

    fn wait_writable(&self, fd: libc::c_int, remaining: Duration) -> Result<bool> {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLOUT,
            revents: 0,
        };
        let millis = remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `pfd` is a valid, writable pollfd and we pass a count of exactly one.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(TransportError::Io(err));
        }
        Ok(rc > 0)
    }
}

impl Transport for SerialPort {
    fn open(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&self.path)
            .map_err(|source| TransportError::Open {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), "serial port opened");
        self.file = Some(file);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            drop(file);
            debug!(path = %self.path.display(), "serial port closed");
        }
        Ok(())
    }

    fn configure(&mut self, baud_rate: u32, flow_control: bool) -> Result<()> {
        let speed = baud_to_speed(baud_rate)?;
        let fd = self.file()?.as_raw_fd();

        // SAFETY: termios is a plain C struct; an all-zero value is a valid
        // placeholder that tcgetattr overwrites before use.
        let mut tio: libc::termios = unsafe { std::mem::zeroed() };

        // SAFETY: `fd` is an open descriptor owned by `self.file` and `tio` is a
        // valid, writable termios for the duration of these calls.
        unsafe {
            if libc::tcgetattr(fd, &mut tio) != 0 {
                return Err(std::io::Error::last_os_error().into());
            }
            libc::cfmakeraw(&mut tio);
            if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0
            {
                return Err(std::io::Error::last_os_error().into());
            }
        }

        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        if flow_control {
            tio.c_cflag |= libc::CRTSCTS;
        } else {
            tio.c_cflag &= !libc::CRTSCTS;
        }
        tio.c_cc[libc::VMIN] = 0;
        tio.c_cc[libc::VTIME] = READ_TIMEOUT_DECISECONDS;

        // SAFETY: same descriptor and termios as above; TCSANOW applies immediately.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        info!(path = %self.path.display(), baud_rate, flow_control, "serial line configured");
        Ok(())
    }

    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<()> {
        let deadline = Deadline::after(timeout);
        let fd = self.file()?.as_raw_fd();

        let mut offset = 0usize;
        while offset < buf.len() {
            if deadline.is_expired() {
                return Err(TransportError::Timeout(timeout));
            }
            if !self.wait_writable(fd, deadline.remaining())? {
                continue;
            }

            let mut file = self.file()?;
            match file.write(&buf[offset..]) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .finish()
    }
}

/// Read half of a [`SerialPort`].
///
/// The line is configured with a short inter-read timeout, so an idle line
/// yields empty reads; these surface as [`ErrorKind::TimedOut`] rather than a
/// zero-length read that callers would take for end-of-stream.
#[derive(Debug)]
pub struct SerialReader {
    file: File,
}

impl Read for SerialReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.file.read(buf)? {
            0 => Err(std::io::Error::from(ErrorKind::TimedOut)),
            n => Ok(n),
        }
    }
}

fn baud_to_speed(baud_rate: u32) -> Result<libc::speed_t> {
    let speed = match baud_rate {
        4_800 => libc::B4800,
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_supported_baud_rates() {
        for baud in SerialPort::SUPPORTED_BAUD_RATES {
            assert!(baud_to_speed(baud).is_ok(), "{baud} should be supported");
        }
        assert_eq!(baud_to_speed(115_200).unwrap(), libc::B115200);
    }

    #[test]
    fn rejects_unsupported_baud_rate() {
        let err = baud_to_speed(123_456).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaudRate(123_456)));
    }

    #[test]
    fn operations_on_closed_port_fail() {
        let mut port = SerialPort::new("/dev/null-wimod-missing");
        assert!(!port.is_open());
        assert!(matches!(port.reader(), Err(TransportError::NotOpen)));
        assert!(matches!(
            port.configure(115_200, false),
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(
            port.write(b"x", Duration::from_millis(10)),
            Err(TransportError::NotOpen)
        ));
        port.close().unwrap();
    }

    #[test]
    fn open_missing_device_reports_path() {
        let mut port = SerialPort::new("/nonexistent/wimod-tty");
        let err = port.open().unwrap_err();
        match err {
            TransportError::Open { path, source } => {
                assert_eq!(path, PathBuf::from("/nonexistent/wimod-tty"));
                assert_eq!(source.kind(), ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn configure_rejects_non_tty() {
        let mut port = SerialPort::new("/dev/null");
        port.open().unwrap();
        assert!(port.configure(115_200, false).is_err());
        port.close().unwrap();
        assert!(!port.is_open());
    }
}
