use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use wimod_hci::{Device, DeviceConfig};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod ping;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe a module and check that it answers a ping.
    Ping(PortArgs),
    /// Probe a module and print its identification.
    Info(PortArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ping(args) => ping::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct PortArgs {
    /// Serial device the module is attached to (e.g. /dev/ttyUSB0).
    pub port: PathBuf,
    /// Line speed.
    #[arg(long, default_value = "115200", env = "WIMOD_BAUD")]
    pub baud: u32,
    /// Enable RTS/CTS hardware flow control.
    #[arg(long)]
    pub flow_control: bool,
    /// Per-request timeout (e.g. 3s, 500ms).
    #[arg(long, default_value = "3s")]
    pub timeout: String,
}

impl PortArgs {
    pub fn device_config(&self) -> CliResult<DeviceConfig> {
        Ok(DeviceConfig {
            baud_rate: self.baud,
            flow_control: self.flow_control,
            timeout: parse_duration(&self.timeout)?,
            ..DeviceConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[cfg(unix)]
pub type PortDevice = Device<wimod_transport::SerialPort>;

/// Open the serial port named by `args` and probe the module behind it.
#[cfg(unix)]
pub fn probe(args: &PortArgs) -> CliResult<PortDevice> {
    use wimod_transport::{SerialPort, Transport};

    let config = args.device_config()?;
    let mut port = SerialPort::new(&args.port);
    port.open()
        .map_err(|err| crate::exit::transport_error("open failed", err))?;
    let reader = port
        .reader()
        .map_err(|err| crate::exit::transport_error("open failed", err))?;

    Device::probe(port, reader, config)
        .map_err(|err| crate::exit::hci_error("probe failed", err))
}

#[cfg(not(unix))]
pub type PortDevice = Device<wimod_transport::StreamTransport<std::io::Sink>>;

#[cfg(not(unix))]
pub fn probe(_args: &PortArgs) -> CliResult<PortDevice> {
    Err(CliError::new(
        crate::exit::TRANSPORT_ERROR,
        "serial ports are only supported on unix",
    ))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
