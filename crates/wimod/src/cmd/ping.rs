use std::time::Instant;

use crate::cmd::PortArgs;
use crate::exit::{hci_error, CliResult, SUCCESS};
use crate::output::{print_ping, OutputFormat, PingOutput};

pub fn run(args: PortArgs, format: OutputFormat) -> CliResult<i32> {
    let device = super::probe(&args)?;

    let start = Instant::now();
    device.ping().map_err(|err| hci_error("ping failed", err))?;
    let rtt = start.elapsed();

    device
        .remove()
        .map_err(|err| hci_error("close failed", err))?;

    let out = PingOutput {
        port: args.port.display().to_string(),
        alive: true,
        rtt_ms: (rtt.as_secs_f64() * 1000.0 * 100.0).round() / 100.0,
    };
    print_ping(&out, format);
    Ok(SUCCESS)
}
