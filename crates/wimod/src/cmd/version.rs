use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use wimod_frame::{MAX_PACKET_SIZE, MAX_PAYLOAD};
use wimod_hci::DeviceConfig;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    profile: &'static str,
    git_hash: &'static str,
    serial: &'static str,
    baud_rates: Vec<u32>,
    default_baud: u32,
    max_payload: usize,
    max_packet_size: usize,
}

impl VersionOutput {
    fn collect() -> Self {
        Self {
            name: "wimod",
            version: env!("CARGO_PKG_VERSION"),
            target: option_env!("WIMOD_BUILD_TARGET").unwrap_or("unknown"),
            profile: option_env!("WIMOD_BUILD_PROFILE").unwrap_or("unknown"),
            git_hash: option_env!("WIMOD_GIT_HASH").unwrap_or("unknown"),
            serial: if cfg!(unix) { "termios" } else { "unsupported" },
            baud_rates: baud_rates(),
            default_baud: DeviceConfig::default().baud_rate,
            max_payload: MAX_PAYLOAD,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let rates = self
            .baud_rates
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            ("name", self.name.to_string()),
            ("version", self.version.to_string()),
            ("target", self.target.to_string()),
            ("profile", self.profile.to_string()),
            ("git_hash", self.git_hash.to_string()),
            ("serial", self.serial.to_string()),
            ("baud_rates", rates),
            ("default_baud", self.default_baud.to_string()),
            ("max_payload", self.max_payload.to_string()),
            ("max_packet_size", self.max_packet_size.to_string()),
        ]
    }
}

#[cfg(unix)]
fn baud_rates() -> Vec<u32> {
    wimod_transport::SerialPort::SUPPORTED_BAUD_RATES.to_vec()
}

#[cfg(not(unix))]
fn baud_rates() -> Vec<u32> {
    Vec::new()
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("wimod {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let out = VersionOutput::collect();
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            for (key, value) in out.rows() {
                table.add_row(vec![key.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (key, value) in out.rows() {
                println!("{key}: {value}");
            }
        }
    }
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_link_limits() {
        let out = VersionOutput::collect();
        assert_eq!(out.max_payload, 300);
        assert_eq!(out.max_packet_size, 610);
        assert_eq!(out.default_baud, 115_200);
        assert_eq!(out.rows().len(), 10);
    }

    #[cfg(unix)]
    #[test]
    fn lists_supported_baud_rates() {
        let out = VersionOutput::collect();
        assert!(out.baud_rates.contains(&115_200));
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&out).unwrap()).unwrap();
        assert_eq!(json["serial"], "termios");
    }
}
