use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use wimod_hci::DeviceInfo;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct DeviceInfoOutput {
    pub port: String,
    pub module_type: u8,
    pub device_address: String,
    pub device_id: String,
    pub raw: String,
}

impl DeviceInfoOutput {
    pub fn new(port: &str, info: &DeviceInfo) -> Self {
        Self {
            port: port.to_string(),
            module_type: info.module_type(),
            device_address: format!("{:08X}", info.device_address()),
            device_id: format!("{:08X}", info.device_id()),
            raw: hex(info.as_bytes()),
        }
    }
}

#[derive(Serialize)]
pub struct PingOutput {
    pub port: String,
    pub alive: bool,
    pub rtt_ms: f64,
}

pub fn print_device_info(out: &DeviceInfoOutput, info: &DeviceInfo, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "MODULE TYPE", "ADDRESS", "DEVICE ID", "RAW"])
                .add_row(vec![
                    out.port.clone(),
                    format!("{:#04x}", out.module_type),
                    out.device_address.clone(),
                    out.device_id.clone(),
                    out.raw.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Device Info:");
            println!("  Port:             {}", out.port);
            println!("  Module type:      {:#04x}", out.module_type);
            println!("  Device address:   {}", out.device_address);
            println!("  Device id:        {}", out.device_id);
            println!("  Raw:              {}", out.raw);
        }
        OutputFormat::Raw => print_raw(info.as_bytes()),
    }
}

pub fn print_ping(out: &PingOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "ALIVE", "RTT"])
                .add_row(vec![
                    out.port.clone(),
                    out.alive.to_string(),
                    format!("{:.2}ms", out.rtt_ms),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} alive, rtt={:.2}ms", out.port, out.rtt_ms);
        }
        OutputFormat::Raw => println!("{:.2}", out.rtt_ms),
    }
}

fn print_json<T: Serialize>(out: &T) {
    println!(
        "{}",
        serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02X}")).collect::<Vec<_>>().join(" ")
}
