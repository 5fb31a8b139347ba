//! 设备探测命令

use super::Context;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use thermocam_driver::{DiscoveryReport, discover};
use thermocam_serial::{SerialPortTransport, list_system_ports};

/// 探测命令参数
#[derive(Args, Debug)]
pub struct DiscoverCommand {
    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

/// JSON 输出格式
#[derive(Debug, Serialize)]
struct ReportJson<'a> {
    found: bool,
    port: Option<&'a str>,
    probed: Vec<ProbedJson<'a>>,
}

#[derive(Debug, Serialize)]
struct ProbedJson<'a> {
    index: u16,
    label: &'a str,
    response: &'a str,
}

impl<'a> From<&'a DiscoveryReport> for ReportJson<'a> {
    fn from(report: &'a DiscoveryReport) -> Self {
        Self {
            found: report.found,
            port: report.matched().map(|p| p.label.as_str()),
            probed: report
                .probed
                .iter()
                .map(|p| ProbedJson {
                    index: p.index,
                    label: &p.label,
                    response: &p.response,
                })
                .collect(),
        }
    }
}

impl DiscoverCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let builder = ctx.config.builder(None);
        let config = builder.discovery();
        let mut transport = SerialPortTransport::new(config.serial.clone());

        if !self.json {
            match list_system_ports() {
                Ok(ports) if !ports.is_empty() => println!("System ports: {}", ports.join(", ")),
                Ok(_) => println!("System ports: (none)"),
                Err(e) => tracing::warn!("Failed to list system ports: {}", e),
            }
            println!(
                "⏳ Probing ports {}..={}...",
                config.ports.start(),
                config.ports.end()
            );
        }

        let report = discover(&mut transport, config);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&ReportJson::from(&report))?);
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

fn print_report(report: &DiscoveryReport) {
    for port in &report.probed {
        let response = port.response.trim_end();
        let response = if response.is_empty() { "(no reply)" } else { response };
        println!("  [{:>3}] {:<16} {}", port.index, port.label, response);
    }
    match report.matched() {
        Some(port) => println!("✅ Thermal camera on {}", port.label),
        None => println!("❌ No thermal camera found ({} port(s) answered)", report.probed.len()),
    }
}
