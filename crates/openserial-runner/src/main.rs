//! openserial-sim: a simulated mote whose serial transport is reachable over TCP.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use openserial_runner::{spawn_mote, HostLink, RunnerConfig, RunnerError, UartBridge};
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Simulated mote exposing its serial transport over TCP.
#[derive(Parser, Debug)]
#[command(name = "openserial-sim", version, about)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TCP port for the UART.
    #[arg(short, long)]
    port: Option<u16>,

    /// 16-bit short address (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_device_id)]
    device_id: Option<u16>,

    /// UART baud rate, 0 for unpaced.
    #[arg(long)]
    baud: Option<u32>,

    /// Debug status period in milliseconds, 0 to disable.
    #[arg(long)]
    debug_period_ms: Option<u64>,
}

fn parse_device_id(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid device id '{}': {}", s, e))
}

impl Cli {
    fn load_config(&self) -> Result<RunnerConfig, RunnerError> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::load(path)?,
            None => RunnerConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(device_id) = self.device_id {
            config.device_id = device_id;
        }
        if let Some(baud) = self.baud {
            config.baud = baud;
        }
        if let Some(period) = self.debug_period_ms {
            config.debug_period_ms = period;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("openserial-sim: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RunnerError> {
    let config = cli.load_config()?;
    openserial_metrics::describe_metrics();

    let (link, host) = HostLink::new_pair();
    let mote = spawn_mote(&config, link)?;
    let bridge = UartBridge::new(host, mote.events().clone());

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    let stop = Arc::new(Notify::new());
    let on_signal = stop.clone();
    ctrlc::set_handler(move || on_signal.notify_one())?;

    info!(
        "Mote[{:04x}]: UART on port {} at {} baud",
        config.device_id, config.port, config.baud
    );

    let served = runtime.block_on(async {
        tokio::select! {
            result = bridge.serve(config.port) => result,
            _ = stop.notified() => {
                info!("Interrupted, shutting down");
                Ok(())
            }
        }
    });

    mote.shutdown()?;
    served
}
