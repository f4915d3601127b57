use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use lmcpwire_frame::MessageName;
use lmcpwire_transport::Endpoint;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame and deliver a single message.
    Send(SendArgs),
    /// Stream simulated air vehicle telemetry.
    Stream(StreamArgs),
    /// Accept connections and print received envelopes.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Stream(args) => stream::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Receiver address (host:port).
    #[arg(env = "LMCPWIRE_ENDPOINT", default_value = "127.0.0.1:5555")]
    pub endpoint: Endpoint,
    /// Fully qualified message name, e.g. afrl.cmasi.AirVehicleState.
    #[arg(long, short = 'n')]
    pub name: MessageName,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
    /// Per-write timeout; unbounded when omitted.
    #[arg(long)]
    pub write_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Receiver address (host:port).
    #[arg(env = "LMCPWIRE_ENDPOINT", default_value = "127.0.0.1:5555")]
    pub endpoint: Endpoint,
    /// Time between AirVehicleState messages.
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Pause after the AirVehicleConfiguration message.
    #[arg(long, default_value = "3s")]
    pub config_delay: String,
    /// Stop after N AirVehicleState messages.
    #[arg(long)]
    pub count: Option<u64>,
    /// Vehicle ID in every message.
    #[arg(long, default_value_t = 600)]
    pub vehicle_id: u64,
    /// Reverse direction of travel every N ticks.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub reverse_every: u32,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind (host:port).
    #[arg(env = "LMCPWIRE_ENDPOINT", default_value = "127.0.0.1:5555")]
    pub endpoint: Endpoint,
    /// Exit after receiving N envelopes.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms`, or a bare number of seconds. Zero is allowed.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Like [`parse_duration`], but zero is rejected.
pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let duration = parse_duration(input)?;
    if duration.is_zero() {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }
    Ok(duration)
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
