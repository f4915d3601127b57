use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lmcpwire_client::{ClientConfig, DeliveryClient, PeriodicSender, SenderConfig};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, parse_timeout, StreamArgs};
use crate::exit::{CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS};
use crate::output::{print_stream_report, OutputFormat};
use crate::telemetry::{SimulationConfig, VehicleSimulator};

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let config_delay = parse_duration(&args.config_delay)?;
    let connect_timeout = parse_timeout(&args.connect_timeout)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut client = DeliveryClient::new(ClientConfig {
        endpoint: args.endpoint.clone(),
        connect_timeout: Some(connect_timeout),
        ..ClientConfig::default()
    });
    let simulator = VehicleSimulator::new(SimulationConfig {
        vehicle_id: args.vehicle_id,
        reverse_every: args.reverse_every,
        ..SimulationConfig::default()
    });

    let configuration = simulator
        .configuration_message()
        .map_err(|err| CliError::new(DATA_INVALID, err.to_string()))?;
    // A missed configuration is not fatal; the receiver may come up later.
    match client.send_message(&configuration.name, &configuration.payload) {
        Ok(bytes) => info!(name = %configuration.name, bytes, "configuration sent"),
        Err(err) => warn!(name = %configuration.name, error = %err, "configuration not delivered"),
    }

    sleep_while_running(config_delay, &running);

    let sender_config = SenderConfig {
        interval,
        max_ticks: args.count,
    };
    let report = PeriodicSender::new(&mut client, simulator, sender_config).run(&running);

    let endpoint = args.endpoint.to_string();
    print_stream_report(&endpoint, &report, &client.stats(), format);

    if report.ticks > 0 && report.sent == 0 {
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}

fn sleep_while_running(duration: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(Duration::from_millis(100)));
    }
}
