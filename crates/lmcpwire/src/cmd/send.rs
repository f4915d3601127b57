use std::fs;

use lmcpwire_client::{ClientConfig, DeliveryClient};
use tracing::info;

use crate::cmd::{parse_timeout, SendArgs};
use crate::exit::{client_error, io_error, CliResult, SUCCESS};
use crate::output::{print_send_summary, OutputFormat, SendSummary};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let config = ClientConfig {
        endpoint: args.endpoint.clone(),
        connect_timeout: Some(parse_timeout(&args.connect_timeout)?),
        write_timeout: args.write_timeout.as_deref().map(parse_timeout).transpose()?,
        ..ClientConfig::default()
    };
    let payload = resolve_payload(&args)?;

    let mut client = DeliveryClient::new(config);
    let envelope_size = client
        .send_message(&args.name, &payload)
        .map_err(|err| client_error("send failed", err))?;
    client.disconnect();

    info!(
        endpoint = %args.endpoint,
        name = %args.name,
        bytes = envelope_size,
        "message delivered"
    );

    let endpoint = args.endpoint.to_string();
    print_send_summary(
        &SendSummary {
            endpoint: &endpoint,
            message_name: args.name.as_str(),
            payload_size: payload.len(),
            envelope_size,
        },
        format,
    );

    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}
