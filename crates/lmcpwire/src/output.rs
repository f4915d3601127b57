use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lmcpwire_client::{ClientStats, SenderReport};
use lmcpwire_frame::Envelope;
use serde::Serialize;

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
struct EnvelopeOutput<'a> {
    message_name: &'a str,
    format: &'a str,
    entity_id: u64,
    service_id: u64,
    declared_length: usize,
    checksum: u32,
    payload_size: usize,
    payload: String,
    peer: &'a str,
    timestamp: String,
}

pub fn print_envelope(envelope: &Envelope, peer: &str, format: OutputFormat) {
    let name = envelope.name.as_str();
    match format {
        OutputFormat::Json => {
            let out = EnvelopeOutput {
                message_name: name,
                format: &envelope.attributes.format,
                entity_id: envelope.attributes.entity_id,
                service_id: envelope.attributes.service_id,
                declared_length: envelope.declared_length(),
                checksum: envelope.checksum,
                payload_size: envelope.payload.len(),
                payload: payload_preview(&envelope.payload),
                peer,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["MESSAGE", "SIZE", "CHECKSUM", "PEER", "PAYLOAD"]);
            table.add_row(vec![
                name.to_string(),
                envelope.payload.len().to_string(),
                envelope.checksum.to_string(),
                peer.to_string(),
                payload_preview(&envelope.payload),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "message={} size={} checksum={} peer={} payload={}",
                name,
                envelope.payload.len(),
                envelope.checksum,
                peer,
                payload_preview(&envelope.payload)
            );
        }
        OutputFormat::Raw => print_raw(&envelope.payload),
    }
}

#[derive(Serialize)]
pub struct SendSummary<'a> {
    pub endpoint: &'a str,
    pub message_name: &'a str,
    pub payload_size: usize,
    pub envelope_size: usize,
}

pub fn print_send_summary(summary: &SendSummary<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ENDPOINT", "MESSAGE", "PAYLOAD", "ENVELOPE"]);
            table.add_row(vec![
                summary.endpoint.to_string(),
                summary.message_name.to_string(),
                summary.payload_size.to_string(),
                summary.envelope_size.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent {} ({} bytes, payload {}) to {}",
                summary.message_name, summary.envelope_size, summary.payload_size, summary.endpoint
            );
        }
        OutputFormat::Raw => println!("{}", summary.envelope_size),
    }
}

#[derive(Serialize)]
struct StreamOutput<'a> {
    endpoint: &'a str,
    ticks: u64,
    sent: u64,
    bytes_sent: u64,
    source_failures: u64,
    send_failures: u64,
    connect_attempts: u64,
    connects: u64,
}

pub fn print_stream_report(
    endpoint: &str,
    report: &SenderReport,
    stats: &ClientStats,
    format: OutputFormat,
) {
    let out = StreamOutput {
        endpoint,
        ticks: report.ticks,
        sent: report.sent,
        bytes_sent: report.bytes_sent,
        source_failures: report.source_failures,
        send_failures: report.send_failures,
        connect_attempts: stats.connect_attempts,
        connects: stats.connects,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (field, value) in [
                ("ticks", out.ticks),
                ("sent", out.sent),
                ("bytes_sent", out.bytes_sent),
                ("source_failures", out.source_failures),
                ("send_failures", out.send_failures),
                ("connect_attempts", out.connect_attempts),
                ("connects", out.connects),
            ] {
                table.add_row(vec![field.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "endpoint={} ticks={} sent={} bytes={} send_failures={} source_failures={} connects={}/{}",
                out.endpoint,
                out.ticks,
                out.sent,
                out.bytes_sent,
                out.send_failures,
                out.source_failures,
                out.connects,
                out.connect_attempts
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
