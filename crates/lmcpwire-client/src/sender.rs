//! Fixed-interval sending loop.
//!
//! A [`PeriodicSender`] asks its [`MessageSource`] for one message per tick
//! and hands it to a [`DeliveryClient`]. Failures never end the loop: a source
//! error skips the tick, a send error is left to the client's reconnect on the
//! next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use lmcpwire_frame::MessageName;
use lmcpwire_transport::Connector;
use tracing::{debug, info, warn};

use crate::client::DeliveryClient;

/// Longest single sleep between checks of the running flag.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// One serialized message ready to be framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub name: MessageName,
    pub payload: Bytes,
}

impl OutgoingMessage {
    pub fn new(name: MessageName, payload: impl Into<Bytes>) -> Self {
        Self {
            name,
            payload: payload.into(),
        }
    }
}

/// A message source could not produce its next message.
#[derive(Debug, thiserror::Error)]
#[error("failed to produce {name}: {reason}")]
pub struct SourceError {
    pub name: String,
    pub reason: String,
}

impl SourceError {
    pub fn new(name: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Produces the message to send on each tick.
pub trait MessageSource {
    fn next_message(&mut self) -> Result<OutgoingMessage, SourceError>;
}

impl<F> MessageSource for F
where
    F: FnMut() -> Result<OutgoingMessage, SourceError>,
{
    fn next_message(&mut self) -> Result<OutgoingMessage, SourceError> {
        self()
    }
}

#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Time between tick starts. Default: 1 second.
    pub interval: Duration,
    /// Stop after this many ticks. Default: run until told to stop.
    pub max_ticks: Option<u64>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_ticks: None,
        }
    }
}

/// What happened on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Envelope of this many bytes delivered.
    Sent(usize),
    SourceFailed,
    SendFailed,
}

/// Totals for a finished [`PeriodicSender::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderReport {
    pub ticks: u64,
    pub sent: u64,
    pub bytes_sent: u64,
    pub source_failures: u64,
    pub send_failures: u64,
}

impl SenderReport {
    fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Sent(bytes) => {
                self.sent += 1;
                self.bytes_sent += bytes as u64;
            }
            TickOutcome::SourceFailed => self.source_failures += 1,
            TickOutcome::SendFailed => self.send_failures += 1,
        }
    }
}

pub struct PeriodicSender<'a, S, C: Connector> {
    client: &'a mut DeliveryClient<C>,
    source: S,
    config: SenderConfig,
}

impl<'a, S: MessageSource, C: Connector> PeriodicSender<'a, S, C> {
    pub fn new(client: &'a mut DeliveryClient<C>, source: S, config: SenderConfig) -> Self {
        Self {
            client,
            source,
            config,
        }
    }

    /// Produce and send one message.
    pub fn send_once(&mut self) -> TickOutcome {
        let message = match self.source.next_message() {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "message source failed, skipping tick");
                return TickOutcome::SourceFailed;
            }
        };

        match self.client.send_message(&message.name, &message.payload) {
            Ok(bytes) => {
                debug!(name = %message.name, bytes, "tick sent");
                TickOutcome::Sent(bytes)
            }
            // The client already logged name and size.
            Err(_) => TickOutcome::SendFailed,
        }
    }

    /// Tick until `running` is cleared or `max_ticks` is reached.
    ///
    /// Ticks start `interval` apart; a slow send shortens the following
    /// sleep rather than pushing the schedule back.
    pub fn run(&mut self, running: &AtomicBool) -> SenderReport {
        let mut report = SenderReport::default();
        info!(
            peer = %self.client.connector().describe(),
            interval_ms = self.config.interval.as_millis() as u64,
            "periodic sender started"
        );

        while running.load(Ordering::SeqCst) && !self.done(&report) {
            let started = Instant::now();
            report.record(self.send_once());

            if self.done(&report) {
                break;
            }
            sleep_while_running(started + self.config.interval, running);
        }

        info!(
            ticks = report.ticks,
            sent = report.sent,
            send_failures = report.send_failures,
            source_failures = report.source_failures,
            "periodic sender stopped"
        );
        report
    }

    pub fn client(&self) -> &DeliveryClient<C> {
        self.client
    }

    fn done(&self, report: &SenderReport) -> bool {
        self.config
            .max_ticks
            .is_some_and(|max| report.ticks >= max)
    }
}

fn sleep_while_running(deadline: Instant, running: &AtomicBool) {
    loop {
        let now = Instant::now();
        if now >= deadline || !running.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
