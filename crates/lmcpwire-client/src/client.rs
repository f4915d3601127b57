use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lmcpwire_frame::{flush_retrying, frame, write_fully, MessageName};
use lmcpwire_transport::{ignore_sigpipe, Connector, Endpoint, TcpConnector};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Delivery client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The single receiving peer. Default: `127.0.0.1:5555`.
    pub endpoint: Endpoint,
    /// Bound on each connect attempt. Default: none (blocking connect).
    pub connect_timeout: Option<Duration>,
    /// Bound on each write call. Default: none (a peer that never drains
    /// its receive buffer blocks the send indefinitely).
    pub write_timeout: Option<Duration>,
    /// Disable Nagle's algorithm. Default: true.
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            connect_timeout: None,
            write_timeout: None,
            nodelay: true,
        }
    }
}

impl ClientConfig {
    pub fn connector(&self) -> TcpConnector {
        TcpConnector::new(self.endpoint.clone())
            .with_connect_timeout(self.connect_timeout)
            .with_write_timeout(self.write_timeout)
            .with_nodelay(self.nodelay)
    }
}

/// Counters kept across the client's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub connect_attempts: u64,
    pub connects: u64,
    pub buffers_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
}

enum ConnectionState<S> {
    Disconnected,
    Connected(S),
}

/// Owns at most one connection to the peer and delivers whole buffers to it.
///
/// The connection is opened lazily by the first send and dropped as soon as
/// a write fails; the next send then connects again. There is no backoff and
/// no retry inside a call. Sends take `&mut self`, so a single client never
/// has two sends in flight; see [`SharedDeliveryClient`] for use across
/// threads.
pub struct DeliveryClient<C: Connector = TcpConnector> {
    connector: C,
    state: ConnectionState<C::Stream>,
    stats: ClientStats,
}

impl DeliveryClient<TcpConnector> {
    /// Client for a TCP peer. Nothing is connected until the first send.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config.connector())
    }
}

impl<C: Connector> DeliveryClient<C> {
    /// Client over an arbitrary connector.
    ///
    /// Also ignores `SIGPIPE` for the whole process (once), so writing to a
    /// peer that went away is reported as an error instead of killing us.
    pub fn with_connector(connector: C) -> Self {
        ignore_sigpipe();
        Self {
            connector,
            state: ConnectionState::Disconnected,
            stats: ClientStats::default(),
        }
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// Connect now if not already connected.
    pub fn connect(&mut self) -> Result<()> {
        let stream = self.take_or_connect()?;
        self.state = ConnectionState::Connected(stream);
        Ok(())
    }

    /// Drop (close) the connection, if any.
    pub fn disconnect(&mut self) {
        if let ConnectionState::Connected(_) =
            std::mem::replace(&mut self.state, ConnectionState::Disconnected)
        {
            debug!(peer = %self.connector.describe(), "disconnected");
        }
    }

    /// Deliver an already framed buffer (blocking).
    ///
    /// Connects first if needed; a failed connect returns without writing.
    /// Any write error, or a write that accepts zero bytes, closes the
    /// connection and fails the whole send. Empty buffers succeed without
    /// touching the connection.
    pub fn send_framed(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let mut stream = self.take_or_connect()?;

        let outcome = write_fully(&mut stream, data).and_then(|_| flush_retrying(&mut stream));

        match outcome {
            Ok(()) => {
                self.state = ConnectionState::Connected(stream);
                self.stats.buffers_sent += 1;
                self.stats.bytes_sent += data.len() as u64;
                Ok(())
            }
            Err(err) => {
                // `stream` is dropped here, closing the socket.
                self.stats.send_failures += 1;
                warn!(
                    peer = %self.connector.describe(),
                    bytes = data.len(),
                    error = %err,
                    "send failed, connection closed"
                );
                Err(err.into())
            }
        }
    }

    /// Frame `payload` under `name` and deliver it.
    ///
    /// Returns the envelope size in bytes.
    pub fn send_message(&mut self, name: &MessageName, payload: &[u8]) -> Result<usize> {
        let envelope = frame(payload, name);
        debug!(%name, bytes = envelope.len(), "sending message");

        match self.send_framed(&envelope) {
            Ok(()) => Ok(envelope.len()),
            Err(err) => {
                warn!(%name, bytes = envelope.len(), "failed to send message");
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> ClientStats {
        self.stats
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn take_or_connect(&mut self) -> Result<C::Stream> {
        match std::mem::replace(&mut self.state, ConnectionState::Disconnected) {
            ConnectionState::Connected(stream) => Ok(stream),
            ConnectionState::Disconnected => self.open(),
        }
    }

    fn open(&mut self) -> Result<C::Stream> {
        self.stats.connect_attempts += 1;
        match self.connector.connect() {
            Ok(stream) => {
                self.stats.connects += 1;
                debug!(peer = %self.connector.describe(), "connection established");
                Ok(stream)
            }
            Err(err) => {
                debug!(peer = %self.connector.describe(), error = %err, "connect failed");
                Err(ClientError::Transport(err))
            }
        }
    }
}

/// A [`DeliveryClient`] behind a mutex, for callers on several threads.
///
/// The lock is held for the whole send, connect check and write loop
/// included, so there is still exactly one connection and sends do not
/// interleave on the wire.
pub struct SharedDeliveryClient<C: Connector = TcpConnector> {
    inner: Arc<Mutex<DeliveryClient<C>>>,
}

impl<C: Connector> Clone for SharedDeliveryClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> SharedDeliveryClient<C> {
    pub fn new(client: DeliveryClient<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    pub fn send_framed(&self, data: &[u8]) -> Result<()> {
        self.lock()?.send_framed(data)
    }

    pub fn send_message(&self, name: &MessageName, payload: &[u8]) -> Result<usize> {
        self.lock()?.send_message(name, payload)
    }

    pub fn is_connected(&self) -> Result<bool> {
        Ok(self.lock()?.is_connected())
    }

    pub fn stats(&self) -> Result<ClientStats> {
        Ok(self.lock()?.stats())
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeliveryClient<C>>> {
        self.inner.lock().map_err(|_| ClientError::Poisoned)
    }
}
