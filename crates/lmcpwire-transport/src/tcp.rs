use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::traits::{Connector, TcpLink};

/// Blocking TCP connector for a single fixed endpoint.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    endpoint: Endpoint,
    connect_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    nodelay: bool,
}

impl TcpConnector {
    /// Connector with no timeouts and `TCP_NODELAY` enabled.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: None,
            write_timeout: None,
            nodelay: true,
        }
    }

    /// Bound each connect attempt. `None` blocks until the OS gives up.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Apply a write timeout to every stream this connector opens.
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn connect_addr(&self, addr: &SocketAddr) -> std::io::Result<TcpStream> {
        match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpLink;

    fn connect(&self) -> Result<TcpLink> {
        let addrs = self.endpoint.resolve()?;

        let mut last_err = None;
        for addr in &addrs {
            match self.connect_addr(addr) {
                Ok(stream) => {
                    let link = TcpLink::from_tcp(stream);
                    link.set_nodelay(self.nodelay)?;
                    link.set_write_timeout(self.write_timeout)?;
                    debug!(%addr, endpoint = %self.endpoint, "connected");
                    return Ok(link);
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr: self.endpoint.to_string(),
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses to connect to")
            }),
        })
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.endpoint)
    }
}

/// Listening side of the envelope stream.
///
/// The delivery client never listens; this exists for the receiving peer
/// (the `listen` command and loopback tests).
pub struct TcpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpServer {
    /// Bind and listen. Port 0 picks an ephemeral port, see [`TcpServer::local_addr`].
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let addrs = endpoint.resolve()?;
        let listener = TcpListener::bind(addrs.as_slice()).map_err(|source| TransportError::Bind {
            addr: endpoint.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;

        info!(%local_addr, "listening for envelopes");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<TcpLink> {
        let (stream, addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%addr, "accepted connection");
        Ok(TcpLink::from_tcp(stream))
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Endpoint clients should connect to.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::from(self.local_addr)
    }
}
