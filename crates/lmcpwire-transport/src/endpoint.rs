use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Host the OpenAMASE simulator listens on by default.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the OpenAMASE simulator listens on by default.
pub const DEFAULT_PORT: u16 = 5555;

/// A `host:port` pair naming the single receiving peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint from a host name or address literal and a port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to socket addresses (may hit DNS).
    pub fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                addr: self.to_string(),
                source,
            })?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::Resolve {
                addr: self.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "host resolved to no addresses",
                ),
            });
        }
        Ok(addrs)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason| TransportError::InvalidEndpoint {
            input: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        let (host, port) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;

        // IPv6 literals are bracketed: [::1]:5555
        let host = match host.strip_prefix('[') {
            Some(rest) => rest
                .strip_suffix(']')
                .ok_or_else(|| invalid("unterminated IPv6 bracket"))?,
            None if host.contains(':') => return Err(invalid("IPv6 hosts must be bracketed")),
            None => host,
        };

        if host.is_empty() {
            return Err(invalid("host must not be empty"));
        }

        let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;

        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_amase_loopback() {
        let endpoint = Endpoint::default();
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 5555);
        assert_eq!(endpoint.to_string(), "127.0.0.1:5555");
    }

    #[test]
    fn parses_host_and_port() {
        let endpoint: Endpoint = "localhost:7000".parse().unwrap();
        assert_eq!(endpoint, Endpoint::new("localhost", 7000));
    }

    #[test]
    fn parses_bracketed_ipv6() {
        let endpoint: Endpoint = "[::1]:5555".parse().unwrap();
        assert_eq!(endpoint.host(), "::1");
        assert_eq!(endpoint.to_string(), "[::1]:5555");
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", "localhost", ":5555", "host:notaport", "host:70000", "::1:5555"] {
            let result = input.parse::<Endpoint>();
            assert!(
                matches!(result, Err(TransportError::InvalidEndpoint { .. })),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn resolves_loopback() {
        let addrs = Endpoint::new("127.0.0.1", 5555).resolve().unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:5555".parse::<SocketAddr>().unwrap()]);
    }
}
