//! Blocking TCP transport for lmcpwire.
//!
//! Provides the pieces the delivery client needs to reach its single peer:
//! - [`Endpoint`]: the configured `host:port`
//! - [`Connector`] / [`TcpConnector`]: one blocking connect attempt per call
//! - [`TcpLink`]: the connected stream
//! - [`ignore_sigpipe`]: process-wide suppression of `SIGPIPE`
//!
//! [`TcpServer`] covers the receiving side for tooling and tests.

pub mod endpoint;
pub mod error;
pub mod signal;
pub mod tcp;
pub mod traits;

pub use endpoint::{Endpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Result, TransportError};
pub use signal::ignore_sigpipe;
pub use tcp::{TcpConnector, TcpServer};
pub use traits::{Connector, TcpLink};
