//! OpenAMASE envelope framing and delivery for serialized LMCP messages.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP endpoint, connector seam, SIGPIPE suppression
//! - [`frame`]: envelope framing, decoding, blocking reader/writer
//! - [`client`]: connect-on-demand delivery client and periodic sender
//!   (behind the default `client` feature)
//!
//! ```no_run
//! use lmcpwire::client::{ClientConfig, DeliveryClient};
//! use lmcpwire::frame::MessageName;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = DeliveryClient::new(ClientConfig::default());
//! let name = MessageName::new("afrl.cmasi.AirVehicleState")?;
//! let sent = client.send_message(&name, b"serialized bytes")?;
//! println!("sent {sent} bytes");
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use lmcpwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use lmcpwire_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use lmcpwire_client::*;
}
