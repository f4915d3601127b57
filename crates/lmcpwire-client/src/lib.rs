//! Connect-on-demand delivery of framed LMCP messages to a single TCP peer.
//!
//! [`DeliveryClient`] holds at most one connection. It connects on the first
//! send, writes every buffer in full, and closes the connection on any write
//! error so the next send starts over with a fresh connect.
//!
//! [`PeriodicSender`] drives a client from a [`MessageSource`] at a fixed
//! interval.

pub mod client;
pub mod error;
pub mod sender;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ClientConfig, ClientStats, DeliveryClient, SharedDeliveryClient};
pub use error::{ClientError, Result};
pub use sender::{
    MessageSource, OutgoingMessage, PeriodicSender, SenderConfig, SenderReport, SourceError,
    TickOutcome,
};
