//! OpenAMASE envelope framing for serialized LMCP messages.
//!
//! Every message is wrapped as:
//! - a sentinel `+=+=+=+=<total length>#@#@#@#@`
//! - an attribute block `<name>$lmcp|<name>||0|0$`
//! - the opaque payload bytes
//! - a footer `!%!%!%!%<checksum>?^?^?^?^`
//!
//! The checksum is the wrapping 32-bit sum of the attribute block and payload
//! bytes. Framing is pure; [`EnvelopeWriter`] and [`EnvelopeReader`] add the
//! blocking I/O on top.

pub mod codec;
pub mod error;
pub mod name;
pub mod reader;
pub mod writer;

pub use codec::{
    attributes, checksum, checksum_parts, decode_envelope, declared_length, encode_envelope,
    frame, Attributes, Envelope, FrameConfig, CHECKSUM_SIZE, DEFAULT_MAX_ENVELOPE, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use name::MessageName;
pub use reader::EnvelopeReader;
pub use writer::{flush_retrying, write_fully, EnvelopeWriter};
