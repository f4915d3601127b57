use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use lmcpwire_transport::TcpLink;
use tracing::trace;

use crate::codec::{declared_length, encode_envelope, FrameConfig};
use crate::error::{FrameError, Result};
use crate::name::MessageName;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Write every byte of `data`, looping over partial writes (blocking).
///
/// Returns the number of bytes written, always `data.len()` on success. A
/// write that accepts zero bytes is [`FrameError::ConnectionClosed`];
/// `Interrupted` is retried and every other error is returned as-is, including
/// `WouldBlock`/`TimedOut` from an expired write timeout. Bytes already
/// written when an error occurs are not retried.
pub fn write_fully<W: Write + ?Sized>(inner: &mut W, data: &[u8]) -> Result<usize> {
    let mut offset = 0usize;
    while offset < data.len() {
        match inner.write(&data[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => {
                offset += n;
                trace!(written = n, offset, total = data.len(), "partial write");
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(offset)
}

/// Flush, retrying on `Interrupted`.
pub fn flush_retrying<W: Write + ?Sized>(inner: &mut W) -> Result<()> {
    loop {
        match inner.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}

/// Writes complete envelopes to any `Write` stream.
pub struct EnvelopeWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> EnvelopeWriter<T> {
    /// Create a new envelope writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new envelope writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Frame and send a payload under `name` (blocking).
    ///
    /// Returns the number of envelope bytes written. Envelopes declaring more than
    /// `max_envelope_size` are refused before any byte is written.
    pub fn send(&mut self, name: &MessageName, payload: &[u8]) -> Result<usize> {
        let size = declared_length(payload.len(), name);
        if size > self.config.max_envelope_size {
            return Err(FrameError::EnvelopeTooLarge {
                size,
                max: self.config.max_envelope_size,
            });
        }

        self.buf.clear();
        encode_envelope(payload, name, &mut self.buf);

        let written = write_fully(&mut self.inner, &self.buf)?;
        self.flush()?;
        Ok(written)
    }

    /// Send bytes that are already framed.
    pub fn send_framed(&mut self, data: &[u8]) -> Result<usize> {
        let written = write_fully(&mut self.inner, data)?;
        self.flush()?;
        Ok(written)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        flush_retrying(&mut self.inner)
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl EnvelopeWriter<TcpLink> {
    /// Create an envelope writer for a `TcpLink` and apply write timeout from config.
    pub fn with_config_tcp(inner: TcpLink, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: lmcpwire_transport::TransportError) -> FrameError {
    match err {
        lmcpwire_transport::TransportError::Io(io)
        | lmcpwire_transport::TransportError::Accept(io) => FrameError::Io(io),
        lmcpwire_transport::TransportError::Bind { source, .. }
        | lmcpwire_transport::TransportError::Connect { source, .. }
        | lmcpwire_transport::TransportError::Resolve { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
