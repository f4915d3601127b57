/// Errors that can occur in delivery client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connect attempt failed; the client stays disconnected.
    #[error("transport error: {0}")]
    Transport(#[from] lmcpwire_transport::TransportError),

    /// Write failed; the connection has been closed.
    #[error("frame error: {0}")]
    Frame(#[from] lmcpwire_frame::FrameError),

    /// A thread panicked while holding the shared client.
    #[error("shared client lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, ClientError>;
