/// Errors that can occur during envelope encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The message name cannot be carried in an attribute block.
    #[error("invalid message name {name:?}: {reason}")]
    InvalidMessageName { name: String, reason: &'static str },

    /// The stream does not start with the `+=+=+=+=` sentinel marker.
    #[error("invalid envelope sentinel (expected \"+=+=+=+=\")")]
    InvalidSentinel,

    /// The sentinel does not carry a usable decimal length.
    #[error("invalid envelope length field")]
    InvalidLength,

    /// The checksum footer is missing or malformed.
    #[error("invalid envelope footer")]
    InvalidFooter,

    /// The attribute block in front of the payload is malformed.
    #[error("invalid attribute block: {0}")]
    InvalidAttributes(&'static str),

    /// The footer checksum does not match the addressed content.
    #[error("checksum mismatch (footer {expected}, computed {actual})")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// The declared envelope length exceeds the configured maximum.
    #[error("envelope too large ({size} bytes, max {max})")]
    EnvelopeTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing envelopes.
    #[error("envelope I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before the operation completed.
    #[error("connection closed (incomplete envelope)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
