//! Error types and handling.

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum SwitcherError {
    /// A value handed to an encoder is outside its documented domain
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A response or datagram could not be sliced or parsed at an expected offset
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// TCP connection failed
    #[error("TCP connection failed: {0}")]
    TcpConnectionFailed(String),

    /// Device communication timeout
    #[error("Device timeout: {0}")]
    DeviceTimeout(String),

    /// Operation attempted without an open transport
    #[error("Device not connected")]
    NotConnected,

    /// The device answered with an empty or out-of-sequence response
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Socket I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for SwitcherError
pub type Result<T> = std::result::Result<T, SwitcherError>;

impl SwitcherError {
    /// Create an encoding error with message
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a decoding error with message
    pub fn decoding(msg: impl Into<String>) -> Self {
        Self::Decoding(msg.into())
    }

    /// Create an unexpected response error with message
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }
}
