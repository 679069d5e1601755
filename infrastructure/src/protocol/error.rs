//! Error types for the wire protocol

use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while framing, reading or writing protocol messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Frame has no Content-Length header")]
    MissingContentLength,

    #[error("Invalid Content-Length header: {0}")]
    InvalidContentLength(String),

    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    #[error("Transport closed mid-frame (expected {expected} bytes)")]
    Truncated { expected: usize },

    #[error("Failed to spawn provider '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport closed")]
    TransportClosed,
}
