//! Network error types for frame encoding and decoding.

use thiserror::Error;

/// Errors that can occur while framing or parsing a JSON wire frame.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// The payload was not valid JSON, or didn't match the frame it claimed to be.
    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// Frame size exceeded the maximum allowed for a single message.
    #[error("frame size {actual} exceeds maximum {max}")]
    MessageTooLarge { actual: usize, max: usize },

    /// The frame's `type` field didn't match any known client or server frame.
    #[error("unknown frame type: {0}")]
    UnknownType(String),
}

/// Result type for frame serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;
