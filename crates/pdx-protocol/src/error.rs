use thiserror::Error;

/// Errors from wire encoding and decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("unknown message type tag: {0}")]
    UnknownMessageType(u8),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
