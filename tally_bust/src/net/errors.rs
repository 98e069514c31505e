//! Network error types for serialization and transport operations.

use thiserror::Error;

use super::protocol_version::ProtocolVersion;
use crate::game::entities::PeerId;

/// Errors that can occur during network message serialization/deserialization
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Failed to encode a message
    #[error("Failed to encode message: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Failed to decode a message
    #[error("Failed to decode message: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// Message size exceeded maximum allowed
    #[error("Message size {actual} exceeds maximum {max}")]
    MessageTooLarge { actual: usize, max: usize },

    /// Sender speaks a protocol we can't replay
    #[error("Incompatible protocol version {theirs} (ours is {ours})")]
    IncompatibleVersion {
        ours: ProtocolVersion,
        theirs: ProtocolVersion,
    },

    /// Invalid message format
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),
}

/// Result type for serialization operations
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Errors raised by a [`Transport`](super::transport::Transport) send.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    #[error("no route to peer {0}")]
    UnknownPeer(PeerId),
    #[error("link to peer {0} is closed")]
    Closed(PeerId),
}
