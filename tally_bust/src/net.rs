//! Wire protocol between peers of a match.
//!
//! Payloads are bincode-encoded [`messages::Envelope`]s. How bytes move
//! between devices is left to a [`transport::Transport`] implementation.

/// Error types for encoding, decoding and sending.
pub mod errors;

/// Replicated events and the envelope they travel in.
pub mod messages;

/// Protocol versioning for backward compatibility.
pub mod protocol_version;

/// Send primitive and an in-process loopback implementation.
pub mod transport;

/// Envelope encoding and validated decoding.
pub mod utils;
