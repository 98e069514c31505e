use bincode::{
    config,
    serde::{decode_from_slice, encode_to_vec},
};

use super::{
    errors::{Result, SerializationError},
    messages::Envelope,
    protocol_version::ProtocolVersion,
};

/// Maximum allowed payload size (1MB) to prevent unbounded allocation
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Serializes an envelope into a transport payload.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
    let bytes = encode_to_vec(envelope, config::standard())?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(SerializationError::MessageTooLarge {
            actual: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bytes)
}

/// Deserializes a transport payload. Oversized payloads, trailing bytes,
/// foreign protocol versions and envelopes whose step doesn't match the
/// message kind are all rejected rather than partially applied.
pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(SerializationError::MessageTooLarge {
            actual: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let (envelope, read): (Envelope, usize) = decode_from_slice(bytes, config::standard())?;
    if read != bytes.len() {
        return Err(SerializationError::InvalidFormat(format!(
            "{} trailing bytes",
            bytes.len() - read
        )));
    }

    let ours = ProtocolVersion::current();
    if !ours.is_compatible_with(envelope.version) {
        return Err(SerializationError::IncompatibleVersion {
            ours,
            theirs: envelope.version,
        });
    }

    if !envelope.is_well_formed() {
        return Err(SerializationError::InvalidFormat(format!(
            "step {:?} doesn't match message '{}'",
            envelope.step, envelope.message
        )));
    }

    Ok(envelope)
}
