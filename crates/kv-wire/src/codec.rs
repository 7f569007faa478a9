//! Encoding and decoding of [`WireMessage`] to and from the single-JSON-object
//! framing used on every connection (§6, §9 "single-connection-per-request").

use crate::{WireError, WireMessage};

/// Serializes a message to the bytes that go out on the wire.
pub fn encode(message: &WireMessage) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(message)?)
}

/// Parses one JSON object read from a connection, enforcing the configured
/// payload size cap up front.
pub fn decode(bytes: &[u8], payload_size_limit: usize) -> Result<WireMessage, WireError> {
    if bytes.len() > payload_size_limit {
        return Err(WireError::PayloadTooLarge {
            size: bytes.len(),
            limit: payload_size_limit,
        });
    }
    Ok(serde_json::from_slice(bytes)?)
}
