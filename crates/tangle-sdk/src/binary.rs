//! Binary framing of a [`Marshalled`] stream.
//!
//! ```text
//! [4 bytes: magic "TNGL"]
//! [N bytes: payload (bincode-serialized Marshalled)]
//! ```
//!
//! The payload carries the version sentinel, so only the magic is checked
//! here; the decoder rejects a foreign sentinel.

use tangle_types::Marshalled;

use crate::error::{SdkError, SdkResult};

pub const MAGIC: [u8; 4] = *b"TNGL";

/// Serialize a stream to framed bytes.
pub fn to_bytes(marshalled: &Marshalled) -> SdkResult<Vec<u8>> {
    let payload =
        bincode::serialize(marshalled).map_err(|e| SdkError::Serialization(e.to_string()))?;
    let mut out = Vec::with_capacity(MAGIC.len() + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Parse framed bytes back into a stream.
pub fn from_bytes(data: &[u8]) -> SdkResult<Marshalled> {
    match data.split_at_checked(MAGIC.len()) {
        Some((magic, payload)) if magic == MAGIC => {
            bincode::deserialize(payload).map_err(|e| SdkError::Serialization(e.to_string()))
        }
        _ => Err(SdkError::InvalidMagic {
            expected: MAGIC,
            actual: data.iter().take(MAGIC.len()).copied().collect(),
        }),
    }
}
