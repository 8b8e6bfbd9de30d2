//! Legacy envelope format v1.
//!
//! V1 Format (read compatibility only):
//! ```text
//! v1:<SALT hex>:<IV hex>:<TAG hex>:<CIPHERTEXT hex>
//! ```
//!
//! V1 never recorded its Argon2 parameters; they are fixed at
//! [`KdfParams::LEGACY`](crate::crypto::KdfParams::LEGACY).

use super::{Payload, decode_fixed, decode_hex};
use crate::error::{Result, VaultError};

/// Numeric version of the legacy format.
pub const VERSION_V1: u32 = 1;
/// Leading field of every v1 envelope.
pub const VERSION_TAG: &str = "v1";

pub(crate) const FIELD_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyEnvelope {
    payload: Payload,
}

impl LegacyEnvelope {
    pub fn new(payload: Payload) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// Parses a v1 envelope.
///
/// # Errors
///
/// Returns [`VaultError::MalformedEnvelope`] for a wrong field count or bad
/// hex, and [`VaultError::UnsupportedVersion`] if five fields lead with a
/// tag other than `v1`.
pub fn parse(text: &str) -> Result<LegacyEnvelope> {
    let parts: Vec<&str> = text.trim().split(':').collect();

    let [version, salt, iv, tag, data] = parts.as_slice() else {
        return Err(VaultError::malformed(format!(
            "colon envelope needs {FIELD_COUNT} fields, got {}",
            parts.len()
        )));
    };

    if *version != VERSION_TAG {
        return Err(VaultError::UnsupportedVersion(version.to_string()));
    }

    Ok(LegacyEnvelope::new(Payload {
        salt: decode_fixed("salt", salt)?,
        iv: decode_fixed("iv", iv)?,
        tag: decode_fixed("tag", tag)?,
        ciphertext: decode_hex("data", data)?,
    }))
}

/// Serializes to the v1 colon format.
pub fn serialize(envelope: &LegacyEnvelope) -> String {
    let p = envelope.payload();
    format!(
        "{VERSION_TAG}:{}:{}:{}:{}",
        hex::encode(p.salt),
        hex::encode(p.iv),
        hex::encode(p.tag),
        hex::encode(&p.ciphertext)
    )
}
