//! Envelope format v2.
//!
//! V2 Format (JSON, binary fields as lowercase hex):
//! ```text
//! {
//!   "v": 2,
//!   "mode": "password",
//!   "profile": "light",
//!   "ops": { "mem": 65536, "time": 3, "parallel": 1 },
//!   "salt": "<32 hex>", "iv": "<32 hex>", "tag": "<32 hex>",
//!   "data": "<hex>"
//! }
//! ```
//!
//! `ops` holds the parameters actually used, so re-deriving the key never
//! depends on what the named profile means today.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Payload, decode_fixed, decode_hex};
use crate::crypto::KdfParams;
use crate::error::{Result, VaultError};

/// Current envelope format version.
pub const VERSION_V2: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeV2 {
    mode: Mode,
    profile: String,
    kdf: KdfParams,
    payload: Payload,
}

impl EnvelopeV2 {
    pub fn new(profile: impl Into<String>, kdf: KdfParams, payload: Payload) -> Self {
        Self {
            mode: Mode::Password,
            profile: profile.into(),
            kdf,
            payload,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Wire {
    v: u32,
    mode: Mode,
    profile: String,
    ops: WireOps,
    salt: String,
    iv: String,
    tag: String,
    data: String,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireOps {
    mem: u32,
    time: u32,
    parallel: u32,
}

/// Builds a v2 envelope from an already-parsed JSON object.
///
/// # Errors
///
/// Returns [`VaultError::MalformedEnvelope`] for missing, extra or mistyped
/// fields and for binary fields that are not hex of the right length.
pub(crate) fn from_value(value: Value) -> Result<EnvelopeV2> {
    let wire: Wire = serde_json::from_value(value)
        .map_err(|e| VaultError::malformed(format!("invalid v2 envelope: {e}")))?;

    if wire.v != VERSION_V2 {
        return Err(VaultError::UnsupportedVersion(wire.v.to_string()));
    }

    Ok(EnvelopeV2 {
        mode: wire.mode,
        profile: wire.profile,
        kdf: KdfParams::from_raw(wire.ops.mem, wire.ops.time, wire.ops.parallel),
        payload: Payload {
            salt: decode_fixed("salt", &wire.salt)?,
            iv: decode_fixed("iv", &wire.iv)?,
            tag: decode_fixed("tag", &wire.tag)?,
            ciphertext: decode_hex("data", &wire.data)?,
        },
    })
}

/// Serializes to pretty-printed v2 JSON.
pub fn serialize(envelope: &EnvelopeV2) -> Result<String> {
    let p = envelope.payload();
    let wire = Wire {
        v: VERSION_V2,
        mode: envelope.mode,
        profile: envelope.profile.clone(),
        ops: WireOps {
            mem: envelope.kdf.mem_cost_kib(),
            time: envelope.kdf.time_cost(),
            parallel: envelope.kdf.parallelism(),
        },
        salt: hex::encode(p.salt),
        iv: hex::encode(p.iv),
        tag: hex::encode(p.tag),
        data: hex::encode(&p.ciphertext),
    };

    serde_json::to_string_pretty(&wire)
        .map_err(|e| VaultError::malformed(format!("cannot encode envelope: {e}")))
}
