//! Envelope format handling.
//!
//! Provides version-aware parsing and serialization of sealed `.env` files.
//! Two layouts are recognized:
//!
//! - `v1`: legacy colon-delimited text, read compatibility only
//! - `v2`: self-describing JSON recording the Argon2 parameters used
//!
//! The codec never touches key material; authenticity is checked by
//! [`crate::open`].

use serde_json::Value;

use crate::crypto::{IV_LEN, KdfParams, SALT_LEN, TAG_LEN};
use crate::error::{Result, VaultError};

pub mod v1;
pub mod v2;

pub use v1::LegacyEnvelope;
pub use v2::EnvelopeV2;

/// Version written by [`crate::seal`].
pub const CURRENT_VERSION: u32 = v2::VERSION_V2;

/// The binary parts every envelope version carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

/// A parsed envelope, one variant per on-disk layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    LegacyV1(LegacyEnvelope),
    V2(EnvelopeV2),
}

impl Envelope {
    /// Parses envelope text, dispatching once on its version marker.
    ///
    /// # Errors
    ///
    /// - [`VaultError::UnsupportedVersion`] if a well-formed envelope carries a
    ///   missing or unknown version
    /// - [`VaultError::MalformedEnvelope`] if the structure or a hex field is
    ///   invalid, including truncated JSON and colon text without five fields
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => match fields.get("v") {
                Some(v) if v.as_u64() == Some(u64::from(v2::VERSION_V2)) => {
                    Ok(Envelope::V2(v2::from_value(Value::Object(fields))?))
                }
                Some(other) => Err(VaultError::UnsupportedVersion(other.to_string())),
                None => Err(VaultError::UnsupportedVersion("missing".into())),
            },
            Ok(_) => Err(VaultError::malformed("top level is not an object")),
            Err(e) if text.starts_with('{') => {
                Err(VaultError::malformed(format!("invalid JSON envelope: {e}")))
            }
            Err(_) if text.split(':').count() == v1::FIELD_COUNT => {
                Ok(Envelope::LegacyV1(v1::parse(text)?))
            }
            Err(_) => Err(VaultError::malformed(
                "neither a JSON envelope nor a colon-delimited one",
            )),
        }
    }

    /// Serializes the envelope in the layout of its own version.
    pub fn serialize(&self) -> Result<String> {
        match self {
            Envelope::LegacyV1(env) => Ok(v1::serialize(env)),
            Envelope::V2(env) => v2::serialize(env),
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            Envelope::LegacyV1(_) => v1::VERSION_V1,
            Envelope::V2(_) => v2::VERSION_V2,
        }
    }

    /// The Argon2 parameters needed to re-derive this envelope's key.
    pub fn kdf(&self) -> KdfParams {
        match self {
            Envelope::LegacyV1(_) => KdfParams::LEGACY,
            Envelope::V2(env) => env.kdf(),
        }
    }

    /// Profile name recorded at seal time; legacy envelopes have none.
    pub fn profile(&self) -> Option<&str> {
        match self {
            Envelope::LegacyV1(_) => None,
            Envelope::V2(env) => Some(env.profile()),
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Envelope::LegacyV1(env) => env.payload(),
            Envelope::V2(env) => env.payload(),
        }
    }
}

/// Decodes a hex field of exactly `N` bytes.
pub(crate) fn decode_fixed<const N: usize>(field: &str, hex_text: &str) -> Result<[u8; N]> {
    let bytes = decode_hex(field, hex_text)?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        VaultError::malformed(format!("{field} must be {N} bytes, got {}", b.len()))
    })
}

pub(crate) fn decode_hex(field: &str, hex_text: &str) -> Result<Vec<u8>> {
    hex::decode(hex_text).map_err(|e| VaultError::malformed(format!("{field} is not hex: {e}")))
}

#[cfg(test)]
pub(crate) fn sample_payload() -> Payload {
    Payload {
        salt: [1u8; SALT_LEN],
        iv: [2u8; IV_LEN],
        tag: [3u8; TAG_LEN],
        ciphertext: vec![0xde, 0xad, 0xbe, 0xef],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX16: &str = "00112233445566778899aabbccddeeff";

    #[test]
    fn dispatches_legacy_text() {
        let text = format!("v1:{HEX16}:{HEX16}:{HEX16}:abcd");
        let env = Envelope::parse(&text).unwrap();
        assert_eq!(env.version(), 1);
        assert_eq!(env.kdf(), KdfParams::LEGACY);
        assert_eq!(env.profile(), None);
        assert_eq!(env.payload().ciphertext, vec![0xab, 0xcd]);
    }

    #[test]
    fn dispatches_v2_json() {
        let env = Envelope::V2(EnvelopeV2::new(
            "light",
            KdfParams::new(1024, 2, 1).unwrap(),
            sample_payload(),
        ));
        let text = env.serialize().unwrap();
        let parsed = Envelope::parse(&text).unwrap();

        assert_eq!(parsed, env);
        assert_eq!(parsed.version(), CURRENT_VERSION);
        assert_eq!(parsed.profile(), Some("light"));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let text = format!("\n  v1:{HEX16}:{HEX16}:{HEX16}:00\n");
        assert!(Envelope::parse(&text).is_ok());
    }

    #[test]
    fn unknown_json_version_is_unsupported() {
        let text = r#"{"v": 3, "mode": "password"}"#;
        assert!(matches!(
            Envelope::parse(text),
            Err(VaultError::UnsupportedVersion(v)) if v == "3"
        ));
    }

    #[test]
    fn missing_json_version_is_unsupported() {
        let text = r#"{"mode": "password", "data": "00"}"#;
        assert!(matches!(
            Envelope::parse(text),
            Err(VaultError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn string_version_is_unsupported() {
        let text = r#"{"v": "2"}"#;
        assert!(matches!(
            Envelope::parse(text),
            Err(VaultError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn unknown_colon_version_is_unsupported() {
        let text = format!("v9:{HEX16}:{HEX16}:{HEX16}:00");
        assert!(matches!(
            Envelope::parse(&text),
            Err(VaultError::UnsupportedVersion(v)) if v == "v9"
        ));
    }

    #[test]
    fn truncated_json_is_malformed() {
        let text = "{\n  \"v\": 2,\n  \"mode\": \"password\",\n  \"profile\": \"li";
        assert!(matches!(
            Envelope::parse(text),
            Err(VaultError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn short_colon_text_is_malformed() {
        for text in ["hello: world", "v1:abcd", "v9:00:11"] {
            assert!(
                matches!(Envelope::parse(text), Err(VaultError::MalformedEnvelope(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn non_object_json_is_malformed() {
        for text in ["[1, 2, 3]", "\"v1\"", "42", "null"] {
            assert!(
                matches!(Envelope::parse(text), Err(VaultError::MalformedEnvelope(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            Envelope::parse("definitely not an envelope"),
            Err(VaultError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            Envelope::parse(""),
            Err(VaultError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn decode_fixed_checks_length() {
        assert!(decode_fixed::<16>("salt", HEX16).is_ok());
        assert!(matches!(
            decode_fixed::<16>("salt", "0011"),
            Err(VaultError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            decode_fixed::<16>("salt", "zz112233445566778899aabbccddeeff"),
            Err(VaultError::MalformedEnvelope(_))
        ));
    }
}
