//! Cryptographic primitives for sealing secrets.
//!
//! Provides key derivation, authenticated encryption and random material.

pub mod aead;
pub mod kdf;

pub use aead::{decrypt, encrypt, generate_iv, generate_salt};
pub use kdf::{DerivedKey, KdfParams, derive_key};

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the IV (16 bytes, AES-GCM with a non-96-bit nonce).
pub const IV_LEN: usize = 16;
/// Length of the authentication tag (16 bytes).
pub const TAG_LEN: usize = 16;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
