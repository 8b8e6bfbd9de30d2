//! Error types for vault operations.
//!
//! Every core function returns a [`VaultError`]; the CLI layer turns these
//! into messages and exit codes.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("unknown security profile '{0}'")]
    UnknownProfile(String),

    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("encryption failed")]
    EncryptionFailed,

    /// Wrong password and tampered data are deliberately indistinguishable.
    #[error("Invalid password or corrupted data")]
    AuthenticationFailed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid line {line}: {reason}: {content}")]
    InvalidLine {
        line: usize,
        reason: &'static str,
        content: String,
    },

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OS random generator unavailable")]
    Random,

    #[error("configuration error: {0}")]
    Config(String),
}

impl VaultError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        VaultError::MalformedEnvelope(reason.into())
    }
}
