mod config;
mod crypto;
mod dotenv;
mod error;
mod format;
mod profile;
mod storage;

pub use crate::config::{CONFIG_FILE, ConfigMap, DEFAULT_ENV, EnvConfig, create_template};
pub use crate::crypto::KdfParams;
pub use crate::dotenv::{Reconciliation, SecretMap, reconcile_with_report};
pub use crate::error::{Result, VaultError};
pub use crate::format::{CURRENT_VERSION, Envelope, EnvelopeV2, LegacyEnvelope, Payload};
pub use crate::profile::{Profile, ProfileRegistry};
pub use crate::storage::Storage;

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::{Zeroize, Zeroizing};

/// Seals `.env` text with a password into v2 envelope text.
///
/// Salt and IV are fresh per call; the derived key is scrubbed before this
/// returns, on success or failure.
pub fn seal(plaintext: &str, password: &str, profile: &Profile) -> Result<String> {
    let kdf = profile.kdf();
    let salt = crypto::generate_salt()?;
    let iv = crypto::generate_iv()?;

    let key = crypto::derive_key(password, &salt, kdf)?;
    let (ciphertext, tag) = crypto::encrypt(&key, &iv, plaintext.as_bytes())?;
    drop(key);

    let envelope = Envelope::V2(EnvelopeV2::new(
        profile.name(),
        kdf,
        Payload {
            salt,
            iv,
            tag,
            ciphertext,
        },
    ));
    envelope.serialize()
}

/// Opens envelope text (v2 or legacy v1) with a password.
///
/// The key is re-derived from the parameters recorded in the envelope.
///
/// # Errors
///
/// [`VaultError::AuthenticationFailed`] covers both a wrong password and
/// tampered data. Format problems are reported before any key derivation.
pub fn open(envelope_text: &str, password: &str) -> Result<Zeroizing<String>> {
    let envelope = Envelope::parse(envelope_text)?;
    let payload = envelope.payload();

    let key = crypto::derive_key(password, &payload.salt, envelope.kdf())?;
    let mut plaintext = crypto::decrypt(&key, &payload.iv, &payload.tag, &payload.ciphertext)?;
    drop(key);

    match String::from_utf8(std::mem::take(&mut *plaintext)) {
        Ok(text) => Ok(Zeroizing::new(text)),
        Err(e) => {
            e.into_bytes().zeroize();
            Err(VaultError::malformed("sealed plaintext is not UTF-8"))
        }
    }
}

/// Parses `.env` text into an ordered map.
pub fn parse_secrets(text: &str) -> Result<SecretMap> {
    dotenv::parse(text)
}

/// Renders a map back to `.env` text.
pub fn render_secrets(map: &SecretMap) -> String {
    dotenv::stringify(map)
}

/// Merges two maps; `remote` wins every conflict.
pub fn reconcile(local: &SecretMap, remote: &SecretMap) -> SecretMap {
    dotenv::reconcile(local, remote)
}

/// Outcome of [`Workspace::lock`].
#[derive(Debug)]
pub struct LockReport {
    pub secrets: usize,
    pub profile: String,
    pub output: PathBuf,
    pub gitignore_updated: bool,
}

/// What [`Workspace::sync`] did to the local file.
#[derive(Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Merged {
        overwritten: Vec<String>,
        added: Vec<String>,
    },
}

/// Outcome of [`Workspace::sync`].
#[derive(Debug)]
pub struct SyncReport {
    pub keys: usize,
    pub source: PathBuf,
    pub outcome: SyncOutcome,
}

/// A project directory with one resolved environment.
pub struct Workspace {
    root: PathBuf,
    env: EnvConfig,
    registry: ProfileRegistry,
}

impl Workspace {
    /// Resolves `env_name` from the project's configuration file.
    pub fn load(root: impl Into<PathBuf>, env_name: &str) -> anyhow::Result<Self> {
        let root = root.into();
        let env = config::load(&root)?.environment(env_name)?;
        debug!(env = env_name, root = %root.display(), "resolved environment");
        Ok(Self::new(root, env))
    }

    pub fn new(root: impl Into<PathBuf>, env: EnvConfig) -> Self {
        Self {
            root: root.into(),
            env,
            registry: ProfileRegistry::builtin(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn env(&self) -> &EnvConfig {
        &self.env
    }

    fn source(&self) -> Storage {
        Storage::new(self.root.join(&self.env.source))
    }

    fn output(&self) -> Storage {
        Storage::new(self.root.join(&self.env.output))
    }

    /// Fails unless there is a source file to lock. Run before asking for a
    /// password.
    pub fn check_lock(&self) -> anyhow::Result<()> {
        if !self.source().exists() {
            anyhow::bail!("no {} file found to encrypt", self.env.source.display());
        }
        Ok(())
    }

    /// Fails unless there is a sealed output file to sync from.
    pub fn check_sync(&self) -> anyhow::Result<()> {
        if !self.output().exists() {
            anyhow::bail!("no {} file found", self.env.output.display());
        }
        Ok(())
    }

    /// Seals the source file into the output file and keeps the source
    /// out of Git.
    pub fn lock(&self, password: &str) -> anyhow::Result<LockReport> {
        use anyhow::Context;

        self.check_lock()?;
        let source = self.source();

        let profile = self.registry.get(&self.env.security)?;

        let raw = Zeroizing::new(source.load()?);
        let secrets = parse_secrets(&raw)
            .with_context(|| format!("{} is not a valid env file", self.env.source.display()))?
            .len();

        info!(profile = profile.name(), "deriving key");
        let sealed = seal(&raw, password, profile)?;

        let output = self.output();
        output
            .save(&sealed)
            .with_context(|| format!("failed to write {}", output.path().display()))?;
        debug!(path = %output.path().display(), secrets, "wrote envelope");

        let gitignore_updated = storage::ensure_gitignored(&self.root, &self.env.source)?;
        if gitignore_updated {
            info!(file = %self.env.source.display(), "added to .gitignore");
        }

        Ok(LockReport {
            secrets,
            profile: profile.name().to_string(),
            output: self.env.output.clone(),
            gitignore_updated,
        })
    }

    /// Opens the output file and merges it into the source file, remote
    /// values winning.
    pub fn sync(&self, password: &str) -> anyhow::Result<SyncReport> {
        use anyhow::Context;

        self.check_sync()?;
        let output = self.output();

        let sealed = output.load()?;
        info!("deriving key");
        let plaintext = open(&sealed, password)?;
        let remote = parse_secrets(&plaintext).context("decrypted content is not a valid env file")?;

        let source = self.source();
        let (merged, outcome) = match source.load_if_exists()? {
            None => (remote, SyncOutcome::Created),
            Some(local_raw) => {
                let local_raw = Zeroizing::new(local_raw);
                let local = parse_secrets(&local_raw).with_context(|| {
                    format!("{} is not a valid env file", self.env.source.display())
                })?;
                let report = reconcile_with_report(&local, &remote);
                for key in &report.overwritten {
                    debug!(key = %key, "local value replaced by encrypted value");
                }
                (
                    report.merged,
                    SyncOutcome::Merged {
                        overwritten: report.overwritten,
                        added: report.added,
                    },
                )
            }
        };

        let rendered = Zeroizing::new(render_secrets(&merged));
        source
            .save(&rendered)
            .with_context(|| format!("failed to write {}", source.path().display()))?;
        debug!(path = %source.path().display(), keys = merged.len(), "wrote env file");

        Ok(SyncReport {
            keys: merged.len(),
            source: self.env.source.clone(),
            outcome,
        })
    }
}
