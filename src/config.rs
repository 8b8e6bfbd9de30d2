//! Project configuration (`lazy.config.json`).
//!
//! The file maps environment names to the files and profile to use:
//!
//! ```json
//! {
//!   "default":    { "source": ".env",      "output": ".env.enc",      "security": "light" },
//!   "production": { "source": ".env.prod", "output": ".env.prod.enc", "security": "heavy" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::storage::Storage;

/// Name of the configuration file in the project root.
pub const CONFIG_FILE: &str = "lazy.config.json";
/// Environment used when none is named.
pub const DEFAULT_ENV: &str = "default";

/// Files and profile for one environment. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub source: PathBuf,
    pub output: PathBuf,
    pub security: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from(".env"),
            output: PathBuf::from(".env.enc"),
            security: "light".to_string(),
        }
    }
}

/// All environments declared in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap {
    environments: BTreeMap<String, EnvConfig>,
}

impl ConfigMap {
    pub fn template() -> Self {
        let mut environments = BTreeMap::new();
        environments.insert(DEFAULT_ENV.to_string(), EnvConfig::default());
        environments.insert(
            "production".to_string(),
            EnvConfig {
                source: PathBuf::from(".env.prod"),
                output: PathBuf::from(".env.prod.enc"),
                security: "heavy".to_string(),
            },
        );
        Self { environments }
    }

    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| VaultError::Config(format!("failed to parse {CONFIG_FILE}: {e}")))
    }

    /// Resolves an environment. A missing `default` entry falls back to the
    /// built-in defaults; any other missing name is an error.
    pub fn environment(&self, name: &str) -> Result<EnvConfig> {
        match self.environments.get(name) {
            Some(env) => Ok(env.clone()),
            None if name == DEFAULT_ENV => Ok(EnvConfig::default()),
            None => Err(VaultError::Config(format!(
                "environment \"{name}\" not found in {CONFIG_FILE}"
            ))),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }
}

/// Loads `lazy.config.json` from `root`; a missing file means "all defaults".
pub fn load(root: &Path) -> Result<ConfigMap> {
    match Storage::new(root.join(CONFIG_FILE)).load_if_exists()? {
        Some(text) => ConfigMap::parse(&text),
        None => Ok(ConfigMap::default()),
    }
}

/// Writes the template configuration. Refuses to overwrite.
pub fn create_template(root: &Path) -> Result<PathBuf> {
    let storage = Storage::new(root.join(CONFIG_FILE));
    if storage.exists() {
        return Err(VaultError::Config(format!("{CONFIG_FILE} already exists")));
    }

    let text = serde_json::to_string_pretty(&ConfigMap::template())
        .map_err(|e| VaultError::Config(e.to_string()))?;
    storage.save(&text)?;

    Ok(storage.path().to_path_buf())
}
