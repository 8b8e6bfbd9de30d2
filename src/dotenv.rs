//! `.env` text parsing, rendering and reconciliation.

use std::collections::HashMap;

use tracing::debug;
use zeroize::Zeroize;

use crate::error::{Result, VaultError};

/// Ordered key -> value mapping of secrets.
///
/// Iteration follows first insertion. Re-inserting a key replaces its value
/// in place. Values are scrubbed when the map is dropped.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct SecretMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl SecretMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Inserts or overwrites `key`, scrubbing any previous value.
    ///
    /// Returns `true` if a value was replaced.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.insert(key, value) {
            Some(mut previous) => {
                previous.zeroize();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&i| self.entries[i].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for SecretMap {
    fn drop(&mut self) {
        for (_, value) in self.entries.iter_mut() {
            value.zeroize();
        }
    }
}

impl std::fmt::Debug for SecretMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretMap")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SecretMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Parses `.env` text.
///
/// Blank lines and `#` comments are skipped. Every other line needs a `=`;
/// only the first one splits. One matching pair of `'` or `"` around the
/// whole value is removed. A repeated key keeps its first position and takes
/// the last value.
///
/// # Errors
///
/// Returns [`VaultError::InvalidLine`] with the 1-based line number for a
/// line without `=` or with an empty key.
pub fn parse(text: &str) -> Result<SecretMap> {
    let mut map = SecretMap::new();

    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let invalid = |reason| VaultError::InvalidLine {
            line: i + 1,
            reason,
            content: line.to_string(),
        };

        let (raw_key, raw_value) = trimmed.split_once('=').ok_or_else(|| invalid("missing '='"))?;

        let key = raw_key.trim();
        if key.is_empty() {
            return Err(invalid("empty key"));
        }

        if map.set(key, unquote(raw_value.trim()).trim()) {
            debug!(line = i + 1, key, "duplicate key, later value kept");
        }
    }

    Ok(map)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Renders `key=value` lines in map order, without a trailing newline.
pub fn stringify(map: &SecretMap) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of reconciling a local map with a remote one.
#[derive(Debug)]
pub struct Reconciliation {
    pub merged: SecretMap,
    /// Local keys whose differing value was replaced by the remote one.
    pub overwritten: Vec<String>,
    /// Keys that only existed remotely.
    pub added: Vec<String>,
}

/// Merges `remote` into `local`; remote wins every conflict.
///
/// Local keys keep their order, remote-only keys follow in remote order.
pub fn reconcile(local: &SecretMap, remote: &SecretMap) -> SecretMap {
    reconcile_with_report(local, remote).merged
}

/// Same policy as [`reconcile`], but reports which keys were overwritten or
/// added so callers can surface discarded local edits.
pub fn reconcile_with_report(local: &SecretMap, remote: &SecretMap) -> Reconciliation {
    let mut merged = local.clone();
    let mut overwritten = Vec::new();
    let mut added = Vec::new();

    for (key, value) in remote.iter() {
        match merged.insert(key, value) {
            Some(mut previous) => {
                if previous != value {
                    overwritten.push(key.to_string());
                }
                previous.zeroize();
            }
            None => added.push(key.to_string()),
        }
    }

    Reconciliation {
        merged,
        overwritten,
        added,
    }
}
