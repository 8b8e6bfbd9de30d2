//! Named Argon2 cost presets.

use crate::crypto::KdfParams;
use crate::error::{Result, VaultError};

/// A named set of key-derivation work factors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    kdf: KdfParams,
}

impl Profile {
    pub fn new(name: impl Into<String>, kdf: KdfParams) -> Self {
        Self {
            name: name.into(),
            kdf,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }
}

/// Read-only lookup table of profiles, built once and passed by reference.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<Profile>,
}

impl ProfileRegistry {
    pub const LIGHT: &'static str = "light";
    pub const HEAVY: &'static str = "heavy";

    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                // CI/CD and frequent locking
                Profile::new(Self::LIGHT, KdfParams::from_raw(64 * 1024, 3, 1)),
                // long-term storage, high-value keys
                Profile::new(Self::HEAVY, KdfParams::from_raw(256 * 1024, 10, 4)),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| VaultError::UnknownProfile(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name())
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_resolve() {
        let registry = ProfileRegistry::builtin();

        let light = registry.get("light").unwrap();
        assert_eq!(light.kdf().time_cost(), 3);
        assert_eq!(light.kdf().mem_cost_kib(), 65536);
        assert_eq!(light.kdf().parallelism(), 1);

        let heavy = registry.get("heavy").unwrap();
        assert_eq!(heavy.kdf().time_cost(), 10);
        assert_eq!(heavy.kdf().mem_cost_kib(), 262144);
        assert_eq!(heavy.kdf().parallelism(), 4);
    }

    #[test]
    fn builtin_params_are_valid() {
        for profile in &ProfileRegistry::builtin().profiles {
            profile.kdf().validate().unwrap();
        }
    }

    #[test]
    fn light_matches_legacy_params() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.get("light").unwrap().kdf(), KdfParams::LEGACY);
    }

    #[test]
    fn unknown_profile_fails() {
        match ProfileRegistry::builtin().get("paranoid") {
            Err(VaultError::UnknownProfile(name)) => assert_eq!(name, "paranoid"),
            other => panic!("expected UnknownProfile, got: {other:?}"),
        }
    }

    #[test]
    fn names_lists_builtins() {
        let registry = ProfileRegistry::builtin();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["light", "heavy"]);
    }
}
