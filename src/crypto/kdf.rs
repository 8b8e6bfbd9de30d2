use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use super::{KEY_LEN, SALT_LEN};
use crate::error::{Result, VaultError};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl KdfParams {
    /// Parameters hard-coded by `v1:` envelopes, which never recorded them.
    pub const LEGACY: KdfParams = KdfParams {
        mem_cost_kib: 64 * 1024,
        time_cost: 3,
        parallelism: 1,
    };

    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub(crate) const fn from_raw(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        }
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    /// Rejects zero values only; Argon2 checks the rest at derivation.
    pub fn validate(&self) -> Result<()> {
        if self.mem_cost_kib == 0 {
            return Err(VaultError::KeyDerivationFailed(
                "argon2 memory cost must be positive".into(),
            ));
        }
        if self.time_cost == 0 {
            return Err(VaultError::KeyDerivationFailed(
                "argon2 time cost must be positive".into(),
            ));
        }
        if self.parallelism == 0 {
            return Err(VaultError::KeyDerivationFailed(
                "argon2 parallelism must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// A 32-byte key, scrubbed when dropped.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

pub fn derive_key(password: &str, salt: &[u8; SALT_LEN], kdf: KdfParams) -> Result<DerivedKey> {
    kdf.validate()?;

    let params = Params::new(
        kdf.mem_cost_kib,
        kdf.time_cost,
        kdf.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key[..])
        .map_err(|e| VaultError::KeyDerivationFailed(format!("argon2 failed: {e}")))?;

    Ok(DerivedKey(key))
}

#[cfg(test)]
pub(crate) fn cheap_params() -> KdfParams {
    KdfParams::from_raw(1024, 1, 1)
}
