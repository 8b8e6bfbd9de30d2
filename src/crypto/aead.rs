use super::{DerivedKey, IV_LEN, SALT_LEN, TAG_LEN};
use crate::error::{Result, VaultError};
use aes_gcm::{
    AesGcm, KeyInit,
    aead::{AeadInPlace, consts::U16, generic_array::GenericArray},
    aes::Aes256,
};
use getrandom::fill;
use zeroize::Zeroizing;

/// AES-256-GCM with a 128-bit IV.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| VaultError::Random)
}

/// Generate salt
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate a fresh IV; never reuse one with the same key.
pub fn generate_iv() -> Result<[u8; IV_LEN]> {
    let mut iv = [0u8; IV_LEN];
    secure_random(&mut iv)?;
    Ok(iv)
}

/// Encrypt plaintext, returning the ciphertext and detached tag.
pub fn encrypt(
    key: &DerivedKey,
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_LEN])> {
    let cipher = Aes256Gcm16::new(GenericArray::from_slice(key.as_bytes()));

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), b"", &mut buffer)
        .map_err(|_| VaultError::EncryptionFailed)?;

    let mut detached = [0u8; TAG_LEN];
    detached.copy_from_slice(&tag);
    Ok((buffer, detached))
}

/// Decrypt ciphertext. Fails closed: nothing is returned unless the tag
/// verifies.
pub fn decrypt(
    key: &DerivedKey,
    iv: &[u8; IV_LEN],
    tag: &[u8; TAG_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm16::new(GenericArray::from_slice(key.as_bytes()));

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(iv),
            b"",
            buffer.as_mut_slice(),
            GenericArray::from_slice(tag),
        )
        .map_err(|_| VaultError::AuthenticationFailed)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::{cheap_params, derive_key};

    fn test_key(password: &str) -> DerivedKey {
        derive_key(password, &[9u8; SALT_LEN], cheap_params()).unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key("pw");
        let iv = generate_iv().unwrap();

        let (ciphertext, tag) = encrypt(&key, &iv, b"A=1\nB=2").unwrap();
        let plaintext = decrypt(&key, &iv, &tag, &ciphertext).unwrap();

        assert_eq!(plaintext.as_slice(), b"A=1\nB=2");
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let key = test_key("pw");
        let iv = generate_iv().unwrap();

        let (ciphertext, tag) = encrypt(&key, &iv, b"").unwrap();
        assert!(ciphertext.is_empty());
        assert!(decrypt(&key, &iv, &tag, &ciphertext).unwrap().is_empty());
    }

    #[test]
    fn ciphertext_length_matches_plaintext() {
        let key = test_key("pw");
        let iv = generate_iv().unwrap();
        let (ciphertext, _) = encrypt(&key, &iv, &[0u8; 100]).unwrap();
        assert_eq!(ciphertext.len(), 100);
    }

    #[test]
    fn wrong_key_fails() {
        let iv = generate_iv().unwrap();
        let (ciphertext, tag) = encrypt(&test_key("correct"), &iv, b"secret").unwrap();

        assert!(matches!(
            decrypt(&test_key("wrong"), &iv, &tag, &ciphertext),
            Err(VaultError::AuthenticationFailed)
        ));
    }

    #[test]
    fn any_flipped_bit_is_detected() {
        let key = test_key("pw");
        let iv = generate_iv().unwrap();
        let (ciphertext, tag) = encrypt(&key, &iv, b"TOKEN=abc").unwrap();

        for bit in 0..8 {
            let mut c = ciphertext.clone();
            c[0] ^= 1 << bit;
            assert!(decrypt(&key, &iv, &tag, &c).is_err());

            let mut t = tag;
            t[TAG_LEN - 1] ^= 1 << bit;
            assert!(decrypt(&key, &iv, &t, &ciphertext).is_err());

            let mut i = iv;
            i[bit] ^= 1;
            assert!(decrypt(&key, &i, &tag, &ciphertext).is_err());
        }
    }

    #[test]
    fn random_material_differs() {
        assert_ne!(generate_iv().unwrap(), generate_iv().unwrap());
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }
}
