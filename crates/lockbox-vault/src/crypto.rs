//! AES-128-GCM record encryption and OS randomness using the `ring` crate.
//!
//! - **Records**: every call to [`encrypt`] draws a fresh random 96-bit IV
//!   and returns it next to the ciphertext as an [`EncryptedRecord`], the
//!   hex form that the store persists. The keystream is AES in counter mode;
//!   the trailing 128-bit GCM tag makes tampering with a stored IV or
//!   ciphertext detectable on [`decrypt`].
//! - **Keys**: exactly 128 bits. Any other length is rejected with
//!   [`VaultError::InvalidKey`] before `ring` is touched.
//! - **Random generation**: [`fill_random`] wraps `ring`'s system CSPRNG.

use ring::aead::{self, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use crate::codec;
use crate::error::{Result, VaultError};

/// Length of an AES-128 key in bytes.
pub const KEY_LEN: usize = 16;

/// Length of the per-record IV in bytes (96 bits).
pub const IV_LEN: usize = NONCE_LEN;

/// Length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

static AEAD_ALG: &aead::Algorithm = &aead::AES_128_GCM;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An encrypted payload as persisted: hex IV plus hex ciphertext (with tag).
///
/// Used for wrapped master keys, logins and secrets alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub iv: String,
    pub ciphertext: String,
}

impl EncryptedRecord {
    pub fn new(iv: impl Into<String>, ciphertext: impl Into<String>) -> Self {
        Self {
            iv: iv.into(),
            ciphertext: ciphertext.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` under the 128-bit `key` with a fresh random IV.
///
/// # Errors
///
/// Returns [`VaultError::InvalidKey`] if `key` is not [`KEY_LEN`] bytes, or
/// [`VaultError::Random`] if no IV could be drawn.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<EncryptedRecord> {
    let key = sealing_key(key)?;

    let mut iv = [0u8; IV_LEN];
    fill_random(&mut iv)?;

    let mut in_out = Zeroizing::new(plaintext.to_vec());
    key.seal_in_place_append_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut *in_out)
        .map_err(|_| VaultError::EncryptionFailed {
            reason: "seal_in_place failed".into(),
        })?;

    tracing::trace!(
        plaintext_len = plaintext.len(),
        ciphertext_len = in_out.len(),
        "encrypted record"
    );

    Ok(EncryptedRecord {
        iv: codec::encode(iv),
        ciphertext: codec::encode(&*in_out),
    })
}

/// Decrypt a record produced by [`encrypt`] under the same `key`.
///
/// The returned buffer is zeroed when dropped.
///
/// # Errors
///
/// Returns [`VaultError::InvalidKey`] for a wrong-length key,
/// [`VaultError::Decode`] for malformed hex, and
/// [`VaultError::DecryptionFailed`] when the IV has the wrong width or the
/// tag does not verify (wrong key or tampered record).
pub fn decrypt(record: &EncryptedRecord, key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let key = sealing_key(key)?;

    let iv = codec::decode(&record.iv)?;
    let nonce =
        Nonce::try_assume_unique_for_key(&iv).map_err(|_| VaultError::DecryptionFailed {
            reason: format!("IV is {} bytes, expected {IV_LEN}", iv.len()),
        })?;

    let mut in_out = Zeroizing::new(codec::decode(&record.ciphertext)?);
    let plaintext_len = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::DecryptionFailed {
            reason: "authentication failed, wrong key or corrupted record".into(),
        })?
        .len();
    in_out.truncate(plaintext_len);

    tracing::trace!(plaintext_len, "decrypted record");
    Ok(in_out)
}

fn sealing_key(key: &[u8]) -> Result<LessSafeKey> {
    if key.len() != KEY_LEN {
        return Err(VaultError::InvalidKey {
            expected: KEY_LEN,
            actual: key.len(),
        });
    }
    let unbound = UnboundKey::new(AEAD_ALG, key).map_err(|_| VaultError::InvalidKey {
        expected: KEY_LEN,
        actual: key.len(),
    })?;
    Ok(LessSafeKey::new(unbound))
}

// ---------------------------------------------------------------------------
// Random bytes
// ---------------------------------------------------------------------------

/// Fill `buf` from the system CSPRNG.
///
/// # Errors
///
/// Returns [`VaultError::Random`] if the generator fails.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    SystemRandom::new().fill(buf).map_err(|_| VaultError::Random)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        fill_random(&mut key).unwrap();
        key
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = random_key();
        let plaintext = b"hello, lockbox!";

        let record = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&record, &key).unwrap();

        assert_eq!(decrypted.as_slice(), plaintext);
    }

    #[test]
    fn empty_and_single_byte_roundtrip() {
        let key = random_key();
        for plaintext in [&b""[..], &b"x"[..]] {
            let record = encrypt(plaintext, &key).unwrap();
            assert_eq!(decrypt(&record, &key).unwrap().as_slice(), plaintext);
        }
    }

    #[test]
    fn large_plaintext_roundtrip() {
        let key = random_key();
        let plaintext = vec![0xAB_u8; 1_000_000];

        let record = encrypt(&plaintext, &key).unwrap();
        assert_eq!(*decrypt(&record, &key).unwrap(), plaintext);
    }

    #[test]
    fn key_with_leading_zero_bytes() {
        let mut key = random_key();
        key[..4].fill(0);
        let record = encrypt(b"zero-led key", &key).unwrap();
        assert_eq!(decrypt(&record, &key).unwrap().as_slice(), b"zero-led key");
    }

    #[test]
    fn ciphertext_is_plaintext_plus_tag() {
        let key = random_key();
        let record = encrypt(b"12345", &key).unwrap();
        assert_eq!(record.iv.len(), IV_LEN * 2);
        assert_eq!(record.ciphertext.len(), (5 + TAG_LEN) * 2);
    }

    #[test]
    fn same_input_gets_fresh_iv() {
        let key = random_key();
        let first = encrypt(b"same", &key).unwrap();
        let second = encrypt(b"same", &key).unwrap();

        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
        assert_eq!(decrypt(&first, &key).unwrap().as_slice(), b"same");
        assert_eq!(decrypt(&second, &key).unwrap().as_slice(), b"same");
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let record = encrypt(b"secret data", &random_key()).unwrap();
        let result = decrypt(&record, &random_key());
        assert!(matches!(result, Err(VaultError::DecryptionFailed { .. })));
    }

    #[test]
    fn tampered_ciphertext_detected() {
        let key = random_key();
        let mut record = encrypt(b"secret data", &key).unwrap();
        let mut bytes = codec::decode(&record.ciphertext).unwrap();
        bytes[0] ^= 0x01;
        record.ciphertext = codec::encode(&bytes);

        assert!(matches!(
            decrypt(&record, &key),
            Err(VaultError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn invalid_key_length_rejected() {
        for len in [0, 15, 17, 32] {
            let key = vec![0u8; len];
            assert!(matches!(
                encrypt(b"test", &key),
                Err(VaultError::InvalidKey { actual, .. }) if actual == len
            ));
        }
    }

    #[test]
    fn malformed_iv_rejected() {
        let key = random_key();
        let mut record = encrypt(b"test", &key).unwrap();
        record.iv = "00ff".into();
        assert!(matches!(
            decrypt(&record, &key),
            Err(VaultError::DecryptionFailed { .. })
        ));
        record.iv = "xyz".into();
        assert!(matches!(decrypt(&record, &key), Err(VaultError::Decode(_))));
    }
}
