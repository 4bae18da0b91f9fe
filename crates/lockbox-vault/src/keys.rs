//! Master-key generation, wrapping and unwrapping.

use std::fmt;

use zeroize::Zeroizing;

use crate::crypto::{self, EncryptedRecord, KEY_LEN};
use crate::error::{Result, VaultError};
use crate::password::FirstHash;

/// The random 128-bit key that encrypts every login and secret.
///
/// Only ever persisted in wrapped form. Zeroed on drop.
pub struct MasterKey(Zeroizing<[u8; KEY_LEN]>);

impl MasterKey {
    /// Generate a fresh random master key.
    pub fn generate() -> Result<Self> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        crypto::fill_random(&mut *key)?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &*self.0
    }

    /// Encrypt `plaintext` under this key.
    pub fn seal(&self, plaintext: &[u8]) -> Result<EncryptedRecord> {
        crypto::encrypt(plaintext, self.as_bytes())
    }

    /// Decrypt a record sealed under this key.
    pub fn open(&self, record: &EncryptedRecord) -> Result<Zeroizing<Vec<u8>>> {
        crypto::decrypt(record, self.as_bytes())
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Wrap `key` under the password-derived key held by `first`.
pub fn wrap_key(key: &MasterKey, first: &FirstHash) -> Result<EncryptedRecord> {
    crypto::encrypt(key.as_bytes(), first.wrapping_key())
}

/// Recover the master key from its wrapped form.
///
/// # Errors
///
/// A wrapped key that fails authentication or does not decrypt to exactly
/// 16 bytes is reported as [`VaultError::StorageCorrupt`].
pub fn unwrap_key(wrapped: &EncryptedRecord, first: &FirstHash) -> Result<MasterKey> {
    let plain = crypto::decrypt(wrapped, first.wrapping_key()).map_err(|e| match e {
        VaultError::DecryptionFailed { .. } => VaultError::corrupt("wrapped master key"),
        other => other,
    })?;

    if plain.len() != KEY_LEN {
        return Err(VaultError::corrupt(format!(
            "wrapped master key decrypts to {} bytes, expected {KEY_LEN}",
            plain.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&plain);
    Ok(MasterKey(key))
}
