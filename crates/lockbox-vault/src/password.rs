//! Master-password verification with a two-stage derivation.
//!
//! Stage 1 ([`FirstHash`]) turns the master password into 64 bytes of
//! material under a random salt. That material is never persisted: its first
//! 16 bytes wrap the master key. Stage 2 ([`StoredPasswordRecord`]) hashes
//! the textual form `salt1;hash1` of stage 1 under a second random salt, and
//! only that double hash is written to the database.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::codec;
use crate::crypto::KEY_LEN;
use crate::error::{Result, VaultError};
use crate::kdf::{self, SALT_LEN};

/// Byte length of both the stage-1 material and the stage-2 double hash.
pub const HASH_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Stage 1
// ---------------------------------------------------------------------------

/// Stage-1 hash of the master password. Zeroed on drop.
pub struct FirstHash {
    salt: [u8; SALT_LEN],
    material: Zeroizing<[u8; HASH_LEN]>,
}

impl FirstHash {
    /// Hash `password` under a fresh random salt.
    pub fn new(password: &SecretString) -> Result<Self> {
        let salt = kdf::generate_salt()?;
        Ok(Self::rederive(password, &salt))
    }

    /// Recompute the stage-1 hash for a password typed at unlock time, using
    /// the original salt loaded from storage.
    pub fn rederive(password: &SecretString, salt: &[u8; SALT_LEN]) -> Self {
        let mut material = Zeroizing::new([0u8; HASH_LEN]);
        kdf::derive_into(password.expose_secret().as_bytes(), salt, &mut *material);
        Self {
            salt: *salt,
            material,
        }
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// The 128-bit key that wraps the master key: the first bytes of the
    /// stage-1 material.
    pub fn wrapping_key(&self) -> &[u8] {
        &self.material[..KEY_LEN]
    }

    /// Textual form `salthex;materialhex` fed into stage 2.
    fn to_text(&self) -> Zeroizing<String> {
        let mut text = Zeroizing::new(String::with_capacity((SALT_LEN + HASH_LEN) * 2 + 1));
        text.push_str(&codec::encode(self.salt));
        text.push(';');
        let material = Zeroizing::new(codec::encode(&*self.material));
        text.push_str(&material);
        text
    }
}

impl Drop for FirstHash {
    fn drop(&mut self) {
        self.salt.zeroize();
    }
}

impl fmt::Debug for FirstHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirstHash")
            .field("salt", &codec::encode(self.salt))
            .field("material", &"[REDACTED]")
            .finish()
    }
}

/// Hash a new master password. Convenience for [`FirstHash::new`].
pub fn hash_password(password: &SecretString) -> Result<FirstHash> {
    FirstHash::new(password)
}

// ---------------------------------------------------------------------------
// Stage 2
// ---------------------------------------------------------------------------

/// The persisted double hash: hex salt plus hex stage-2 output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct StoredPasswordRecord {
    pub salt: String,
    pub double_hash: String,
}

impl fmt::Debug for StoredPasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredPasswordRecord")
            .field("salt", &self.salt)
            .field("double_hash", &"[REDACTED]")
            .finish()
    }
}

/// Build the persisted record for `first` under a new random salt.
pub fn build_stored_record(first: &FirstHash) -> Result<StoredPasswordRecord> {
    let salt = kdf::generate_salt()?;
    let text = first.to_text();
    let double_hash = kdf::derive(text.as_bytes(), &salt, HASH_LEN);

    Ok(StoredPasswordRecord {
        salt: codec::encode(salt),
        double_hash: codec::encode(&*double_hash),
    })
}

/// Check a candidate stage-1 hash against the stored record.
///
/// The comparison is constant time over the full stored length.
///
/// # Errors
///
/// Returns [`VaultError::Decode`] or [`VaultError::StorageCorrupt`] if the
/// stored record is malformed. A mismatch is `Ok(false)`, not an error.
pub fn verify(candidate: &FirstHash, stored: &StoredPasswordRecord) -> Result<bool> {
    let salt: [u8; SALT_LEN] = codec::decode_array(&stored.salt, "password record salt")?;
    let expected = Zeroizing::new(codec::decode(&stored.double_hash)?);
    if expected.len() != HASH_LEN {
        return Err(VaultError::corrupt(format!(
            "password record hash is {} bytes, expected {HASH_LEN}",
            expected.len()
        )));
    }

    let text = candidate.to_text();
    Ok(kdf::matches(text.as_bytes(), &salt, &expected))
}
