//! Vault error types.
//!
//! Every subsystem surfaces failures through [`VaultError`], the single error
//! type returned by the public API of this crate. Messages never carry
//! passwords, keys, derived material or ciphertext: only lengths, ids and
//! short reasons.

/// Unified error type for the Lockbox credential vault.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    // -- Encoding -----------------------------------------------------------
    /// A persisted hex field has odd length or non-hex characters.
    #[error("malformed hex field: {0}")]
    Decode(#[from] hex::FromHexError),

    // -- Crypto errors ------------------------------------------------------
    /// A cipher key of the wrong length was supplied.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKey { expected: usize, actual: usize },

    /// Encryption failed inside the AEAD primitive.
    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// Decryption failed (wrong key, tampered record, malformed IV).
    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    /// The operating system CSPRNG refused to produce bytes.
    #[error("system random generator failed")]
    Random,

    // -- Unlock protocol ----------------------------------------------------
    /// The master password did not match the stored record.
    #[error("wrong master password")]
    Authentication,

    /// The vault is initialized but holds no wrapped master key.
    #[error("no master key stored in vault")]
    MasterKeyNotFound,

    // -- Store errors -------------------------------------------------------
    /// An expected row is missing or cannot be parsed.
    #[error("vault storage corrupt: {reason}")]
    StorageCorrupt { reason: String },

    /// The database was written by an unsupported schema version.
    #[error("unsupported vault schema version: {found:?}")]
    SchemaVersion { found: String },

    /// The requested service, login or binding does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// SQLite error from `rusqlite`.
    #[error("storage error: {0}")]
    StorageIo(#[from] rusqlite::Error),

    // -- Collaborators ------------------------------------------------------
    /// A password generation policy cannot produce any password.
    #[error("invalid password policy: {reason}")]
    InvalidPolicy { reason: String },

    /// The configuration file is unreadable or has invalid values.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// Reading from the prompt collaborator failed or was rejected.
    #[error("prompt failed: {reason}")]
    Prompt { reason: String },

    /// I/O error from the filesystem or terminal.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Whether the error must end the current session.
    ///
    /// Only a password mismatch can be corrected by the user; everything else
    /// aborts the unlock attempt or the in-progress write.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Authentication)
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::StorageCorrupt {
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the vault crate.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_authentication_is_recoverable() {
        assert!(!VaultError::Authentication.is_fatal());
        assert!(VaultError::MasterKeyNotFound.is_fatal());
        assert!(VaultError::corrupt("missing row").is_fatal());
        assert!(
            VaultError::SchemaVersion {
                found: "0.1".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn messages_carry_no_payload() {
        let err = VaultError::InvalidKey {
            expected: 16,
            actual: 32,
        };
        assert_eq!(err.to_string(), "invalid key length: expected 16 bytes, got 32");
        assert_eq!(VaultError::Authentication.to_string(), "wrong master password");
    }
}
