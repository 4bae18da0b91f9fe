//! Local encrypted credential vault.
//!
//! Per-service login/secret pairs are encrypted under a random 128-bit master
//! key. The master key is stored only in wrapped form, encrypted under a key
//! derived from the master password, and the master password itself is
//! persisted only as a salted hash of a salted hash.
//!
//! # Modules
//!
//! - [`codec`]: hex text form of every persisted binary field.
//! - [`kdf`]: PBKDF2-HMAC-SHA256 derivation and salts.
//! - [`crypto`]: AES-128-GCM record encryption, system randomness.
//! - [`password`]: two-stage master-password hashing and verification.
//! - [`keys`]: master-key generation, wrapping and unwrapping.
//! - [`store`]: SQLite persistence of services, logins, secrets, bindings.
//! - [`session`]: startup protocol and the [`UnlockedSession`].
//! - [`generator`]: random password generation.
//! - [`config`]: TOML configuration.
//! - [`prompt`]: the [`Prompter`] input seam.
//! - [`error`]: unified error type.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use lockbox_vault::prompt::TerminalPrompter;
//! use lockbox_vault::{VaultStore, session};
//! use secrecy::{ExposeSecret, SecretString};
//!
//! # fn example() -> lockbox_vault::Result<()> {
//! let store = VaultStore::open("data/lockbox.db", Duration::from_secs(30))?;
//! let session = session::unlock(&store, &mut TerminalPrompter::new(), 1)?;
//!
//! let ids = session.add_entry("example.com", "alice", &SecretString::from("p@ss1".to_string()))?;
//! let secret = session.secret(ids.service_id, ids.login_id)?;
//! assert_eq!(secret.expose_secret(), "p@ss1");
//!
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod generator;
pub mod kdf;
pub mod keys;
pub mod password;
pub mod prompt;
pub mod session;
pub mod store;

pub use config::VaultConfig;
pub use crypto::EncryptedRecord;
pub use error::{Result, VaultError};
pub use generator::PasswordPolicy;
pub use prompt::{Prompter, TerminalPrompter};
pub use session::{UnlockedSession, VaultState};
pub use store::{EntryIds, VaultStore};
