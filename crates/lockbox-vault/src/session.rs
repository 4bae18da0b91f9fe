//! Startup protocol and the unlocked session.
//!
//! [`unlock`] drives the vault from an opened [`VaultStore`] to an
//! [`UnlockedSession`]:
//!
//! ```text
//! check schema version ── unsupported ──> error (no prompt)
//!        │
//!   initialized? ── no ──> Initializing ──> Unlocked
//!        │
//!       yes ──> Authenticating ──> Unlocked
//!                      └─ wrong password (attempts exhausted) ──> Locked
//! ```
//!
//! The session owns the master key, the original salt and the in-memory
//! password record. All three are zeroed when the session is dropped, which
//! covers normal close, early return and unwinding alike.

use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::codec;
use crate::crypto::EncryptedRecord;
use crate::error::{Result, VaultError};
use crate::kdf::SALT_LEN;
use crate::keys::{self, MasterKey};
use crate::password::{self, FirstHash, StoredPasswordRecord};
use crate::prompt::Prompter;
use crate::store::{EntryIds, VaultStore};

/// Where the startup protocol currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    Uninitialized,
    Initializing,
    Authenticating,
    Unlocked,
    Locked,
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Authenticating => "authenticating",
            Self::Unlocked => "unlocked",
            Self::Locked => "locked",
        })
    }
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Run the startup protocol against `store`.
///
/// A fresh vault is initialized with a new master password (asked twice).
/// An initialized vault asks for the master password up to `max_attempts`
/// times, or once when the answer does not come from a person.
///
/// # Errors
///
/// - [`VaultError::SchemaVersion`] before any prompt if the stored schema is
///   unsupported.
/// - [`VaultError::Authentication`] once all attempts fail.
/// - [`VaultError::Prompt`] if the new password is empty or the two entries
///   differ.
/// - [`VaultError::StorageCorrupt`] / [`VaultError::MasterKeyNotFound`] for
///   missing or damaged metadata.
pub fn unlock<'s>(
    store: &'s VaultStore,
    prompter: &mut dyn Prompter,
    max_attempts: u32,
) -> Result<UnlockedSession<'s>> {
    store.check_schema_version()?;

    if !store.is_initialized()? {
        tracing::info!(state = %VaultState::Uninitialized, "no vault found");
        let password = prompt_new_password(prompter)?;
        return initialize(store, &password);
    }

    let (orig_salt, record) = load_password_record(store)?;
    tracing::debug!(state = %VaultState::Authenticating, "vault is initialized");

    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        let password = prompter.read_master_password("Master password: ")?;
        match open_session(store, &password, &orig_salt, &record) {
            Ok(session) => return Ok(session),
            Err(VaultError::Authentication) => {
                tracing::warn!(attempt, attempts, "wrong master password");
                if !prompter.last_answer_interactive() {
                    tracing::warn!("master password was not typed, not retrying");
                    break;
                }
            }
            Err(e) => return Err(e),
        }
    }

    tracing::warn!(state = %VaultState::Locked, "unlock attempts exhausted");
    Err(VaultError::Authentication)
}

fn prompt_new_password(prompter: &mut dyn Prompter) -> Result<SecretString> {
    let password = prompter.read_master_password("New master password: ")?;
    if password.expose_secret().is_empty() {
        return Err(VaultError::Prompt {
            reason: "empty master password not allowed".into(),
        });
    }
    let confirm = prompter.read_master_password("Confirm master password: ")?;
    if password.expose_secret() != confirm.expose_secret() {
        return Err(VaultError::Prompt {
            reason: "master passwords do not match".into(),
        });
    }
    Ok(password)
}

/// First-run initialization with `password`.
///
/// Writes the password record, the original salt and the wrapped master key
/// in one transaction, then returns the session holding the new key.
pub fn initialize<'s>(store: &'s VaultStore, password: &SecretString) -> Result<UnlockedSession<'s>> {
    tracing::info!(state = %VaultState::Initializing, "initializing vault");

    let first = password::hash_password(password)?;
    let record = password::build_stored_record(&first)?;
    let master_key = MasterKey::generate()?;
    let wrapped = keys::wrap_key(&master_key, &first)?;

    let orig_salt_hex = Zeroizing::new(codec::encode(first.salt()));
    store.initialize(&orig_salt_hex, &record, &wrapped)?;

    Ok(UnlockedSession::new(store, master_key, *first.salt(), record))
}

/// Unlock an initialized vault with `password` in a single attempt.
pub fn authenticate<'s>(
    store: &'s VaultStore,
    password: &SecretString,
) -> Result<UnlockedSession<'s>> {
    let (orig_salt, record) = load_password_record(store)?;
    open_session(store, password, &orig_salt, &record)
}

fn load_password_record(
    store: &VaultStore,
) -> Result<(Zeroizing<[u8; SALT_LEN]>, StoredPasswordRecord)> {
    let (salt_hex, record) = store
        .load_password_record()?
        .ok_or_else(|| VaultError::corrupt("vault is initialized but holds no password record"))?;
    let salt = Zeroizing::new(codec::decode_array::<SALT_LEN>(&salt_hex, "original salt")?);
    Ok((salt, record))
}

fn open_session<'s>(
    store: &'s VaultStore,
    password: &SecretString,
    orig_salt: &[u8; SALT_LEN],
    record: &StoredPasswordRecord,
) -> Result<UnlockedSession<'s>> {
    let candidate = FirstHash::rederive(password, orig_salt);
    if !password::verify(&candidate, record)? {
        return Err(VaultError::Authentication);
    }

    let wrapped = store.load_wrapped_key()?.ok_or(VaultError::MasterKeyNotFound)?;
    let master_key = keys::unwrap_key(&wrapped, &candidate)?;

    Ok(UnlockedSession::new(store, master_key, *orig_salt, record.clone()))
}

// ---------------------------------------------------------------------------
// Unlocked session
// ---------------------------------------------------------------------------

/// An unlocked vault. Holds the only copy of the master key.
pub struct UnlockedSession<'s> {
    store: &'s VaultStore,
    master_key: MasterKey,
    orig_salt: Zeroizing<[u8; SALT_LEN]>,
    record: StoredPasswordRecord,
}

impl<'s> UnlockedSession<'s> {
    fn new(
        store: &'s VaultStore,
        master_key: MasterKey,
        orig_salt: [u8; SALT_LEN],
        record: StoredPasswordRecord,
    ) -> Self {
        tracing::info!(state = %VaultState::Unlocked, "vault unlocked");
        Self {
            store,
            master_key,
            orig_salt: Zeroizing::new(orig_salt),
            record,
        }
    }

    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    /// Re-check `password` against the record held by this session, without
    /// touching storage.
    pub fn confirm_password(&self, password: &SecretString) -> Result<bool> {
        let candidate = FirstHash::rederive(password, &self.orig_salt);
        password::verify(&candidate, &self.record)
    }

    /// Store a new service with its first login and secret.
    pub fn add_entry(&self, service: &str, login: &str, secret: &SecretString) -> Result<EntryIds> {
        let login = self.master_key.seal(login.as_bytes())?;
        let secret = self.master_key.seal(secret.expose_secret().as_bytes())?;
        self.store.add_entry(service, &login, &secret)
    }

    /// Store another login and secret under an existing service.
    pub fn add_login(&self, service_id: i64, login: &str, secret: &SecretString) -> Result<EntryIds> {
        let login = self.master_key.seal(login.as_bytes())?;
        let secret = self.master_key.seal(secret.expose_secret().as_bytes())?;
        self.store.add_login(service_id, &login, &secret)
    }

    pub fn services(&self) -> Result<BTreeMap<i64, String>> {
        self.store.list_services()
    }

    /// Decrypted logins of `service_id`, keyed by login id.
    pub fn logins(&self, service_id: i64) -> Result<BTreeMap<i64, String>> {
        self.store
            .list_logins(service_id)?
            .into_iter()
            .map(|(id, record)| self.open_text(&record).map(|login| (id, login)))
            .collect()
    }

    pub fn login(&self, service_id: i64, login_id: i64) -> Result<String> {
        let record = self.store.get_login(service_id, login_id)?;
        self.open_text(&record)
    }

    /// The decrypted secret bound to `(service_id, login_id)`.
    pub fn secret(&self, service_id: i64, login_id: i64) -> Result<SecretString> {
        let record = self.store.get_secret(service_id, login_id)?;
        self.open_text(&record).map(SecretString::from)
    }

    pub fn replace_secret(&self, service_id: i64, login_id: i64, secret: &SecretString) -> Result<()> {
        let record = self.master_key.seal(secret.expose_secret().as_bytes())?;
        self.store.replace_secret(service_id, login_id, &record)
    }

    /// End the session. Key material is zeroed as the session is dropped.
    pub fn close(self) {
        tracing::info!("closing vault session");
    }

    fn open_text(&self, record: &EncryptedRecord) -> Result<String> {
        let plain = self.master_key.open(record)?;
        std::str::from_utf8(&plain)
            .map(str::to_owned)
            .map_err(|_| VaultError::corrupt("decrypted value is not valid UTF-8"))
    }
}

impl fmt::Debug for UnlockedSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedSession")
            .field("master_key", &self.master_key)
            .field("orig_salt", &"[REDACTED]")
            .field("record", &self.record)
            .finish()
    }
}

impl Drop for UnlockedSession<'_> {
    fn drop(&mut self) {
        tracing::debug!(state = %VaultState::Locked, "vault session ended, key material zeroed");
    }
}
