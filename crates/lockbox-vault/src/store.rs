//! SQLite-backed persistence for the vault.
//!
//! [`VaultStore`] wraps a single `rusqlite::Connection` held for the lifetime
//! of the process. It never sees plaintext: logins and secrets arrive and
//! leave as [`EncryptedRecord`]s, and the password record and wrapped master
//! key are opaque hex strings.
//!
//! # Schema
//!
//! - `services`: plaintext service names.
//! - `logins` / `secrets`: encrypted login strings and passwords.
//! - `bindings`: `(service_id, login_id) -> secret_id`, one secret per pair.
//! - `vault_meta`: row 1 holds the password record (`salt` = original
//!   stage-1 salt, `iv` = stage-2 salt, `ciphertext` = double hash); row 2
//!   holds the wrapped master key (`salt` empty).
//! - `info`: singleton `initialized` flag and schema version.
//!
//! All statements are parameterized. Multi-row writes run in one transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};
use zeroize::Zeroizing;

use crate::crypto::EncryptedRecord;
use crate::error::{Result, VaultError};
use crate::password::StoredPasswordRecord;

/// Schema version written by this build.
pub const SCHEMA_VERSION: &str = "1";

/// Versions this build can open.
pub const ACCEPTED_VERSIONS: &[&str] = &[SCHEMA_VERSION];

/// Reported for an `info` table whose version cannot be read.
pub const UNKNOWN_VERSION: &str = "unknown";

const PASSWORD_RECORD_ID: i64 = 1;
const WRAPPED_KEY_ID: i64 = 2;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS services (
        id   INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS logins (
        id         INTEGER PRIMARY KEY,
        iv         TEXT NOT NULL,
        ciphertext TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS secrets (
        id         INTEGER PRIMARY KEY,
        iv         TEXT NOT NULL,
        ciphertext TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS bindings (
        service_id INTEGER NOT NULL REFERENCES services(id),
        login_id   INTEGER NOT NULL REFERENCES logins(id),
        secret_id  INTEGER NOT NULL REFERENCES secrets(id),
        PRIMARY KEY (service_id, login_id)
    );

    CREATE TABLE IF NOT EXISTS vault_meta (
        id         INTEGER PRIMARY KEY,
        salt       TEXT NOT NULL DEFAULT '',
        iv         TEXT NOT NULL,
        ciphertext TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS info (
        id          INTEGER PRIMARY KEY CHECK (id = 1),
        initialized INTEGER NOT NULL DEFAULT 0 CHECK (initialized IN (0, 1)),
        version     TEXT NOT NULL
    );
";

/// Ids allocated by one call to [`VaultStore::add_entry`] or
/// [`VaultStore::add_login`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryIds {
    pub service_id: i64,
    pub login_id: i64,
    pub secret_id: i64,
}

/// The vault database.
pub struct VaultStore {
    conn: Connection,
}

impl VaultStore {
    /// Open (or create) the vault database at `path`.
    ///
    /// An existing database is version-checked before anything is written to
    /// it: a file from an unsupported schema is refused with
    /// [`VaultError::SchemaVersion`] and left unchanged. Only
    /// then are the pragmas applied and missing tables created.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening vault database");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let store = Self { conn };
        store.check_existing()?;
        store.configure_connection()?;
        store.create_schema()?;

        tracing::debug!("vault database ready");
        Ok(store)
    }

    /// Open an in-memory vault database.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.configure_connection()?;
        store.create_schema()?;
        Ok(store)
    }

    /// Refuse a non-empty database unless its `info` table carries an
    /// accepted version. Read-only.
    fn check_existing(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            tracing::debug!("empty database, schema will be created");
            return Ok(());
        }

        let found = stored_version(&self.conn)?
            .ok_or_else(|| VaultError::corrupt("database has tables but no info table"))?;
        if ACCEPTED_VERSIONS.contains(&found.as_str()) {
            tracing::debug!(version = %found, "existing schema accepted");
            Ok(())
        } else {
            tracing::error!(version = %found, "refusing database with unsupported schema version");
            Err(VaultError::SchemaVersion { found })
        }
    }

    fn configure_connection(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }

    fn create_schema(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(SCHEMA)?;
        tx.execute(
            "INSERT OR IGNORE INTO info (id, initialized, version) VALUES (1, 0, ?1)",
            params![SCHEMA_VERSION],
        )?;
        tx.commit()?;
        Ok(())
    }

    // -- Metadata -----------------------------------------------------------

    /// The stored schema version string.
    pub fn schema_version(&self) -> Result<String> {
        self.conn
            .query_row("SELECT version FROM info WHERE id = 1", [], |row| row.get(0))
            .optional()?
            .ok_or_else(|| VaultError::corrupt("info row missing"))
    }

    /// Fail with [`VaultError::SchemaVersion`] unless the stored version is
    /// one this build accepts.
    pub fn check_schema_version(&self) -> Result<()> {
        let found = self.schema_version()?;
        if ACCEPTED_VERSIONS.contains(&found.as_str()) {
            tracing::debug!(version = %found, "schema version accepted");
            Ok(())
        } else {
            tracing::error!(version = %found, "unsupported schema version");
            Err(VaultError::SchemaVersion { found })
        }
    }

    pub fn is_initialized(&self) -> Result<bool> {
        self.conn
            .query_row("SELECT initialized FROM info WHERE id = 1", [], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?
            .map(|flag| flag == 1)
            .ok_or_else(|| VaultError::corrupt("info row missing"))
    }

    pub fn set_initialized(&self) -> Result<()> {
        mark_initialized(&self.conn)
    }

    /// Persist the first-run records and mark the vault initialized, all in
    /// one transaction.
    pub fn initialize(
        &self,
        orig_salt: &str,
        record: &StoredPasswordRecord,
        wrapped: &EncryptedRecord,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO vault_meta (id, salt, iv, ciphertext) VALUES (?1, ?2, ?3, ?4)",
            params![PASSWORD_RECORD_ID, orig_salt, record.salt, record.double_hash],
        )?;
        tx.execute(
            "INSERT INTO vault_meta (id, salt, iv, ciphertext) VALUES (?1, '', ?2, ?3)",
            params![WRAPPED_KEY_ID, wrapped.iv, wrapped.ciphertext],
        )?;
        mark_initialized(&tx)?;
        tx.commit()?;

        tracing::info!("vault initialized");
        Ok(())
    }

    /// Load the original stage-1 salt (hex, zeroed on drop) and the stored
    /// password record.
    pub fn load_password_record(
        &self,
    ) -> Result<Option<(Zeroizing<String>, StoredPasswordRecord)>> {
        let row = self
            .conn
            .query_row(
                "SELECT salt, iv, ciphertext FROM vault_meta WHERE id = ?1",
                params![PASSWORD_RECORD_ID],
                |row| {
                    Ok((
                        Zeroizing::new(row.get::<_, String>(0)?),
                        StoredPasswordRecord {
                            salt: row.get(1)?,
                            double_hash: row.get(2)?,
                        },
                    ))
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn load_wrapped_key(&self) -> Result<Option<EncryptedRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT iv, ciphertext FROM vault_meta WHERE id = ?1",
                params![WRAPPED_KEY_ID],
                |row| Ok(EncryptedRecord::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    // -- Entries ------------------------------------------------------------

    /// Service names keyed by id, ascending.
    pub fn list_services(&self) -> Result<BTreeMap<i64, String>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM services ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        let services = rows.collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
        tracing::debug!(count = services.len(), "listed services");
        Ok(services)
    }

    /// Encrypted logins bound to `service_id`, keyed by login id.
    pub fn list_logins(&self, service_id: i64) -> Result<BTreeMap<i64, EncryptedRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.iv, l.ciphertext
             FROM bindings b JOIN logins l ON l.id = b.login_id
             WHERE b.service_id = ?1
             ORDER BY l.id",
        )?;
        let rows = stmt.query_map(params![service_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                EncryptedRecord::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
            ))
        })?;
        let logins = rows.collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
        tracing::debug!(service_id, count = logins.len(), "listed logins");
        Ok(logins)
    }

    /// Insert a new service with one login and its secret.
    pub fn add_entry(
        &self,
        service_name: &str,
        login: &EncryptedRecord,
        secret: &EncryptedRecord,
    ) -> Result<EntryIds> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("INSERT INTO services (name) VALUES (?1)", params![service_name])?;
        let service_id = tx.last_insert_rowid();
        let ids = insert_binding(&tx, service_id, login, secret)?;
        tx.commit()?;

        tracing::info!(
            service_id = ids.service_id,
            login_id = ids.login_id,
            secret_id = ids.secret_id,
            "added entry"
        );
        Ok(ids)
    }

    /// Insert another login and secret under an existing service.
    pub fn add_login(
        &self,
        service_id: i64,
        login: &EncryptedRecord,
        secret: &EncryptedRecord,
    ) -> Result<EntryIds> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM services WHERE id = ?1)",
            params![service_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(VaultError::NotFound {
                entity: "service",
                id: service_id.to_string(),
            });
        }
        let ids = insert_binding(&tx, service_id, login, secret)?;
        tx.commit()?;

        tracing::info!(service_id, login_id = ids.login_id, "added login");
        Ok(ids)
    }

    /// The encrypted login bound under `service_id`.
    pub fn get_login(&self, service_id: i64, login_id: i64) -> Result<EncryptedRecord> {
        self.conn
            .query_row(
                "SELECT l.iv, l.ciphertext
                 FROM bindings b JOIN logins l ON l.id = b.login_id
                 WHERE b.service_id = ?1 AND b.login_id = ?2",
                params![service_id, login_id],
                |row| Ok(EncryptedRecord::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?
            .ok_or_else(|| binding_not_found(service_id, login_id))
    }

    /// The encrypted secret bound to `(service_id, login_id)`.
    pub fn get_secret(&self, service_id: i64, login_id: i64) -> Result<EncryptedRecord> {
        let secret = self
            .conn
            .query_row(
                "SELECT s.iv, s.ciphertext
                 FROM bindings b JOIN secrets s ON s.id = b.secret_id
                 WHERE b.service_id = ?1 AND b.login_id = ?2",
                params![service_id, login_id],
                |row| Ok(EncryptedRecord::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?
            .ok_or_else(|| binding_not_found(service_id, login_id))?;

        tracing::debug!(service_id, login_id, "loaded secret");
        Ok(secret)
    }

    /// Overwrite the secret reached through the existing binding. The binding
    /// and login rows are left untouched.
    pub fn replace_secret(
        &self,
        service_id: i64,
        login_id: i64,
        secret: &EncryptedRecord,
    ) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE secrets SET iv = ?1, ciphertext = ?2
             WHERE id = (SELECT secret_id FROM bindings WHERE service_id = ?3 AND login_id = ?4)",
            params![secret.iv, secret.ciphertext, service_id, login_id],
        )?;
        if rows == 0 {
            return Err(binding_not_found(service_id, login_id));
        }

        tracing::info!(service_id, login_id, "replaced secret");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Version recorded in an existing `info` table, whatever its layout.
///
/// `None` when there is no `info` table. A table without a readable
/// `version` column reports [`UNKNOWN_VERSION`].
fn stored_version(conn: &Connection) -> Result<Option<String>> {
    let has_info: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'info')",
        [],
        |row| row.get(0),
    )?;
    if !has_info {
        return Ok(None);
    }

    let Ok(mut stmt) = conn.prepare("SELECT version FROM info LIMIT 1") else {
        return Ok(Some(UNKNOWN_VERSION.to_string()));
    };
    let value = stmt
        .query_row([], |row| row.get::<_, Value>(0))
        .optional()?
        .ok_or_else(|| VaultError::corrupt("info row missing"))?;

    Ok(Some(match value {
        Value::Text(text) => text,
        Value::Integer(n) => n.to_string(),
        Value::Real(n) => n.to_string(),
        Value::Null | Value::Blob(_) => UNKNOWN_VERSION.to_string(),
    }))
}

fn mark_initialized(conn: &Connection) -> Result<()> {
    let rows = conn.execute("UPDATE info SET initialized = 1 WHERE id = 1", [])?;
    if rows == 0 {
        return Err(VaultError::corrupt("info row missing"));
    }
    Ok(())
}

fn insert_binding(
    conn: &Connection,
    service_id: i64,
    login: &EncryptedRecord,
    secret: &EncryptedRecord,
) -> Result<EntryIds> {
    conn.execute(
        "INSERT INTO logins (iv, ciphertext) VALUES (?1, ?2)",
        params![login.iv, login.ciphertext],
    )?;
    let login_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO secrets (iv, ciphertext) VALUES (?1, ?2)",
        params![secret.iv, secret.ciphertext],
    )?;
    let secret_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO bindings (service_id, login_id, secret_id) VALUES (?1, ?2, ?3)",
        params![service_id, login_id, secret_id],
    )?;

    Ok(EntryIds {
        service_id,
        login_id,
        secret_id,
    })
}

fn binding_not_found(service_id: i64, login_id: i64) -> VaultError {
    VaultError::NotFound {
        entity: "binding",
        id: format!("{service_id}/{login_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: &str) -> EncryptedRecord {
        EncryptedRecord::new(format!("{tag}-iv"), format!("{tag}-ct"))
    }

    fn password_record() -> StoredPasswordRecord {
        StoredPasswordRecord {
            salt: "aa".repeat(16),
            double_hash: "bb".repeat(64),
        }
    }

    #[test]
    fn fresh_store_is_uninitialized_current_version() {
        let store = VaultStore::open_in_memory().unwrap();
        assert!(!store.is_initialized().unwrap());
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        store.check_schema_version().unwrap();
        assert!(store.load_password_record().unwrap().is_none());
        assert!(store.load_wrapped_key().unwrap().is_none());
    }

    #[test]
    fn initialize_writes_both_meta_rows() {
        let store = VaultStore::open_in_memory().unwrap();
        store
            .initialize(&"cc".repeat(16), &password_record(), &record("wrapped"))
            .unwrap();

        assert!(store.is_initialized().unwrap());
        let (orig_salt, loaded): (Zeroizing<String>, _) =
            store.load_password_record().unwrap().unwrap();
        assert_eq!(*orig_salt, "cc".repeat(16));
        assert_eq!(loaded, password_record());
        assert_eq!(store.load_wrapped_key().unwrap().unwrap(), record("wrapped"));
    }

    #[test]
    fn second_initialize_rolls_back() {
        let store = VaultStore::open_in_memory().unwrap();
        store.initialize("", &password_record(), &record("first")).unwrap();
        assert!(store.initialize("", &password_record(), &record("second")).is_err());
        assert_eq!(store.load_wrapped_key().unwrap().unwrap(), record("first"));
    }

    #[test]
    fn set_initialized_flips_flag() {
        let store = VaultStore::open_in_memory().unwrap();
        store.set_initialized().unwrap();
        assert!(store.is_initialized().unwrap());
    }

    #[test]
    fn unknown_version_rejected() {
        let store = VaultStore::open_in_memory().unwrap();
        store
            .conn()
            .execute("UPDATE info SET version = '0.1.1' WHERE id = 1", [])
            .unwrap();
        assert!(matches!(
            store.check_schema_version(),
            Err(VaultError::SchemaVersion { found }) if found == "0.1.1"
        ));
    }

    fn table_names(path: &Path) -> Vec<String> {
        let conn = Connection::open(path).unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<String>, _>>()
            .unwrap()
    }

    fn journal_mode(path: &Path) -> String {
        let conn = Connection::open(path).unwrap();
        conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn newer_schema_is_refused_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE info (id INTEGER PRIMARY KEY, initialized INTEGER, version TEXT);
                 INSERT INTO info VALUES (1, 1, '2');
                 CREATE TABLE entries_v2 (id INTEGER PRIMARY KEY, blob TEXT);",
            )
            .unwrap();
        }

        let result = VaultStore::open(&path, Duration::from_secs(5));
        assert!(matches!(
            result,
            Err(VaultError::SchemaVersion { ref found }) if found == "2"
        ));
        drop(result);

        assert_eq!(table_names(&path), vec!["entries_v2", "info"]);
        assert_eq!(journal_mode(&path), "delete");
    }

    #[test]
    fn legacy_info_layout_is_a_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pamaja.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE info (init INTEGER, version TEXT);
                 INSERT INTO info VALUES (1, '0.1.1');",
            )
            .unwrap();
        }

        let result = VaultStore::open(&path, Duration::from_secs(5));
        assert!(matches!(
            result,
            Err(VaultError::SchemaVersion { ref found }) if found == "0.1.1"
        ));
        drop(result);

        assert_eq!(table_names(&path), vec!["info"]);
        assert_eq!(journal_mode(&path), "delete");
    }

    #[test]
    fn info_without_version_column_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE info (init INTEGER); INSERT INTO info VALUES (1);")
                .unwrap();
        }

        assert!(matches!(
            VaultStore::open(&path, Duration::from_secs(5)),
            Err(VaultError::SchemaVersion { found }) if found == UNKNOWN_VERSION
        ));
    }

    #[test]
    fn foreign_database_without_info_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY);").unwrap();
        }

        assert!(matches!(
            VaultStore::open(&path, Duration::from_secs(5)),
            Err(VaultError::StorageCorrupt { .. })
        ));
        assert_eq!(table_names(&path), vec!["notes"]);
    }

    #[test]
    fn initialize_and_set_initialized_share_the_flag_update() {
        let store = VaultStore::open_in_memory().unwrap();
        store.conn().execute("DELETE FROM info", []).unwrap();

        assert!(matches!(
            store.set_initialized(),
            Err(VaultError::StorageCorrupt { .. })
        ));
        assert!(matches!(
            store.initialize("", &password_record(), &record("wrapped")),
            Err(VaultError::StorageCorrupt { .. })
        ));
        assert!(store.load_wrapped_key().unwrap().is_none());
    }

    #[test]
    fn add_entry_allocates_increasing_ids() {
        let store = VaultStore::open_in_memory().unwrap();
        let first = store.add_entry("example.com", &record("l1"), &record("s1")).unwrap();
        let second = store.add_entry("example.org", &record("l2"), &record("s2")).unwrap();

        assert_eq!(first.service_id, 1);
        assert_eq!(second.service_id, 2);
        assert!(second.login_id > first.login_id);
        assert!(second.secret_id > first.secret_id);

        let services = store.list_services().unwrap();
        assert_eq!(
            services.into_iter().collect::<Vec<_>>(),
            vec![(1, "example.com".to_string()), (2, "example.org".to_string())]
        );
    }

    #[test]
    fn list_logins_returns_every_bound_login() {
        let store = VaultStore::open_in_memory().unwrap();
        let ids = store.add_entry("example.com", &record("alice"), &record("s1")).unwrap();
        let bob = store.add_login(ids.service_id, &record("bob"), &record("s2")).unwrap();
        store.add_entry("other", &record("carol"), &record("s3")).unwrap();

        let logins = store.list_logins(ids.service_id).unwrap();
        assert_eq!(logins.len(), 2);
        assert_eq!(logins[&ids.login_id], record("alice"));
        assert_eq!(logins[&bob.login_id], record("bob"));
        assert!(store.list_logins(99).unwrap().is_empty());
    }

    #[test]
    fn add_login_to_missing_service_fails() {
        let store = VaultStore::open_in_memory().unwrap();
        assert!(matches!(
            store.add_login(7, &record("l"), &record("s")),
            Err(VaultError::NotFound { entity: "service", .. })
        ));
    }

    #[test]
    fn replace_secret_keeps_binding_and_login() {
        let store = VaultStore::open_in_memory().unwrap();
        let ids = store.add_entry("example.com", &record("alice"), &record("old")).unwrap();

        store.replace_secret(ids.service_id, ids.login_id, &record("new")).unwrap();

        assert_eq!(store.get_secret(ids.service_id, ids.login_id).unwrap(), record("new"));
        assert_eq!(store.get_login(ids.service_id, ids.login_id).unwrap(), record("alice"));
        let secret_id: i64 = store
            .conn()
            .query_row(
                "SELECT secret_id FROM bindings WHERE service_id = ?1 AND login_id = ?2",
                params![ids.service_id, ids.login_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(secret_id, ids.secret_id);
    }

    #[test]
    fn missing_binding_is_not_found() {
        let store = VaultStore::open_in_memory().unwrap();
        let ids = store.add_entry("example.com", &record("l"), &record("s")).unwrap();

        assert!(matches!(
            store.get_secret(ids.service_id, ids.login_id + 1),
            Err(VaultError::NotFound { entity: "binding", .. })
        ));
        assert!(matches!(
            store.replace_secret(ids.service_id + 1, ids.login_id, &record("x")),
            Err(VaultError::NotFound { .. })
        ));
    }

    #[test]
    fn values_are_bound_not_interpolated() {
        let store = VaultStore::open_in_memory().unwrap();
        let name = "x'); DROP TABLE services; --";
        let ids = store.add_entry(name, &record("l"), &record("s")).unwrap();
        assert_eq!(store.list_services().unwrap()[&ids.service_id], name);
    }

    #[test]
    fn reopen_on_disk_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vault.db");
        {
            let store = VaultStore::open(&path, Duration::from_secs(5)).unwrap();
            store.add_entry("example.com", &record("l"), &record("s")).unwrap();
        }
        let store = VaultStore::open(&path, Duration::from_secs(5)).unwrap();
        assert_eq!(store.list_services().unwrap().len(), 1);
    }
}
