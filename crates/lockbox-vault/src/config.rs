//! Vault configuration loaded from TOML.
//!
//! ```toml
//! [vault]
//! db_path = "data/lockbox.db"
//! busy_timeout_secs = 30
//! max_unlock_attempts = 1
//!
//! [generator]
//! min_length = 17
//! max_length = 17
//!
//! [logging]
//! level = "warn"
//! ```
//!
//! Every key is optional. A missing file yields the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, VaultError};
use crate::generator::PasswordPolicy;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable overriding `vault.db_path`.
pub const DB_PATH_ENV_VAR: &str = "LOCKBOX_DB";

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The file did not exist.
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub vault: StoreSettings,
    pub generator: PasswordPolicy,
    pub logging: LoggingSettings,
}

/// The `[vault]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path of the SQLite database file.
    pub db_path: PathBuf,
    /// How long a storage call may wait on a locked database.
    pub busy_timeout_secs: u64,
    /// Master-password attempts allowed before unlock fails.
    pub max_unlock_attempts: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/lockbox.db"),
            busy_timeout_secs: 30,
            max_unlock_attempts: 1,
        }
    }
}

impl StoreSettings {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

impl VaultConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// Does not log: the logging level is itself configuration, so callers
    /// report the returned [`ConfigSource`] once their subscriber is
    /// installed.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] if the file cannot be read or parsed,
    /// or if the loaded values fail [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, ConfigSource)> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults));
        }

        let content = std::fs::read_to_string(path).map_err(|e| VaultError::Config {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        let config = Self::from_toml(&content)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| VaultError::Config {
            reason: format!("failed to parse TOML config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the `LOCKBOX_DB` override, if set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(DB_PATH_ENV_VAR)
            && !path.is_empty()
        {
            self.vault.db_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.vault.busy_timeout_secs == 0 {
            return Err(VaultError::Config {
                reason: "vault.busy_timeout_secs must be positive".into(),
            });
        }
        if self.vault.max_unlock_attempts == 0 {
            return Err(VaultError::Config {
                reason: "vault.max_unlock_attempts must be positive".into(),
            });
        }
        self.generator.validate().map_err(|e| VaultError::Config {
            reason: format!("generator: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = VaultConfig::from_toml("").unwrap();
        assert_eq!(config, VaultConfig::default());
        assert_eq!(config.vault.db_path, PathBuf::from("data/lockbox.db"));
        assert_eq!(config.vault.busy_timeout(), Duration::from_secs(30));
        assert_eq!(config.vault.max_unlock_attempts, 1);
        assert_eq!(config.generator.min_length, 17);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = VaultConfig::from_toml(
            r#"
            [vault]
            max_unlock_attempts = 3

            [generator]
            symbols = false
            "#,
        )
        .unwrap();
        assert_eq!(config.vault.max_unlock_attempts, 3);
        assert_eq!(config.vault.busy_timeout_secs, 30);
        assert!(!config.generator.symbols);
        assert!(config.generator.digits);
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let result = VaultConfig::from_toml("[vault\nbusy_timeout_secs = ");
        assert!(matches!(result, Err(VaultError::Config { .. })));
    }

    #[test]
    fn invalid_values_rejected() {
        for text in [
            "[vault]\nbusy_timeout_secs = 0",
            "[vault]\nmax_unlock_attempts = 0",
            "[generator]\nmin_length = 0",
            "[generator]\nmax_length = 100000",
        ] {
            assert!(
                matches!(VaultConfig::from_toml(text), Err(VaultError::Config { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, source) = VaultConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, VaultConfig::default());
        assert_eq!(source, ConfigSource::Defaults);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockbox.toml");
        std::fs::write(&path, "[vault]\ndb_path = \"/tmp/x.db\"\n").unwrap();
        let (config, source) = VaultConfig::load(&path).unwrap();
        assert_eq!(config.vault.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(source, ConfigSource::File(path.clone()));
        assert_eq!(source.to_string(), path.display().to_string());
    }
}
