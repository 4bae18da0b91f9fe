//! CLI argument definitions for Lockbox.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Lockbox -- a local encrypted credential vault.
#[derive(Debug, Parser)]
#[command(
    name = "lockbox",
    version,
    about = "Lockbox -- local encrypted credential vault",
    long_about = "Stores per-service logins and secrets encrypted under a master key, \
                  which is itself protected by your master password."
)]
pub struct Cli {
    /// Path of the vault database (overrides config and LOCKBOX_DB).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path of the TOML configuration file.
    #[arg(long, global = true, default_value = lockbox_vault::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the vault and set the master password (or check an existing one).
    Init,

    /// Store a new login for a service. Uses an existing service of the same
    /// name if there is one.
    Add {
        /// Service name, e.g. "example.com".
        service: String,

        /// Login for the service. Asked for on the terminal when omitted.
        login: Option<String>,

        /// Prompt for the secret instead of generating one.
        #[arg(long)]
        secret: bool,
    },

    /// Print the login and secret of a binding.
    Get {
        service_id: i64,
        login_id: i64,
    },

    /// Replace the secret of a binding.
    Change {
        service_id: i64,
        login_id: i64,

        /// Prompt for the new secret instead of generating one.
        #[arg(long)]
        secret: bool,
    },

    /// List services.
    Services,

    /// List the logins of a service.
    Logins {
        service_id: i64,
    },

    /// Print a generated password without opening the vault.
    Generate,
}

impl Cli {
    /// Filter used when `RUST_LOG` is unset.
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    }
}
