//! CLI entry point for Lockbox.
//!
//! Loads configuration, installs logging, dispatches the subcommand and
//! reports any failure once, on stderr.

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use lockbox_vault::{VaultConfig, VaultError};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let recoverable = e
                .downcast_ref::<VaultError>()
                .is_some_and(|v| !v.is_fatal());
            debug!(recoverable, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let (mut config, source) = VaultConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    config.apply_env();
    if let Some(db) = &cli.db {
        config.vault.db_path = db.clone();
    }

    init_tracing(cli.log_level(&config.logging.level));
    info!(%source, db = %config.vault.db_path.display(), "configuration loaded");

    match cli.command {
        Commands::Init => commands::init(&config),
        Commands::Add {
            service,
            login,
            secret,
        } => commands::add(&config, &service, login.as_deref(), secret),
        Commands::Get {
            service_id,
            login_id,
        } => commands::get(&config, service_id, login_id),
        Commands::Change {
            service_id,
            login_id,
            secret,
        } => commands::change(&config, service_id, login_id, secret),
        Commands::Services => commands::services(&config),
        Commands::Logins { service_id } => commands::logins(&config, service_id),
        Commands::Generate => commands::generate(&config),
    }
}

/// Initialize the tracing subscriber. Logs go to stderr.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
