//! Subcommand implementations.
//!
//! Every vault command opens the store, runs the unlock protocol and then
//! acts on the [`UnlockedSession`]. Secrets go to stdout; prompts and logs go
//! to stderr.

use anyhow::{Context, Result};
use lockbox_vault::prompt::{Prompter, TerminalPrompter};
use lockbox_vault::{UnlockedSession, VaultConfig, VaultStore, generator, session};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

fn open_store(config: &VaultConfig) -> Result<VaultStore> {
    let path = &config.vault.db_path;
    VaultStore::open(path, config.vault.busy_timeout())
        .with_context(|| format!("failed to open vault at {}", path.display()))
}

fn unlock<'s>(
    store: &'s VaultStore,
    prompter: &mut dyn Prompter,
    config: &VaultConfig,
) -> Result<UnlockedSession<'s>> {
    session::unlock(store, prompter, config.vault.max_unlock_attempts)
        .context("failed to unlock vault")
}

/// A prompted secret, or one generated from the configured policy.
fn new_secret(prompter: &mut dyn Prompter, config: &VaultConfig, ask: bool) -> Result<SecretString> {
    if ask {
        let secret = prompter.read_secret("Secret: ")?;
        anyhow::ensure!(!secret.expose_secret().is_empty(), "empty secret not allowed");
        Ok(secret)
    } else {
        generator::generate(&config.generator).context("failed to generate password")
    }
}

fn read_login(prompter: &mut dyn Prompter) -> Result<String> {
    let login = prompter.read_line("Login: ")?;
    let login = login.trim();
    anyhow::ensure!(!login.is_empty(), "empty login not allowed");
    Ok(login.to_string())
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

pub fn init(config: &VaultConfig) -> Result<()> {
    let store = open_store(config)?;
    let session = unlock(&store, &mut TerminalPrompter::new(), config)?;
    let services = session.services()?.len();
    session.close();

    println!(
        "Vault ready at {} ({services} services)",
        config.vault.db_path.display()
    );
    Ok(())
}

pub fn add(config: &VaultConfig, service: &str, login: Option<&str>, ask: bool) -> Result<()> {
    let store = open_store(config)?;
    let mut prompter = TerminalPrompter::new();
    let session = unlock(&store, &mut prompter, config)?;
    let login = match login {
        Some(login) => login.to_string(),
        None => read_login(&mut prompter)?,
    };
    let secret = new_secret(&mut prompter, config, ask)?;

    let existing = session
        .services()?
        .into_iter()
        .find_map(|(id, name)| (name == service).then_some(id));

    let ids = match existing {
        Some(service_id) => session.add_login(service_id, &login, &secret),
        None => session.add_entry(service, &login, &secret),
    }
    .with_context(|| format!("failed to store login for {service}"))?;

    info!(service_id = ids.service_id, login_id = ids.login_id, "entry stored");
    println!("service {}  login {}", ids.service_id, ids.login_id);
    if !ask {
        println!("{}", secret.expose_secret());
    }
    session.close();
    Ok(())
}

pub fn get(config: &VaultConfig, service_id: i64, login_id: i64) -> Result<()> {
    let store = open_store(config)?;
    let session = unlock(&store, &mut TerminalPrompter::new(), config)?;

    let login = session.login(service_id, login_id)?;
    let secret = session.secret(service_id, login_id)?;
    println!("login:  {login}");
    println!("secret: {}", secret.expose_secret());

    session.close();
    Ok(())
}

pub fn change(config: &VaultConfig, service_id: i64, login_id: i64, ask: bool) -> Result<()> {
    let store = open_store(config)?;
    let mut prompter = TerminalPrompter::new();
    let session = unlock(&store, &mut prompter, config)?;
    let secret = new_secret(&mut prompter, config, ask)?;

    session
        .replace_secret(service_id, login_id, &secret)
        .with_context(|| format!("failed to change secret of {service_id}/{login_id}"))?;

    if !ask {
        println!("{}", secret.expose_secret());
    }
    session.close();
    Ok(())
}

pub fn services(config: &VaultConfig) -> Result<()> {
    let store = open_store(config)?;
    let session = unlock(&store, &mut TerminalPrompter::new(), config)?;

    for (id, name) in session.services()? {
        println!("{id}\t{name}");
    }
    session.close();
    Ok(())
}

pub fn logins(config: &VaultConfig, service_id: i64) -> Result<()> {
    let store = open_store(config)?;
    let session = unlock(&store, &mut TerminalPrompter::new(), config)?;

    let logins = session.logins(service_id)?;
    if logins.is_empty() {
        eprintln!("no logins for service {service_id}");
    }
    for (id, login) in logins {
        println!("{id}\t{login}");
    }
    session.close();
    Ok(())
}

pub fn generate(config: &VaultConfig) -> Result<()> {
    let password = generator::generate(&config.generator)?;
    println!("{}", password.expose_secret());
    Ok(())
}

#[cfg(test)]
mod tests {
    use lockbox_vault::prompt::ScriptedPrompter;

    use super::*;

    #[test]
    fn login_is_read_as_a_plain_line() {
        let mut prompter = ScriptedPrompter::new(["  alice  "]);
        assert_eq!(read_login(&mut prompter).unwrap(), "alice");
        assert_eq!(prompter.asked(), ["Login: "]);
    }

    #[test]
    fn blank_login_is_rejected() {
        let mut prompter = ScriptedPrompter::new(["   "]);
        assert!(read_login(&mut prompter).is_err());
    }
}
