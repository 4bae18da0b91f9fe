//! Line and masked-secret input for the unlock protocol.

use std::io::{BufRead, Write};

use secrecy::SecretString;

use crate::error::{Result, VaultError};

/// Environment variable answering master-password prompts for headless use.
pub const MASTER_PASSWORD_ENV_VAR: &str = "LOCKBOX_MASTER_PASSWORD";

/// Source of user input.
pub trait Prompter {
    /// Read one line of plain text, without the trailing newline.
    ///
    /// Used for non-secret answers such as a login name the CLI was not given
    /// on the command line.
    fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// Read a secret without echo.
    fn read_secret(&mut self, prompt: &str) -> Result<SecretString>;

    /// Read the master password. Defaults to [`read_secret`](Self::read_secret).
    fn read_master_password(&mut self, prompt: &str) -> Result<SecretString> {
        self.read_secret(prompt)
    }

    /// Whether the last master password was typed by a person. A wrong
    /// answer from a fixed source would be wrong on every retry, so unlock
    /// stops after the first failure when this is `false`.
    fn last_answer_interactive(&self) -> bool {
        true
    }
}

/// Master password taken from the value of [`MASTER_PASSWORD_ENV_VAR`].
/// Unset or empty means no override.
fn master_password_from(value: Option<String>) -> Option<SecretString> {
    value
        .filter(|password| !password.is_empty())
        .map(SecretString::from)
}

/// Reads from the controlling terminal. Prompts go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter {
    answered_from_env: bool,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        eprint!("{prompt}");
        std::io::stderr().flush()?;

        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(VaultError::Prompt {
                reason: "end of input".into(),
            });
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_secret(&mut self, prompt: &str) -> Result<SecretString> {
        let secret = rpassword::prompt_password(prompt).map_err(|e| VaultError::Prompt {
            reason: format!("failed to read secret: {e}"),
        })?;
        Ok(SecretString::from(secret))
    }

    /// `LOCKBOX_MASTER_PASSWORD`, when set and non-empty, answers without a
    /// terminal.
    fn read_master_password(&mut self, prompt: &str) -> Result<SecretString> {
        if let Some(password) = master_password_from(std::env::var(MASTER_PASSWORD_ENV_VAR).ok()) {
            tracing::debug!("using master password from environment");
            self.answered_from_env = true;
            return Ok(password);
        }
        self.answered_from_env = false;
        self.read_secret(prompt)
    }

    fn last_answer_interactive(&self) -> bool {
        !self.answered_from_env
    }
}

/// Prompter answering from a fixed script, for tests and non-interactive
/// callers.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    asked: Vec<String>,
    non_interactive: bool,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
            non_interactive: false,
        }
    }

    /// Report every answer as non-interactive, like a password supplied
    /// through the environment.
    pub fn non_interactive(mut self) -> Self {
        self.non_interactive = true;
        self
    }

    /// Prompts shown so far.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    fn next(&mut self, prompt: &str) -> Result<String> {
        self.asked.push(prompt.to_string());
        self.answers.pop_front().ok_or_else(|| VaultError::Prompt {
            reason: "no scripted answer left".into(),
        })
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }

    fn read_secret(&mut self, prompt: &str) -> Result<SecretString> {
        self.next(prompt).map(SecretString::from)
    }

    fn last_answer_interactive(&self) -> bool {
        !self.non_interactive
    }
}
