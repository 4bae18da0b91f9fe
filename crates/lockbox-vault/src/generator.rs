//! Random password generation.
//!
//! Characters are drawn uniformly from the union of the enabled alphabets
//! using rejection sampling over the system CSPRNG, so no character is
//! favoured by modulo bias.

use secrecy::SecretString;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::crypto;
use crate::error::{Result, VaultError};

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"@&$#%*?:;!-_=./<>()";

/// Default generated password length.
pub const DEFAULT_LENGTH: usize = 17;

/// Longest password a policy may ask for.
pub const MAX_LENGTH: usize = 1024;

/// Which characters a generated password may contain, and how long it is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_LENGTH,
            max_length: DEFAULT_LENGTH,
            uppercase: true,
            lowercase: true,
            digits: true,
            symbols: true,
        }
    }
}

impl PasswordPolicy {
    /// Reject policies that cannot produce a password.
    pub fn validate(&self) -> Result<()> {
        if self.min_length == 0 {
            return Err(invalid("length must be at least 1"));
        }
        if self.min_length > self.max_length {
            return Err(invalid(format!(
                "min_length {} exceeds max_length {}",
                self.min_length, self.max_length
            )));
        }
        if self.max_length > MAX_LENGTH {
            return Err(invalid(format!(
                "max_length {} exceeds the limit of {MAX_LENGTH}",
                self.max_length
            )));
        }
        if self.alphabet().is_empty() {
            return Err(invalid("no character class enabled"));
        }
        Ok(())
    }

    fn alphabet(&self) -> Vec<u8> {
        [
            (self.uppercase, UPPERCASE),
            (self.lowercase, LOWERCASE),
            (self.digits, DIGITS),
            (self.symbols, SYMBOLS),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .flat_map(|(_, chars)| chars.iter().copied())
        .collect()
    }
}

fn invalid(reason: impl Into<String>) -> VaultError {
    VaultError::InvalidPolicy {
        reason: reason.into(),
    }
}

/// Generate a password satisfying `policy`.
pub fn generate(policy: &PasswordPolicy) -> Result<SecretString> {
    policy.validate()?;
    let alphabet = policy.alphabet();

    let span = policy.max_length - policy.min_length;
    let length = policy.min_length + uniform_below(span as u64 + 1)? as usize;

    let mut password = Zeroizing::new(String::with_capacity(length));
    for _ in 0..length {
        let idx = uniform_below(alphabet.len() as u64)? as usize;
        password.push(char::from(alphabet[idx]));
    }

    tracing::debug!(length, alphabet = alphabet.len(), "generated password");
    Ok(SecretString::from(password.as_str().to_owned()))
}

/// Uniform integer in `0..bound` by rejection sampling.
fn uniform_below(bound: u64) -> Result<u64> {
    if bound <= 1 {
        return Ok(0);
    }
    let zone = u64::MAX - (u64::MAX % bound);
    loop {
        let mut buf = [0u8; 8];
        crypto::fill_random(&mut buf)?;
        let value = u64::from_le_bytes(buf);
        if value < zone {
            return Ok(value % bound);
        }
    }
}
