//! PBKDF2-HMAC-SHA256 key derivation.
//!
//! All derivations use a fixed iteration count and a 16-byte salt. The output
//! length is chosen by the caller: 64 bytes for password-hash material, 16
//! bytes for a cipher key. PBKDF2 output is a prefix-stable stream, so the
//! first 16 bytes of a 64-byte derivation equal a 16-byte derivation over the
//! same inputs.

use std::num::NonZeroU32;

use ring::pbkdf2;
use zeroize::Zeroizing;

use crate::crypto;
use crate::error::Result;

/// Fixed PBKDF2 iteration count.
pub const ITERATIONS: u32 = 1000;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

fn iterations() -> NonZeroU32 {
    NonZeroU32::new(ITERATIONS).unwrap_or(NonZeroU32::MIN)
}

/// Derive `len` bytes from `password` and `salt`.
///
/// Deterministic in `(password, salt, len)`. The buffer is zeroed on drop.
pub fn derive(password: &[u8], salt: &[u8; SALT_LEN], len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations(), salt, password, &mut out);
    out
}

/// Derive into a caller-provided fixed buffer.
pub(crate) fn derive_into(password: &[u8], salt: &[u8], out: &mut [u8]) {
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations(), salt, password, out);
}

/// Check, in constant time, whether `expected` is the derivation of
/// `password` under `salt`. The output length is taken from `expected`.
pub(crate) fn matches(password: &[u8], salt: &[u8], expected: &[u8]) -> bool {
    pbkdf2::verify(pbkdf2::PBKDF2_HMAC_SHA256, iterations(), salt, password, expected).is_ok()
}

/// Draw a fresh random 16-byte salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    crypto::fill_random(&mut salt)?;
    Ok(salt)
}
