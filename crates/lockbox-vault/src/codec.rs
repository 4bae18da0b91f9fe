//! Hex text encoding for every persisted binary field.
//!
//! Salts, hashes, IVs and ciphertexts are stored as lowercase hex. The output
//! of [`encode`] is always exactly twice the input length, so leading zero
//! bytes survive the round trip.

use crate::error::Result;

/// Encode `bytes` as lowercase, zero-padded hex.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Decode hex text produced by [`encode`].
///
/// Upper- and lowercase digits are accepted.
///
/// # Errors
///
/// Returns [`VaultError::Decode`](crate::VaultError::Decode) on odd length or
/// any non-hex character.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(text)?)
}

/// Decode hex text into a fixed-size array.
///
/// Length mismatches are reported as storage corruption since every caller
/// reads a field whose width is fixed by the schema.
pub fn decode_array<const N: usize>(text: &str, field: &str) -> Result<[u8; N]> {
    let bytes = decode(text)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        crate::VaultError::corrupt(format!("{field} is {len} bytes, expected {N}"))
    })
}
