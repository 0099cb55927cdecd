//! Base32 TOTP seed decoding
//!
//! Seeds are handed out in the Google Authenticator format: RFC 4648 base32,
//! usually grouped with spaces, in any case, with or without `=` padding.
//! The token stores the raw seed bytes.

use data_encoding::{Encoding, BASE32, BASE32_NOPAD};
use zeroize::Zeroizing;

use super::{wire, Secret};
use crate::error::{LlaveroError, Result};

/// A TOTP record holds two 16-byte data blocks on the token
pub const MAX_SEED_LEN: usize = 32;

/// Strip whitespace and uppercase, keeping the result in wiped memory
pub fn normalize(raw: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(
        raw.iter()
            .filter(|b| !b.is_ascii_whitespace())
            .map(u8::to_ascii_uppercase)
            .collect(),
    )
}

/// Decode an operator-supplied seed into raw bytes
pub fn decode(raw: &[u8]) -> Result<Secret> {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Err(LlaveroError::Encoding("seed is empty".into()));
    }

    // Padded input must be padded correctly; bare input must have a valid length
    let encoding: &Encoding = if normalized.contains(&b'=') {
        &BASE32
    } else {
        &BASE32_NOPAD
    };

    let decoded = encoding
        .decode(&normalized)
        .map_err(|e| LlaveroError::Encoding(e.to_string()))?;
    let seed = Secret::new(decoded);

    if seed.len() > MAX_SEED_LEN {
        return Err(LlaveroError::Encoding(format!(
            "seed is {} bytes, the device stores at most {}",
            seed.len(),
            MAX_SEED_LEN
        )));
    }

    Ok(seed)
}

/// Decode a seed straight into its `0x...` wire payload
pub fn decode_to_wire(raw: &[u8]) -> Result<Zeroizing<String>> {
    let seed = decode(raw)?;
    Ok(wire::encode_hex(&seed))
}
