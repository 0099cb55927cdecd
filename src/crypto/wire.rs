//! Hex payload encoding for the serial protocol
//!
//! Binary payloads (derived keys, TOTP seeds, timestamps) travel as `0x`
//! followed by lowercase hex digits, no separators.

use zeroize::Zeroizing;

/// Prefix of every binary payload line
pub const HEX_PREFIX: &str = "0x";

/// Encode secret bytes as a wire payload; the result wipes itself on drop
pub fn encode_hex(bytes: &[u8]) -> Zeroizing<String> {
    let mut line = Zeroizing::new(String::with_capacity(HEX_PREFIX.len() + bytes.len() * 2));
    line.push_str(HEX_PREFIX);
    line.push_str(&Zeroizing::new(hex::encode(bytes)));
    line
}

/// Encode a Unix timestamp as the token's clock payload
pub fn encode_epoch(epoch_secs: u64) -> String {
    format!("{:#x}", epoch_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex(&[0x48, 0x65, 0xde, 0xad]).as_str(), "0x4865dead");
        assert_eq!(encode_hex(&[]).as_str(), "0x");
    }

    #[test]
    fn test_encode_epoch() {
        assert_eq!(encode_epoch(1_700_000_000), "0x6553f100");
        assert_eq!(encode_epoch(0), "0x0");
    }
}
