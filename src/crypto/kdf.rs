//! PBKDF2-HMAC-SHA256 device key derivation
//!
//! Turns the operator's passphrase into the 32-byte AES key stored on the
//! token. Salt and round count are fixed so that the same passphrase always
//! provisions the same key, including keys set up by earlier host tools.

use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::{wire, Secret};

/// Fixed salt shared by every host that provisions a device key
pub const DEVICE_KEY_SALT: &[u8] = b"sal";

/// PBKDF2 round count
pub const DEVICE_KEY_ROUNDS: u32 = 314_159;

/// Derived key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Key material derived from a passphrase, zeroed on drop
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// `0x` + 64 lowercase hex characters, as the token expects it
    pub fn to_wire(&self) -> Zeroizing<String> {
        wire::encode_hex(&self.key)
    }
}

impl Zeroize for DerivedKey {
    fn zeroize(&mut self) {
        self.key.zeroize();
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the device key from a passphrase
///
/// The passphrase is consumed and wiped as soon as derivation finishes.
pub fn derive_device_key(passphrase: Secret) -> DerivedKey {
    derive_with(passphrase, DEVICE_KEY_SALT, DEVICE_KEY_ROUNDS)
}

/// Derive with explicit parameters
pub fn derive_with(passphrase: Secret, salt: &[u8], rounds: u32) -> DerivedKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(&passphrase, salt, rounds, &mut key);
    drop(passphrase);

    let derived = DerivedKey { key };
    key.zeroize();
    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(text: &str) -> Secret {
        Secret::from(text.to_string())
    }

    #[test]
    fn test_known_pbkdf2_vectors() {
        let one = derive_with(secret("password"), b"salt", 1);
        assert_eq!(
            hex::encode(one.as_bytes()),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );

        let two = derive_with(secret("password"), b"salt", 2);
        assert_eq!(
            hex::encode(two.as_bytes()),
            "ae4d0c95af6b46d32d0adff928f06dd02a303f8ef3c251dfd6e2d85a95474c43"
        );
    }

    #[test]
    fn test_device_key_deterministic() {
        let key1 = derive_device_key(secret("correct horse"));
        let key2 = derive_device_key(secret("correct horse"));

        assert_eq!(key1.as_bytes(), key2.as_bytes());
        assert_eq!(
            key1.to_wire().as_str(),
            "0x4089fa458856b33279c0fe1567049348932919490ae46a9dcd648be78cc8850b"
        );
    }

    #[test]
    fn test_wire_format_shape() {
        let key = derive_with(secret("anything"), DEVICE_KEY_SALT, 3);
        let wire = key.to_wire();

        assert_eq!(wire.len(), 2 + 2 * KEY_LEN);
        assert!(wire.starts_with("0x"));
        assert!(wire[2..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = derive_with(secret("pw"), b"salt", 1);
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
