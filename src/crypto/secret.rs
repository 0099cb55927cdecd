//! Owned secret material with automatic zeroing on drop
//!
//! A `Secret` is the single live copy of a passphrase, tag secret or TOTP
//! seed typed by the operator. It is:
//! 1. Zeroed when dropped
//! 2. Never cloned and never printed
//! 3. Locked in memory where possible (prevents swapping)
//!
//! Transmitting a secret consumes it, so it cannot be read again afterwards.

use std::ops::Deref;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Operator-supplied secret bytes that zero themselves on drop
#[derive(Zeroize, ZeroizeOnDrop, Default)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Take ownership of `data` without copying it
    pub fn new(data: Vec<u8>) -> Self {
        let secret = Self(data);
        secret.lock_memory();
        secret
    }

    /// Lock memory to prevent swapping (best effort, may fail without privileges)
    #[cfg(unix)]
    fn lock_memory(&self) {
        if self.0.is_empty() {
            return;
        }
        unsafe {
            libc::mlock(self.0.as_ptr() as *const libc::c_void, self.0.len());
        }
    }

    #[cfg(not(unix))]
    fn lock_memory(&self) {}

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// View the secret as text, replacing invalid UTF-8
    pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl Deref for Secret {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<String> for Secret {
    // `into_bytes` reuses the allocation, so no stray copy is left behind
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

impl From<Vec<u8>> for Secret {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

// Prevent accidental debug printing of secrets
impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.0.len())
            .field("data", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_from_string_keeps_bytes() {
        let secret = Secret::from(String::from("pw1"));
        assert_eq!(secret.len(), 3);
        assert_eq!(&*secret, b"pw1");
        assert_eq!(secret.to_string_lossy(), "pw1");
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::from(String::from("hunter2"));
        let printed = format!("{:?}", secret);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn test_secret_zeroize_clears_contents() {
        let mut secret = Secret::new(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        secret.zeroize();
        assert!(secret.is_empty());
    }

    #[test]
    fn test_secret_equality() {
        assert_eq!(Secret::from(String::from("a")), Secret::from(String::from("a")));
        assert_ne!(Secret::from(String::from("a")), Secret::from(String::from("b")));
    }
}
