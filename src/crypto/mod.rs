//! Secret handling and payload transforms for llavero
//!
//! This module provides:
//! - `Secret`, the single zero-on-drop copy of operator input
//! - PBKDF2-HMAC-SHA256 derivation of the device AES key
//! - Base32 TOTP seed decoding
//! - The `0x` hex payload encoding used on the wire

mod kdf;
mod secret;
pub mod totp_seed;
pub mod wire;

pub use kdf::{derive_device_key, derive_with, DerivedKey, DEVICE_KEY_ROUNDS, DEVICE_KEY_SALT, KEY_LEN};
pub use secret::Secret;
