//! llavero - host client for the LLAVERO hardware secret token
//!
//! This crate talks to the token over its serial line protocol:
//! - Strict `ACK` synchronization after every request line
//! - Confirmed, masked secret entry that never outlives its transmission
//! - PBKDF2 derivation of the device AES key
//! - Base32 TOTP seed decoding
//! - An interactive shell and one-shot commands on top

pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod prompt;
pub mod protocol;
pub mod transport;

pub use error::{LlaveroError, Result};
