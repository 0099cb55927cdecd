//! Configuration management for llavero
//!
//! Holds the serial link settings and protocol dialect. Values come from
//! `config.json` in the user's config directory and can be overridden on
//! the command line.

mod storage;

pub use storage::{default_config_path, load, save};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LlaveroError, Result};
use crate::prompt::RetryPolicy;
use crate::protocol::ProtocolVariant;
use crate::transport::default_port;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_SETTLE_MS: u64 = 100;
/// The token reboots when the port is opened
pub const DEFAULT_BOOT_DELAY_MS: u64 = 2000;
pub const DEFAULT_LIST_TIMEOUT_MS: u64 = 5000;

/// Upper bound for every timing field: one hour
pub const MAX_DURATION_MS: u64 = 3_600_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device path; falls back to the platform default
    pub port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// First wait before a command while stale input drains
    pub settle_ms: u64,
    pub boot_delay_ms: u64,
    pub list_timeout_ms: u64,
    pub variant: ProtocolVariant,
    /// Bound on secret re-entry; unset means ask until it matches
    pub prompt_attempts: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            boot_delay_ms: DEFAULT_BOOT_DELAY_MS,
            list_timeout_ms: DEFAULT_LIST_TIMEOUT_MS,
            variant: ProtocolVariant::default(),
            prompt_attempts: None,
        }
    }
}

impl Config {
    /// Serial device to open
    pub fn port_path(&self) -> Result<String> {
        self.port
            .clone()
            .or_else(|| default_port().map(str::to_string))
            .ok_or_else(|| {
                LlaveroError::InvalidConfig("no serial port configured; pass --port".into())
            })
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn boot_delay(&self) -> Duration {
        Duration::from_millis(self.boot_delay_ms)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_millis(self.list_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self.prompt_attempts {
            Some(attempts) => RetryPolicy::at_most(attempts),
            None => RetryPolicy::unbounded(),
        }
    }

    /// Reject settings the link cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(LlaveroError::InvalidConfig("baud_rate must be positive".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(LlaveroError::InvalidConfig(
                "read_timeout_ms must be positive".into(),
            ));
        }
        for (name, value) in [
            ("read_timeout_ms", self.read_timeout_ms),
            ("settle_ms", self.settle_ms),
            ("boot_delay_ms", self.boot_delay_ms),
            ("list_timeout_ms", self.list_timeout_ms),
        ] {
            if value > MAX_DURATION_MS {
                return Err(LlaveroError::InvalidConfig(format!(
                    "{} must be at most {}",
                    name, MAX_DURATION_MS
                )));
            }
        }
        if self.prompt_attempts == Some(0) {
            return Err(LlaveroError::InvalidConfig(
                "prompt_attempts must be at least 1".into(),
            ));
        }
        if matches!(self.port.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(LlaveroError::InvalidConfig("port must not be empty".into()));
        }
        Ok(())
    }
}
