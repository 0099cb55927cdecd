use std::time::Duration;

use thiserror::Error;

use crate::protocol::SessionState;

pub type Result<T> = std::result::Result<T, LlaveroError>;

#[derive(Debug, Error)]
pub enum LlaveroError {
    #[error("Serial link failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("No data from the device within {0:?}")]
    Timeout(Duration),

    #[error("Expected ACK, got: {0:?}")]
    ProtocolDesync(String),

    #[error("Invalid base32 seed: {0}")]
    Encoding(String),

    #[error("Entries do not match")]
    ConfirmationMismatch,

    #[error("Session is faulted; reconnect and repeat the handshake")]
    Faulted,

    #[error("Session is not ready (state: {0})")]
    NotReady(SessionState),

    #[error("Operation cancelled by the operator")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown command '{0}'. Type help or ? to list commands.")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("System clock is set before the Unix epoch")]
    ClockBeforeEpoch,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlaveroError {
    /// Errors the operator can fix by simply typing the value again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Encoding(_) | Self::ConfirmationMismatch)
    }

    /// Errors after which the process must not keep talking to the token.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ProtocolDesync(_) | Self::Io(_) | Self::Serial(_))
    }
}
