//! Firmware dialects
//!
//! Token firmwares disagree on whether they prompt for a tag before reading
//! it. Which dialect is spoken is configuration, not something to guess.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// Prints an "enter tag" line before reading a tag, acks the tag for
    /// `get` and reports the selected slot after acking a `set` tag
    #[default]
    Echoing,
    /// Reads tags silently and answers `get` without a second ack
    Terse,
}

impl ProtocolVariant {
    /// Device sends a line before reading a tag (set, get, sett)
    pub fn echoes_tag_prompt(self) -> bool {
        matches!(self, Self::Echoing)
    }

    /// Device acks the tag line of a `get` before answering
    pub fn acks_get_tag(self) -> bool {
        matches!(self, Self::Echoing)
    }

    /// Device sends a status line between the tag ack and the secret prompt of `set`
    pub fn reports_set_tag(self) -> bool {
        matches!(self, Self::Echoing)
    }
}

impl std::fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Echoing => f.write_str("echoing"),
            Self::Terse => f.write_str("terse"),
        }
    }
}
