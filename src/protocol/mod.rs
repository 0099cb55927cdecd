//! The token's line protocol
//!
//! Request lines, strict `ACK` synchronization and the per-command sequences.

pub mod ack;
mod command;
mod session;
mod variant;

pub use command::{Command, Request, Tag, MAX_TAG_LEN};
pub use session::{CommandSession, Reply, SessionOptions, SessionState};
pub use variant::ProtocolVariant;
