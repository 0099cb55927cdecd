//! Command session with the token
//!
//! One `CommandSession` owns the link. Every command is a fixed sequence of
//! request lines, acknowledgments and response lines. Once any step of that
//! sequence fails the token's position in the exchange is unknown, so the
//! session is marked `Faulted` and refuses further commands until it is
//! replaced by a fresh connection and handshake.

use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};
use zeroize::Zeroizing;

use super::ack::expect_ack;
use super::command::{Command, Request, Tag};
use super::variant::ProtocolVariant;
use crate::config::Config;
use crate::crypto::{derive_device_key, totp_seed, wire, Secret};
use crate::error::{LlaveroError, Result};
use crate::prompt::{RetryPolicy, SecretPrompt, SecretSource};
use crate::transport::{deadline_after, LineTransport, Link};

/// Largest chunk requested while polling the tag list
const LIST_CHUNK: usize = 255;

/// Rounds of the stale-input backoff before a command
const SETTLE_ROUNDS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Handshaken,
    Ready,
    AwaitingAck,
    AwaitingResponse,
    Faulted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Handshaken => "handshaken",
            Self::Ready => "ready",
            Self::AwaitingAck => "awaiting ack",
            Self::AwaitingResponse => "awaiting response",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Timing and dialect knobs for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bound on every line read
    pub read_timeout: Duration,
    /// First wait of the stale-input backoff
    pub settle: Duration,
    /// How long `ls` polls for the tag list
    pub list_timeout: Duration,
    pub variant: ProtocolVariant,
    pub retry: RetryPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            settle: config.settle(),
            list_timeout: config.list_timeout(),
            variant: config.variant,
            retry: config.retry_policy(),
        }
    }
}

/// What a command produced
#[derive(Debug)]
pub enum Reply {
    Greeting(String),
    SecretStored { status: Option<String> },
    Secret(Secret),
    Tags { header: String, listing: String },
    ResetDone(String),
    DeviceKeySet,
    ClockSynced { epoch: u64, confirmation: String },
    TotpStored,
}

pub struct CommandSession<L: Link> {
    transport: LineTransport<L>,
    options: SessionOptions,
    state: SessionState,
}

impl<L: Link> CommandSession<L> {
    pub fn new(link: L, options: SessionOptions) -> Self {
        Self {
            transport: LineTransport::new(link),
            options,
            state: SessionState::Disconnected,
        }
    }

    /// Wrap `link` and perform the handshake. Returns the device greeting.
    pub fn connect(link: L, options: SessionOptions) -> Result<(Self, String)> {
        let mut session = Self::new(link, options);
        let greeting = session.handshake()?;
        Ok((session, greeting))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Tear the session down and give back the link
    pub fn into_link(self) -> L {
        self.transport.into_inner()
    }

    /// Run one request
    pub fn execute(&mut self, request: Request, source: &mut dyn SecretSource) -> Result<Reply> {
        match request {
            Request::Handshake => self.handshake().map(Reply::Greeting),
            Request::Set(tag) => self
                .set_tag_secret(&tag, source)
                .map(|status| Reply::SecretStored { status }),
            Request::Get(tag) => self.get_tag_secret(&tag).map(Reply::Secret),
            Request::List => self
                .list_tags()
                .map(|(header, listing)| Reply::Tags { header, listing }),
            Request::Reset => self.factory_reset().map(Reply::ResetDone),
            Request::SetDeviceKey => self.set_device_key(source).map(|()| Reply::DeviceKeySet),
            Request::SyncClock => self
                .sync_clock()
                .map(|(epoch, confirmation)| Reply::ClockSynced { epoch, confirmation }),
            Request::SetTotp(tag) => self.set_totp_tag(&tag, source).map(|()| Reply::TotpStored),
        }
    }

    /// `hi`: returns the greeting line
    pub fn handshake(&mut self) -> Result<String> {
        self.guarded(Command::Handshake, |s| {
            s.send_command(Command::Handshake)?;
            s.state = SessionState::Handshaken;
            let greeting = s.read_info_line()?;
            info!(greeting = %greeting, "handshake complete");
            Ok(greeting)
        })
    }

    /// `set`: store a confirmed secret under `tag`
    ///
    /// Returns the device's slot status line when the dialect sends one.
    pub fn set_tag_secret(&mut self, tag: &Tag, source: &mut dyn SecretSource) -> Result<Option<String>> {
        self.guarded(Command::SetTagSecret, |s| {
            s.send_command(Command::SetTagSecret)?;
            s.send_tag(tag)?;
            s.await_ack()?;

            let status = if s.options.variant.reports_set_tag() {
                Some(s.read_info_line()?)
            } else {
                None
            };

            let prompt = s.read_info_line()?;
            let secret = SecretPrompt::new(source, s.options.retry).acquire(&prompt)?;
            s.transport.write_secret_line(secret)?;
            s.await_ack()?;
            Ok(status)
        })
    }

    /// `get`: fetch the secret stored under `tag`
    ///
    /// A trailing `\r` from a CRLF-terminating firmware is not part of the secret.
    pub fn get_tag_secret(&mut self, tag: &Tag) -> Result<Secret> {
        self.guarded(Command::GetTagSecret, |s| {
            s.send_command(Command::GetTagSecret)?;
            s.send_tag(tag)?;
            if s.options.variant.acks_get_tag() {
                s.await_ack()?;
            }

            let mut line = s.transport.read_line_bytes(s.options.read_timeout)?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            Ok(Secret::new(std::mem::take(&mut *line)))
        })
    }

    /// `ls`: returns the header line and the raw tag listing
    pub fn list_tags(&mut self) -> Result<(String, String)> {
        self.guarded(Command::ListTags, |s| {
            s.send_command(Command::ListTags)?;
            let header = s.read_info_line()?;

            // The listing streams in after the header with no end marker.
            // Collect until the line goes quiet or `list_timeout` runs out.
            let timeout = s.options.list_timeout;
            let deadline = deadline_after(timeout)?;
            let mut listing = s.transport.read_available(LIST_CHUNK)?;
            while listing.is_empty() {
                if Instant::now() >= deadline {
                    return Err(LlaveroError::Timeout(timeout));
                }
                listing = s.transport.read_available(LIST_CHUNK)?;
            }
            while Instant::now() < deadline {
                let more = s.transport.read_available(LIST_CHUNK)?;
                if more.is_empty() {
                    break;
                }
                listing.extend_from_slice(&more);
            }

            debug!(bytes = listing.len(), "tag list received");
            Ok((header, String::from_utf8_lossy(&listing).into_owned()))
        })
    }

    /// `init`: wipe the token. Returns its confirmation line.
    pub fn factory_reset(&mut self) -> Result<String> {
        self.guarded(Command::FactoryReset, |s| {
            s.send_command(Command::FactoryReset)?;
            s.read_info_line()
        })
    }

    /// `secret`: derive the AES key from a confirmed passphrase and send it
    pub fn set_device_key(&mut self, source: &mut dyn SecretSource) -> Result<()> {
        self.guarded(Command::SetDeviceKey, |s| {
            s.send_command(Command::SetDeviceKey)?;
            let prompt = s.read_info_line()?;

            let key = SecretPrompt::new(source, s.options.retry)
                .acquire_with(&prompt, |passphrase| Ok(derive_device_key(passphrase)))?;
            s.transport.write_line(&key.to_wire())?;
            drop(key);

            s.await_ack()
        })
    }

    /// `time`: set the token clock to the host's UTC time
    pub fn sync_clock(&mut self) -> Result<(u64, String)> {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| LlaveroError::ClockBeforeEpoch)?
            .as_secs();
        let confirmation = self.sync_clock_at(epoch)?;
        Ok((epoch, confirmation))
    }

    /// `time` with an explicit Unix timestamp
    pub fn sync_clock_at(&mut self, epoch_secs: u64) -> Result<String> {
        self.guarded(Command::SyncClock, |s| {
            s.send_command(Command::SyncClock)?;
            let prompt = s.read_info_line()?;
            debug!(prompt = %prompt, "clock prompt");

            s.transport.write_line(&wire::encode_epoch(epoch_secs))?;
            s.await_ack()?;
            s.read_info_line()
        })
    }

    /// `sett`: store a base32 TOTP seed under `tag`
    pub fn set_totp_tag(&mut self, tag: &Tag, source: &mut dyn SecretSource) -> Result<()> {
        self.guarded(Command::SetTotpTag, |s| {
            s.send_command(Command::SetTotpTag)?;
            s.send_tag(tag)?;
            let prompt = s.read_info_line()?;

            let payload: Zeroizing<String> = SecretPrompt::new(source, s.options.retry)
                .acquire_with(&prompt, |seed| totp_seed::decode_to_wire(&seed))?;
            s.transport.write_line(&payload)?;
            drop(payload);

            s.await_ack()
        })
    }

    /// Check the state, clear stale input, run `op` and record the outcome
    fn guarded<T>(&mut self, command: Command, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        match (self.state, command) {
            (SessionState::Faulted, _) => return Err(LlaveroError::Faulted),
            (SessionState::Ready, _) => {}
            (SessionState::Disconnected, Command::Handshake) => {}
            (state, _) => return Err(LlaveroError::NotReady(state)),
        }

        debug!(command = %command, "issuing command");
        let result = match self.transport.drain_stale(self.options.settle, SETTLE_ROUNDS) {
            Ok(_) => op(self),
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => {
                self.state = SessionState::Ready;
                Ok(value)
            }
            Err(e) => {
                debug!(command = %command, error = %e, "command failed; session faulted");
                self.state = SessionState::Faulted;
                Err(e)
            }
        }
    }

    fn send_command(&mut self, command: Command) -> Result<()> {
        self.transport.write_line(command.wire_name())?;
        self.await_ack()
    }

    /// Send the tag line, reading the device's tag prompt first if it sends one
    fn send_tag(&mut self, tag: &Tag) -> Result<()> {
        if self.options.variant.echoes_tag_prompt() {
            let prompt = self.read_info_line()?;
            debug!(prompt = %prompt, "tag prompt");
        }
        self.transport.write_line(tag.as_str())
    }

    fn await_ack(&mut self) -> Result<()> {
        self.state = SessionState::AwaitingAck;
        expect_ack(&mut self.transport, self.options.read_timeout)?;
        self.state = SessionState::AwaitingResponse;
        Ok(())
    }

    /// A non-secret line from the device, with any trailing `\r` removed
    fn read_info_line(&mut self) -> Result<String> {
        let line = self.transport.read_line(self.options.read_timeout)?;
        Ok(line.trim_end_matches('\r').to_string())
    }
}
