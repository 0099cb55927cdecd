//! Line-oriented transport over the serial link
//!
//! The token speaks newline-terminated ASCII lines. `LineTransport` buffers
//! partial lines across reads, bounds every blocking read by a deadline and
//! can throw away anything left over from a previous exchange.

mod serial;
#[cfg(test)]
pub(crate) mod scripted;

pub use serial::{default_port, open_serial_port};

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, trace};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::Secret;
use crate::error::{LlaveroError, Result};

/// Line terminator in both directions
pub const LINE_TERMINATOR: u8 = b'\n';

/// Bytes requested from the link per read call
const READ_CHUNK: usize = 64;

/// How long a best-effort read waits for the first byte
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Serial drivers reject a zero timeout
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Initial receive buffer size; grows only for unusually long lines
const BUFFER_CAPACITY: usize = 256;

/// Deadline `timeout` from now, or an error if it cannot be represented
pub(crate) fn deadline_after(timeout: Duration) -> Result<Instant> {
    Instant::now()
        .checked_add(timeout)
        .ok_or_else(|| LlaveroError::InvalidConfig(format!("timeout {:?} is too large", timeout)))
}

/// A byte link to the token
pub trait Link: Read + Write {
    /// Bound the next blocking read
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Drop bytes the OS has received but nobody has read yet
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Buffered line reader/writer on top of a `Link`
pub struct LineTransport<L: Link> {
    link: L,
    buffer: Zeroizing<Vec<u8>>,
}

impl<L: Link> LineTransport<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            buffer: Zeroizing::new(Vec::with_capacity(BUFFER_CAPACITY)),
        }
    }

    pub fn get_ref(&self) -> &L {
        &self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    /// Write `text` followed by the line terminator
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        self.send(text.as_bytes())
    }

    /// Write a secret as one line; the secret is wiped once the bytes are out
    pub fn write_secret_line(&mut self, secret: Secret) -> Result<()> {
        self.send(&secret)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.link.write_all(bytes)?;
        self.link.write_all(&[LINE_TERMINATOR])?;
        self.link.flush()?;
        Ok(())
    }

    /// Read the next line as text, without its terminator
    pub fn read_line(&mut self, timeout: Duration) -> Result<String> {
        let line = self.read_line_bytes(timeout)?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Read the next line as raw bytes, without its terminator
    ///
    /// Bytes after the terminator stay buffered for the next call.
    pub fn read_line_bytes(&mut self, timeout: Duration) -> Result<Zeroizing<Vec<u8>>> {
        let deadline = deadline_after(timeout)?;

        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == LINE_TERMINATOR) {
                let mut line = self.take_front(pos + 1);
                line.pop();
                trace!(len = line.len(), "line received");
                return Ok(line);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(LlaveroError::Timeout(timeout));
            }
            self.fill(deadline - now)?;
        }
    }

    /// Best-effort read of whatever is available, without line framing
    ///
    /// Returns buffered bytes first; otherwise waits briefly for the link.
    /// An empty result means nothing arrived.
    pub fn read_available(&mut self, max_bytes: usize) -> Result<Zeroizing<Vec<u8>>> {
        if self.buffer.is_empty() {
            self.fill(POLL_INTERVAL)?;
        }
        let n = self.buffer.len().min(max_bytes);
        Ok(self.take_front(n))
    }

    /// Drop buffered and in-flight input. Returns how many buffered bytes were lost.
    pub fn discard_pending_input(&mut self) -> Result<usize> {
        let dropped = self.buffer.len();
        self.buffer.zeroize();
        self.link.clear_input()?;
        Ok(dropped)
    }

    /// Make sure nothing from a previous exchange is still arriving
    ///
    /// Discards pending input, then waits `initial_wait` and checks for stray
    /// bytes. Each time some show up they are dropped and the wait doubles,
    /// for at most `max_rounds` rounds.
    pub fn drain_stale(&mut self, initial_wait: Duration, max_rounds: u32) -> Result<usize> {
        let mut dropped = self.discard_pending_input()?;
        let mut wait = initial_wait;

        for _ in 0..max_rounds {
            std::thread::sleep(wait);
            let stray = self.read_available(usize::MAX)?;
            if stray.is_empty() {
                break;
            }
            dropped += stray.len();
            dropped += self.discard_pending_input()?;
            wait = wait.saturating_mul(2).max(MIN_READ_TIMEOUT);
        }

        if dropped > 0 {
            debug!(bytes = dropped, "discarded stale input");
        }
        Ok(dropped)
    }

    fn fill(&mut self, wait: Duration) -> Result<usize> {
        self.link.set_read_timeout(wait.max(MIN_READ_TIMEOUT))?;

        let mut chunk = Zeroizing::new([0u8; READ_CHUNK]);
        match self.link.read(&mut chunk[..]) {
            Ok(n) => {
                self.append(&chunk[..n]);
                Ok(n)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(0)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(LlaveroError::Cancelled),
            Err(e) => Err(e.into()),
        }
    }

    /// Move the first `n` buffered bytes out, wiping the space they leave behind
    fn take_front(&mut self, n: usize) -> Zeroizing<Vec<u8>> {
        let mut taken = Zeroizing::new(Vec::with_capacity(n));
        taken.extend_from_slice(&self.buffer[..n]);
        self.buffer.drain(..n);
        self.buffer.spare_capacity_mut().zeroize();
        taken
    }

    /// Append received bytes without leaving a copy in a freed allocation
    fn append(&mut self, bytes: &[u8]) {
        let needed = self.buffer.len() + bytes.len();
        if needed > self.buffer.capacity() {
            let mut grown = Zeroizing::new(Vec::with_capacity(needed.max(self.buffer.capacity() * 2)));
            grown.extend_from_slice(&self.buffer);
            // The old allocation is wiped as it drops
            self.buffer = grown;
        }
        self.buffer.extend_from_slice(bytes);
    }
}
