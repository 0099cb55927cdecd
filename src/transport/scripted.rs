//! In-memory stand-in for the token
//!
//! Each scripted request line releases its reply bytes only once the host has
//! written that line, so replies never arrive "early" and stale-input
//! handling can be exercised with `with_incoming`, `with_late` and
//! `with_noise`.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use super::{Link, LINE_TERMINATOR};

#[derive(Default)]
pub struct ScriptedLink {
    script: VecDeque<(String, Vec<u8>)>,
    incoming: VecDeque<u8>,
    late: VecDeque<(usize, Vec<u8>)>,
    noise: Vec<u8>,
    reads: usize,
    pending_line: Vec<u8>,
    written: Vec<u8>,
    max_read: Option<usize>,
    clears: usize,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect the host to write `line`, then make `reply` readable
    pub fn on_line(mut self, line: &str, reply: &str) -> Self {
        self.script.push_back((line.to_string(), reply.as_bytes().to_vec()));
        self
    }

    /// Bytes already in flight before the host writes anything
    pub fn with_incoming(mut self, bytes: &[u8]) -> Self {
        self.incoming.extend(bytes);
        self
    }

    /// Bytes that arrive on the `nth_read` read call, counting from 1
    pub fn with_late(mut self, nth_read: usize, bytes: &[u8]) -> Self {
        self.late.push_back((nth_read, bytes.to_vec()));
        self
    }

    /// A line that never goes quiet: `bytes` again whenever nothing else is queued
    pub fn with_noise(mut self, bytes: &[u8]) -> Self {
        self.noise = bytes.to_vec();
        self
    }

    /// Deliver at most `n` bytes per read call
    pub fn with_max_read(mut self, n: usize) -> Self {
        self.max_read = Some(n);
        self
    }

    /// Queue bytes as if the device sent them unprompted
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes);
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    /// True once every scripted line has been written
    pub fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }

    fn complete_line(&mut self) {
        let line = String::from_utf8_lossy(&self.pending_line).into_owned();
        self.pending_line.clear();

        let (expected, reply) = self
            .script
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted line written: {:?}", line));
        assert_eq!(line, expected, "unexpected line written to the device");
        self.incoming.extend(reply);
    }
}

impl Write for ScriptedLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            self.written.push(byte);
            if byte == LINE_TERMINATOR {
                self.complete_line();
            } else {
                self.pending_line.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        while self.late.front().is_some_and(|(nth, _)| *nth <= self.reads) {
            if let Some((_, bytes)) = self.late.pop_front() {
                self.incoming.extend(bytes);
            }
        }
        if self.incoming.is_empty() {
            self.incoming.extend(self.noise.iter().copied());
        }
        if self.incoming.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "nothing scripted"));
        }

        let limit = self.max_read.unwrap_or(usize::MAX);
        let n = buf.len().min(self.incoming.len()).min(limit);
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Link for ScriptedLink {
    fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.incoming.clear();
        self.clears += 1;
        Ok(())
    }
}
