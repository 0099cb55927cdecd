//! Operator-facing side: terminal prompts, reply rendering, shell

pub mod connect;
pub mod exec;
pub mod shell;

use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::crypto::Secret;
use crate::error::{LlaveroError, Result};
use crate::prompt::SecretSource;

/// Masked input from the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalSource;

impl SecretSource for TerminalSource {
    fn read_masked(&mut self, prompt: &str) -> Result<Secret> {
        let entry = rpassword::prompt_password(format!("{} ", prompt)).map_err(|e| match e.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof => LlaveroError::Cancelled,
            _ => LlaveroError::Io(e),
        })?;
        Ok(Secret::from(entry))
    }

    fn reject(&mut self, reason: &LlaveroError) {
        println!("{} {}, try again", "Error:".red(), reason);
    }
}

/// Ask a yes/no question on stdin; anything but yes is no
pub fn confirm(prompt: &str) -> bool {
    confirm_from(prompt, &mut io::stdin().lock().lines())
}

/// Ask a yes/no question, reading the answer from `lines`
///
/// Callers that already hold stdin pass their own reader here.
pub fn confirm_from<I>(prompt: &str, lines: &mut I) -> bool
where
    I: Iterator<Item = io::Result<String>>,
{
    print!("{} [y/N] ", prompt);
    io::stdout().flush().ok();

    match lines.next() {
        Some(Ok(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        _ => false,
    }
}
