//! Interactive `(LLAVERO)` shell

use std::io::{self, BufRead, Write};

use colored::Colorize;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::prompt::SecretSource;
use crate::protocol::{Command, CommandSession, Request, SessionState};
use crate::transport::Link;

use super::{confirm_from, connect, exec, TerminalSource};

const INTRO: &str = "Hello world. Type help or ? to list commands.";
const PROMPT: &str = "(LLAVERO) ";

/// What the shell should do with one input line
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Quit,
    Help(Option<String>),
    Request(Request),
}

fn parse_input(line: &str) -> Result<Input> {
    let line = line.trim();
    match line {
        "" => return Ok(Input::Empty),
        "quit" | "exit" | "EOF" => return Ok(Input::Quit),
        "help" | "?" => return Ok(Input::Help(None)),
        _ => {}
    }

    if let Some(topic) = line.strip_prefix("help ").or_else(|| line.strip_prefix("? ")) {
        return Ok(Input::Help(Some(topic.trim().to_string())));
    }

    Request::parse(line).map(Input::Request)
}

fn print_help(topic: Option<&str>) {
    match topic {
        Some(name) => match Command::from_wire_name(name) {
            Some(command) => println!("{}", command.help()),
            None => println!("*** No help on {}", name),
        },
        None => {
            println!();
            println!("{}", "Commands:".cyan().bold());
            for command in Command::all() {
                let usage = if command.takes_tag() {
                    format!("{} <tag>", command.wire_name())
                } else {
                    command.wire_name().to_string()
                };
                println!("  {:<12} {}", usage.cyan(), command.help());
            }
            println!("  {:<12} {}", "help [cmd]".cyan(), "Show this list or one command's help.");
            println!("  {:<12} {}", "quit".cyan(), "Leave the shell.");
            println!();
        }
    }
}

/// Connect and read commands from stdin until quit or EOF
pub fn run(config: &Config, assume_yes: bool) -> Result<()> {
    let session = connect::run(config)?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    serve(session, &mut lines, &mut TerminalSource, assume_yes, || {
        connect::run(config)
    })?;
    Ok(())
}

/// The shell loop over any line source
///
/// Reset confirmations are read from `lines` too, so stdin is never locked
/// twice. After a recoverable fault the session is dropped and `reconnect`
/// opens a new one. A desync or a broken link ends the shell with that error.
/// Returns the session still open when the operator leaves.
fn serve<L, I, F>(
    mut session: CommandSession<L>,
    lines: &mut I,
    source: &mut dyn SecretSource,
    assume_yes: bool,
    mut reconnect: F,
) -> Result<CommandSession<L>>
where
    L: Link,
    I: Iterator<Item = io::Result<String>>,
    F: FnMut() -> Result<CommandSession<L>>,
{
    println!("{}", INTRO);

    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => {
                println!();
                return Ok(session);
            }
        };

        let request = match parse_input(&line) {
            Ok(Input::Empty) => continue,
            Ok(Input::Quit) => return Ok(session),
            Ok(Input::Help(topic)) => {
                print_help(topic.as_deref());
                continue;
            }
            Ok(Input::Request(request)) => request,
            Err(e) => {
                println!("{} {}", "Error:".red(), e);
                continue;
            }
        };

        let mut ask = |prompt: &str| assume_yes || confirm_from(prompt, lines);
        match exec::run(&mut session, request, source, &mut ask) {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                println!("{} {}", "Error:".red(), e);
                if session.state() == SessionState::Faulted {
                    info!("reconnecting after session fault");
                    println!("{}", "Session lost sync with the token, reconnecting.".yellow());
                    // Close the port before reopening it
                    drop(session);
                    session = reconnect()?;
                }
            }
        }
    }
}
