//! The token's command set
//!
//! Commands are a closed set. `COMMANDS` is the single table holding each
//! command's wire literal, argument shape and help text; the shell, the
//! one-shot CLI and the session all dispatch through it.

use std::fmt;

use tracing::warn;

use crate::error::{LlaveroError, Result};

/// The token keeps 7 tag characters plus a terminating NUL
pub const MAX_TAG_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Handshake,
    SetTagSecret,
    GetTagSecret,
    ListTags,
    FactoryReset,
    SetDeviceKey,
    SyncClock,
    SetTotpTag,
}

struct CommandInfo {
    command: Command,
    wire: &'static str,
    takes_tag: bool,
    help: &'static str,
}

const COMMANDS: [CommandInfo; 8] = [
    CommandInfo {
        command: Command::Handshake,
        wire: "hi",
        takes_tag: false,
        help: "Say hi.",
    },
    CommandInfo {
        command: Command::SetTagSecret,
        wire: "set",
        takes_tag: true,
        help: "set [tag] -> secret prompt. [tag] is 7 char max.",
    },
    CommandInfo {
        command: Command::GetTagSecret,
        wire: "get",
        takes_tag: true,
        help: "get [tag]. [tag] is 7 char max.",
    },
    CommandInfo {
        command: Command::ListTags,
        wire: "ls",
        takes_tag: false,
        help: "Lists all tags.",
    },
    CommandInfo {
        command: Command::FactoryReset,
        wire: "init",
        takes_tag: false,
        help: "Factory reset, push confirmation.",
    },
    CommandInfo {
        command: Command::SetDeviceKey,
        wire: "secret",
        takes_tag: false,
        help: "Set the AES key, derived from a passphrase.",
    },
    CommandInfo {
        command: Command::SyncClock,
        wire: "time",
        takes_tag: false,
        help: "Tell the token what time it is. Needed for TOTP codes.",
    },
    CommandInfo {
        command: Command::SetTotpTag,
        wire: "sett",
        takes_tag: true,
        help: "sett [tag]. Sets [tag] for TOTP, the seed is expected in base32 Google format.",
    },
];

impl Command {
    pub fn all() -> impl Iterator<Item = Command> {
        COMMANDS.iter().map(|info| info.command)
    }

    fn info(self) -> &'static CommandInfo {
        // COMMANDS is declared in variant order
        &COMMANDS[self as usize]
    }

    /// Request line sent to the token
    pub fn wire_name(self) -> &'static str {
        self.info().wire
    }

    pub fn takes_tag(self) -> bool {
        self.info().takes_tag
    }

    pub fn help(self) -> &'static str {
        self.info().help
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        COMMANDS
            .iter()
            .find(|info| info.wire == name)
            .map(|info| info.command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Name of a secret slot on the token
///
/// Length is not enforced; the token decides what it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.chars().count() > MAX_TAG_LEN {
            warn!(tag = %name, max = MAX_TAG_LEN, "tag is longer than the token stores");
        }
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A command together with its argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Handshake,
    Set(Tag),
    Get(Tag),
    List,
    Reset,
    SetDeviceKey,
    SyncClock,
    SetTotp(Tag),
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Self::Handshake => Command::Handshake,
            Self::Set(_) => Command::SetTagSecret,
            Self::Get(_) => Command::GetTagSecret,
            Self::List => Command::ListTags,
            Self::Reset => Command::FactoryReset,
            Self::SetDeviceKey => Command::SetDeviceKey,
            Self::SyncClock => Command::SyncClock,
            Self::SetTotp(_) => Command::SetTotpTag,
        }
    }

    /// Build a request from a command and its (optional) argument
    ///
    /// Commands without a tag ignore the argument.
    pub fn new(command: Command, arg: Option<&str>) -> Result<Self> {
        let tag = || match arg {
            Some(arg) if !arg.is_empty() => Ok(Tag::new(arg)),
            _ => Err(LlaveroError::Usage(format!("{} <tag>", command.wire_name()))),
        };

        Ok(match command {
            Command::Handshake => Self::Handshake,
            Command::SetTagSecret => Self::Set(tag()?),
            Command::GetTagSecret => Self::Get(tag()?),
            Command::ListTags => Self::List,
            Command::FactoryReset => Self::Reset,
            Command::SetDeviceKey => Self::SetDeviceKey,
            Command::SyncClock => Self::SyncClock,
            Command::SetTotpTag => Self::SetTotp(tag()?),
        })
    }

    /// Parse a shell line such as `set mail`
    ///
    /// Everything after the command word is the tag, passed through as typed.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, Some(rest.trim())),
            None => (line, None),
        };

        let command =
            Command::from_wire_name(word).ok_or_else(|| LlaveroError::UnknownCommand(word.to_string()))?;
        Self::new(command, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let names: Vec<_> = Command::all().map(Command::wire_name).collect();
        assert_eq!(
            names,
            vec!["hi", "set", "get", "ls", "init", "secret", "time", "sett"]
        );
    }

    #[test]
    fn test_table_matches_variant_order() {
        for command in Command::all() {
            assert_eq!(Command::from_wire_name(command.wire_name()), Some(command));
        }
    }

    #[test]
    fn test_parse_tagged_commands() {
        assert_eq!(Request::parse("set mail").unwrap(), Request::Set(Tag::new("mail")));
        assert_eq!(Request::parse("  get  bank ").unwrap(), Request::Get(Tag::new("bank")));
        assert_eq!(Request::parse("sett gh").unwrap(), Request::SetTotp(Tag::new("gh")));
    }

    #[test]
    fn test_parse_passes_long_tags_through() {
        let request = Request::parse("set averyverylongtag").unwrap();
        assert_eq!(request, Request::Set(Tag::new("averyverylongtag")));
    }

    #[test]
    fn test_parse_plain_commands() {
        assert_eq!(Request::parse("ls").unwrap(), Request::List);
        assert_eq!(Request::parse("init").unwrap(), Request::Reset);
        assert_eq!(Request::parse("secret").unwrap(), Request::SetDeviceKey);
        assert_eq!(Request::parse("time").unwrap(), Request::SyncClock);
        assert_eq!(Request::parse("hi").unwrap(), Request::Handshake);
    }

    #[test]
    fn test_parse_missing_tag() {
        let err = Request::parse("get").unwrap_err();
        assert!(matches!(err, LlaveroError::Usage(ref u) if u == "get <tag>"));
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = Request::parse("format c:").unwrap_err();
        assert!(matches!(err, LlaveroError::UnknownCommand(ref c) if c == "format"));
    }

    #[test]
    fn test_request_command_mapping() {
        assert_eq!(Request::Set(Tag::new("x")).command(), Command::SetTagSecret);
        assert_eq!(Request::SyncClock.command().wire_name(), "time");
    }
}
