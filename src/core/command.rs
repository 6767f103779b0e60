//! In-band remote-control commands carried in received text.
//!
//! Grammar (case-sensitive, surrounding whitespace ignored):
//!
//! ```text
//! /test <payload>   echo <payload> back over the air
//! /c <n>            retune to channel n, 0..=125
//! ```
//!
//! Anything else, including malformed arguments, parses to `None`. Noisy
//! links produce garbage that looks like commands, and it is dropped
//! without comment.

use crate::types::MAX_CHANNEL;

/// Leading character that marks text as a command.
pub const COMMAND_SENTINEL: char = '/';

/// A recognized remote-control directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Send the payload back to the sender.
    Test(String),
    /// Retune to the given channel.
    SetChannel(u8),
}

impl RemoteCommand {
    /// Parses one received line.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with(COMMAND_SENTINEL) {
            return None;
        }
        let (name, arg) = match text.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (text, ""),
        };

        match name {
            "/test" if !arg.is_empty() => Some(Self::Test(arg.to_string())),
            "/c" => {
                if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let channel: u8 = arg.parse().ok()?;
                (channel <= MAX_CHANNEL).then_some(Self::SetChannel(channel))
            }
            _ => None,
        }
    }
}

/// Whether `text` starts with the command sentinel, recognized or not.
pub fn looks_like_command(text: &str) -> bool {
    text.trim_start().starts_with(COMMAND_SENTINEL)
}
