//! FTP command-line assembly and parsing
//!
//! Control bytes arrive a few at a time; the assembler accumulates them into
//! a fixed buffer and yields a parsed command once a line feed shows up.

use crate::constants::{CMD_CAPACITY, VERB_CAPACITY};
use crate::protocol::commands::Verb;
use crate::utils::BoundedString;

/// A completed command line split into verb and argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommand {
    pub verb: Verb,
    token: BoundedString<VERB_CAPACITY>,
    arg: BoundedString<CMD_CAPACITY>,
}

impl ParsedCommand {
    /// The verb as received, upper-cased.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Everything after the first space, leading spaces removed.
    pub fn arg(&self) -> &str {
        &self.arg
    }
}

/// Outcome of feeding one byte to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// The line is not complete yet.
    Pending,
    /// A bare line terminator; nothing to do.
    Empty,
    Command(ParsedCommand),
    /// The line overflowed, named a verb longer than four characters, or was
    /// not valid UTF-8.
    SyntaxError,
}

/// Accumulates control-connection bytes into command lines.
#[derive(Debug, Clone)]
pub struct LineAssembler {
    buf: [u8; CMD_CAPACITY],
    len: usize,
    discarding: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self {
            buf: [0; CMD_CAPACITY],
            len: 0,
            discarding: false,
        }
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops any partial line.
    pub fn reset(&mut self) {
        self.len = 0;
        self.discarding = false;
    }

    pub fn push(&mut self, byte: u8) -> LineEvent {
        if self.discarding {
            if byte == b'\n' {
                self.discarding = false;
            }
            return LineEvent::Pending;
        }

        match byte {
            b'\r' => LineEvent::Pending,
            b'\n' => {
                let event = match std::str::from_utf8(&self.buf[..self.len]) {
                    Ok("") => LineEvent::Empty,
                    Ok(line) => parse_line(line).map_or(LineEvent::SyntaxError, LineEvent::Command),
                    Err(_) => LineEvent::SyntaxError,
                };
                self.len = 0;
                event
            }
            _ if self.len == CMD_CAPACITY => {
                // Skip the rest of the oversized line up to its terminator.
                self.len = 0;
                self.discarding = true;
                LineEvent::SyntaxError
            }
            _ => {
                self.buf[self.len] = if byte == b'\\' { b'/' } else { byte };
                self.len += 1;
                LineEvent::Pending
            }
        }
    }
}

/// Splits a line at its first space into an upper-cased verb and the
/// argument. Returns `None` when the verb is longer than four characters.
pub fn parse_line(line: &str) -> Option<ParsedCommand> {
    let (word, rest) = match line.split_once(' ') {
        Some((word, rest)) => (word, rest.trim_start_matches(' ')),
        None => (line, ""),
    };
    if word.len() > VERB_CAPACITY {
        return None;
    }

    let mut token = BoundedString::<VERB_CAPACITY>::new();
    for c in word.chars() {
        token.push(c.to_ascii_uppercase()).ok()?;
    }
    Some(ParsedCommand {
        verb: Verb::parse(&token),
        token,
        arg: BoundedString::try_from_str(rest).ok()?,
    })
}
