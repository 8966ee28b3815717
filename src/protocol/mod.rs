//! FTP Protocol implementation
//!
//! Handles command-line assembly, command dispatch and reply formatting.

pub mod commands;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::{CommandStatus, Verb};
pub use handlers::{CommandContext, handle_command};
pub use parser::{LineAssembler, LineEvent, ParsedCommand, parse_line};
