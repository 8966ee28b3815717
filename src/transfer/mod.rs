//! Transfer module for FTP server
//!
//! Handles the data channel, PORT/PASV negotiation and the file copy loop.

pub mod data_channel;
pub mod file_ops;
pub mod modes;
pub mod results;

pub use data_channel::{DataChannel, parse_port_argument};
pub use file_ops::{Transfer, abort, finish};
pub use modes::{Direction, TransferMode};
pub use results::{ChunkOutcome, PassiveModeResult, TransferSummary};
