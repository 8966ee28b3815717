//! Error handling
//!
//! Defines error types and handling for the FTP server.

pub mod types;

pub use types::*;
