//! Compile-time capacities
//!
//! These bound the fixed-size buffers owned by the session, so they are
//! constants rather than configuration values.

/// Maximum length of one command line, excluding the CR/LF terminator.
pub const CMD_CAPACITY: usize = 255;

/// Maximum length of an absolute path, working directory included.
pub const PATH_CAPACITY: usize = 255;

/// Maximum length of a command verb.
pub const VERB_CAPACITY: usize = 4;

/// Bytes moved per poll by the transfer copy loop.
pub const TRANSFER_CHUNK_SIZE: usize = 1024;

/// Time allowed between accepting a connection and receiving USER/PASS.
pub const DEFAULT_AUTH_TIMEOUT_MS: u32 = 10 * 1000;

/// Hold applied after a failed login before the disconnect path runs.
pub const AUTH_FAILURE_HOLD_MS: u32 = 100;

/// Hold applied after the timeout reply so it can be flushed.
pub const TIMEOUT_HOLD_MS: u32 = 200;
