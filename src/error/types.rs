//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// A bounded buffer rejected an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("capacity of {capacity} bytes exceeded ({requested} requested)")]
pub struct CapacityError {
    pub capacity: usize,
    pub requested: usize,
}

/// Path resolver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("resolved path exceeds {capacity} bytes")]
    TooLong { capacity: usize },
}

impl From<CapacityError> for PathError {
    fn from(error: CapacityError) -> Self {
        PathError::TooLong {
            capacity: error.capacity,
        }
    }
}

/// Navigation module errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigateError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),
}

/// Authentication module errors
#[derive(Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("expected {expected}, got {received}")]
    UnexpectedCommand {
        expected: &'static str,
        received: String,
    },
    #[error("invalid username: {0}")]
    InvalidUsername(String),
    #[error("invalid password for user: {0}")]
    InvalidPassword(String),
}

/// Filesystem collaborator errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("path traversal attempt: {0}")]
    PathTraversal(String),
    #[error("invalid timestamp for {0}")]
    InvalidTimestamp(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Data channel and copy loop errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid PORT argument: {0}")]
    InvalidPortCommand(String),
    #[error("no peer address recorded for active mode")]
    NoActivePeer,
    #[error("no data connection is pending")]
    NotEstablished,
    #[error("data connection dropped")]
    ConnectionDropped,
    #[error("file I/O failed: {0}")]
    File(#[source] io::Error),
    #[error("data connection I/O failed: {0}")]
    Network(#[source] io::Error),
}

/// Startup errors of the std host
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("invalid address {0}")]
    InvalidAddress(String),
    #[error("server root {path} is unusable: {source}")]
    ServerRoot {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
}
