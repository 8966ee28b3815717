//! pollftpd
//!
//! A single-session FTP server driven by one non-blocking `poll()` entry
//! point. The network, the filesystem and the clock are collaborators behind
//! traits; std-backed implementations are provided for running on a host.

pub mod auth;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod navigate;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;
pub mod utils;

pub use config::ServerConfig;
pub use server::{FtpServer, ServerOptions, TcpTransport};
pub use storage::LocalFileSystem;
pub use utils::MonotonicClock;
