//! Server module
//!
//! The poll-driven session controller and the network interface it runs on.

pub mod core;
pub mod tcp;
pub mod transport;

pub use self::core::{FtpServer, ServerOptions};
pub use self::tcp::{TcpConnection, TcpSettings, TcpTransport};
pub use self::transport::{Connection, Transport};
