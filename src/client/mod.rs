//! Client session management
//!
//! State of the single FTP session and its two-phase rename.

pub mod rename;
pub mod state;

pub use rename::RenameTransaction;
pub use state::{Session, SessionState};
