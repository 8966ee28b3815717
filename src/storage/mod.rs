//! File system storage management
//!
//! The filesystem collaborator interface, its local-disk adapter, and the
//! pure helpers that render what it returns.

pub mod filesystem;
pub mod listing;
pub mod local;
pub mod timestamp;

pub use filesystem::{DirEntry, FileHandle, FileSystem};
pub use listing::{ListFormat, write_entry};
pub use local::LocalFileSystem;
pub use timestamp::{DateTime, PackedDateTime, Timestamp, parse_timestamp, split_mdtm_argument};
