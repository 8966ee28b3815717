//! Filesystem collaborator
//!
//! The server only sees the mounted volume through these traits. Paths are
//! always absolute, `/`-separated virtual paths produced by the path resolver.

use std::io;

use crate::error::StorageError;
use crate::storage::timestamp::{DateTime, PackedDateTime};

/// One entry produced while enumerating a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: PackedDateTime,
}

/// Open file. Dropping the handle closes it.
pub trait FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
    fn size(&self) -> u64;
}

/// Operations the FTP verbs need from the mounted volume.
pub trait FileSystem {
    type File: FileHandle;
    type Dir: Iterator<Item = DirEntry>;

    fn exists(&self, path: &str) -> bool;
    fn is_dir(&self, path: &str) -> bool;

    fn open_read(&mut self, path: &str) -> Result<Self::File, StorageError>;
    /// Creates the file, truncating any previous content.
    fn create(&mut self, path: &str) -> Result<Self::File, StorageError>;

    fn remove(&mut self, path: &str) -> Result<(), StorageError>;
    fn mkdir(&mut self, path: &str) -> Result<(), StorageError>;
    fn rmdir(&mut self, path: &str) -> Result<(), StorageError>;
    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError>;

    fn read_dir(&mut self, path: &str) -> Result<Self::Dir, StorageError>;

    fn modified(&self, path: &str) -> Result<PackedDateTime, StorageError>;
    fn set_modified(&mut self, path: &str, when: &DateTime) -> Result<(), StorageError>;

    /// Free space of the volume in megabytes.
    fn free_mb(&self) -> u64;
    /// Total capacity of the volume in megabytes.
    fn capacity_mb(&self) -> u64;
}
