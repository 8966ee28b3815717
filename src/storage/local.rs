//! Local filesystem adapter
//!
//! Mounts a host directory as the FTP volume. Virtual paths are joined onto
//! the server root; any `..` component is refused so clients stay inside it.

use chrono::{Datelike, NaiveDate, Timelike, Utc};
use filetime::{FileTime, set_file_mtime};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use sysinfo::{DiskExt, System, SystemExt};

use crate::error::StorageError;
use crate::storage::filesystem::{DirEntry, FileHandle, FileSystem};
use crate::storage::timestamp::{DateTime, PackedDateTime};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Open file on the host filesystem.
#[derive(Debug)]
pub struct LocalFile {
    file: File,
}

impl FileHandle for LocalFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)
    }

    fn size(&self) -> u64 {
        self.file.metadata().map(|m| m.len()).unwrap_or(0)
    }
}

/// Directory enumeration; unreadable entries are skipped.
#[derive(Debug)]
pub struct LocalDir {
    entries: fs::ReadDir,
}

impl Iterator for LocalDir {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        for entry in self.entries.by_ref() {
            let Ok(entry) = entry else { continue };
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let modified = metadata
                .modified()
                .map(pack_system_time)
                .unwrap_or_default();
            return Some(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modified,
            });
        }
        None
    }
}

/// `FileSystem` rooted at a host directory.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    /// Mounts `root`, creating it when missing.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a virtual absolute path onto the host.
    fn real_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        if path.split('/').any(|component| component == "..") {
            warn!("Refusing path outside the server root: {}", path);
            return Err(StorageError::PathTraversal(path.to_string()));
        }
        let relative = path.trim_start_matches('/');
        Ok(if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        })
    }

    fn disk_space(&self) -> Option<(u64, u64)> {
        let mut sys = System::new();
        sys.refresh_disks_list();
        sys.disks()
            .iter()
            .filter(|disk| self.root.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| (disk.available_space(), disk.total_space()))
    }
}

fn storage_error(path: &str, error: io::Error) -> StorageError {
    match error.kind() {
        ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
        ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
        _ => StorageError::Io(error),
    }
}

fn pack_system_time(time: std::time::SystemTime) -> PackedDateTime {
    let utc: chrono::DateTime<Utc> = time.into();
    PackedDateTime::pack(&DateTime {
        year: u16::try_from(utc.year()).unwrap_or(1980),
        month: utc.month() as u8,
        day: utc.day() as u8,
        hour: utc.hour() as u8,
        minute: utc.minute() as u8,
        second: utc.second() as u8,
    })
}

impl FileSystem for LocalFileSystem {
    type File = LocalFile;
    type Dir = LocalDir;

    fn exists(&self, path: &str) -> bool {
        self.real_path(path).is_ok_and(|p| p.exists())
    }

    fn is_dir(&self, path: &str) -> bool {
        self.real_path(path).is_ok_and(|p| p.is_dir())
    }

    fn open_read(&mut self, path: &str) -> Result<LocalFile, StorageError> {
        let real = self.real_path(path)?;
        if real.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let file = File::open(&real).map_err(|e| storage_error(path, e))?;
        Ok(LocalFile { file })
    }

    fn create(&mut self, path: &str) -> Result<LocalFile, StorageError> {
        let real = self.real_path(path)?;
        let file = File::create(&real).map_err(|e| storage_error(path, e))?;
        debug!("Created {} ({})", path, real.display());
        Ok(LocalFile { file })
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        fs::remove_file(real).map_err(|e| storage_error(path, e))
    }

    fn mkdir(&mut self, path: &str) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        fs::create_dir(real).map_err(|e| storage_error(path, e))
    }

    fn rmdir(&mut self, path: &str) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        if real == self.root {
            return Err(StorageError::Io(io::Error::new(
                ErrorKind::PermissionDenied,
                "cannot remove the server root",
            )));
        }
        fs::remove_dir(real).map_err(|e| storage_error(path, e))
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        let source = self.real_path(from)?;
        let target = self.real_path(to)?;
        fs::rename(source, target).map_err(|e| storage_error(from, e))
    }

    fn read_dir(&mut self, path: &str) -> Result<LocalDir, StorageError> {
        let real = self.real_path(path)?;
        if !real.is_dir() {
            return Err(StorageError::NotADirectory(path.to_string()));
        }
        let entries = fs::read_dir(real).map_err(|e| storage_error(path, e))?;
        Ok(LocalDir { entries })
    }

    fn modified(&self, path: &str) -> Result<PackedDateTime, StorageError> {
        let real = self.real_path(path)?;
        let metadata = fs::metadata(real).map_err(|e| storage_error(path, e))?;
        Ok(pack_system_time(metadata.modified()?))
    }

    fn set_modified(&mut self, path: &str, when: &DateTime) -> Result<(), StorageError> {
        let real = self.real_path(path)?;
        let stamp = NaiveDate::from_ymd_opt(when.year.into(), when.month.into(), when.day.into())
            .and_then(|date| {
                date.and_hms_opt(when.hour.into(), when.minute.into(), when.second.into())
            })
            .ok_or_else(|| StorageError::InvalidTimestamp(path.to_string()))?;
        set_file_mtime(&real, FileTime::from_unix_time(stamp.and_utc().timestamp(), 0))
            .map_err(|e| storage_error(path, e))
    }

    fn free_mb(&self) -> u64 {
        self.disk_space()
            .map(|(free, _)| free / BYTES_PER_MB)
            .unwrap_or(0)
    }

    fn capacity_mb(&self) -> u64 {
        self.disk_space()
            .map(|(_, total)| total / BYTES_PER_MB)
            .unwrap_or(0)
    }
}
