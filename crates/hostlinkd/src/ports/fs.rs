//! Filesystem port backed by `std::fs`.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use thiserror::Error;

/// Kind of a directory entry as seen by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file (or anything that is not a directory).
    File,
    /// Directory.
    Directory,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Entry name without any path components.
    pub name: String,
    /// File or directory.
    pub kind: EntryKind,
    /// Byte length reported by the filesystem.
    pub len: u64,
}

/// Filesystem failures, classified the way the protocol reports them.
#[derive(Debug, Error)]
pub enum FsError {
    /// The path does not name an existing entry.
    #[error("not found: {path}")]
    NotFound {
        /// Offending path.
        path: String,
    },
    /// The operation was refused by the operating system.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// Offending path.
        path: String,
    },
    /// Any other filesystem failure.
    #[error("{message}")]
    Other {
        /// Underlying failure text.
        message: String,
    },
}

impl FsError {
    fn classify(path: &str, error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path: path.to_owned(),
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_owned(),
            },
            _ => Self::Other {
                message: error.to_string(),
            },
        }
    }
}

/// Filesystem operations the session engine needs.
pub trait FileStore: Send + Sync {
    /// Reports whether the path exists and what kind of entry it names.
    fn probe(&self, path: &str) -> Result<Option<EntryKind>, FsError>;

    /// Lists the immediate entries of a directory.
    fn list(&self, path: &str) -> Result<Vec<EntryInfo>, FsError>;

    /// Deletes a regular file.
    fn delete_file(&self, path: &str) -> Result<(), FsError>;

    /// Renames an entry.
    fn rename(&self, from: &str, to: &str) -> Result<(), FsError>;

    /// Opens a regular file for reading, returning the reader and its length.
    fn open_read(&self, path: &str) -> Result<(Box<dyn Read + Send>, u64), FsError>;

    /// Creates (or truncates) a file for writing.
    fn create_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError>;

    /// Creates the path's parent directories as needed.
    fn ensure_parent(&self, path: &str) -> Result<(), FsError>;
}

/// Production [`FileStore`] operating directly on the host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFileStore;

impl HostFileStore {
    /// Builds a new store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileStore for HostFileStore {
    fn probe(&self, path: &str) -> Result<Option<EntryKind>, FsError> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(Some(if metadata.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            })),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(FsError::classify(path, &error)),
        }
    }

    fn list(&self, path: &str) -> Result<Vec<EntryInfo>, FsError> {
        let entries = fs::read_dir(path).map_err(|error| FsError::classify(path, &error))?;
        let mut listing = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| FsError::classify(path, &error))?;
            // Entries that vanish between readdir and stat are skipped.
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            listing.push(EntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if metadata.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                len: metadata.len(),
            });
        }
        Ok(listing)
    }

    fn delete_file(&self, path: &str) -> Result<(), FsError> {
        fs::remove_file(path).map_err(|error| FsError::classify(path, &error))
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        fs::rename(from, to).map_err(|error| FsError::classify(from, &error))
    }

    fn open_read(&self, path: &str) -> Result<(Box<dyn Read + Send>, u64), FsError> {
        let metadata = fs::metadata(path).map_err(|error| FsError::classify(path, &error))?;
        if !metadata.is_file() {
            return Err(FsError::NotFound {
                path: path.to_owned(),
            });
        }
        let file = File::open(path).map_err(|error| FsError::classify(path, &error))?;
        Ok((Box::new(file), metadata.len()))
    }

    fn create_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError> {
        let file = File::create(path).map_err(|error| FsError::classify(path, &error))?;
        Ok(Box::new(file))
    }

    fn ensure_parent(&self, path: &str) -> Result<(), FsError> {
        let parent = match Path::new(path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return Ok(()),
        };
        fs::create_dir_all(parent).map_err(|error| FsError::classify(path, &error))
    }
}
