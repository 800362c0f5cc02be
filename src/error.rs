//! Error types for portstat
//!
//! Every fallible operation returns [`Result`]. OS failures keep the original
//! [`std::io::Error`] so the numeric errno survives to the caller; the two
//! library-level failures (over-long directory entry names and buffer
//! reservation) have their own variants.

use std::collections::TryReserveError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// The system call (or libc wrapper) that produced an OS error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `lstat(2)` on the queried path
    Lstat,
    /// `opendir(3)`
    OpenDir,
    /// `readdir(3)`
    ReadDir,
    /// `closedir(3)`
    CloseDir,
    /// `open(2)` of a file to hash
    Open,
    /// `read(2)` while streaming a file to hash
    Read,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lstat => "lstat",
            Self::OpenDir => "opendir",
            Self::ReadDir => "readdir",
            Self::CloseDir => "closedir",
            Self::Open => "open",
            Self::Read => "read",
        };
        f.write_str(name)
    }
}

/// Errors returned by portstat operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A system call failed; `source` carries the OS error code
    #[error("{op} {path:?}: {source}")]
    Os {
        /// Failing operation
        op: Operation,
        /// Path the operation was applied to
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A directory entry name exceeded the fixed bound
    #[error("directory entry name is {name_len} bytes, limit is {limit}")]
    NameTooLong {
        /// Length of the offending native name in bytes
        name_len: usize,
        /// Maximum accepted length in bytes
        limit: usize,
    },

    /// The per-call read buffer could not be reserved
    #[error("failed to allocate {size} byte read buffer")]
    Allocation {
        /// Requested buffer size
        size: usize,
        /// Allocator failure
        #[source]
        source: TryReserveError,
    },
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `ENOENT`
    NotFound,
    /// `EACCES` or `EPERM`
    PermissionDenied,
    /// `ENOTDIR`
    NotADirectory,
    /// Any other OS error
    Io,
    /// Directory entry name over the bound
    NameTooLong,
    /// Buffer reservation failed
    Allocation,
}

impl Error {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Os { source, .. } => match source.raw_os_error() {
                Some(libc::ENOENT) => ErrorKind::NotFound,
                Some(libc::EACCES | libc::EPERM) => ErrorKind::PermissionDenied,
                Some(libc::ENOTDIR) => ErrorKind::NotADirectory,
                _ => ErrorKind::Io,
            },
            Self::NameTooLong { .. } => ErrorKind::NameTooLong,
            Self::Allocation { .. } => ErrorKind::Allocation,
        }
    }

    /// The OS error code, if this error came from a system call
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Os { source, .. } => source.raw_os_error(),
            Self::NameTooLong { .. } | Self::Allocation { .. } => None,
        }
    }

    /// The operation that failed, for OS errors
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Os { op, .. } => Some(*op),
            Self::NameTooLong { .. } | Self::Allocation { .. } => None,
        }
    }
}

/// Wrap an OS error with the operation and path it came from
pub(crate) fn os_error(op: Operation, path: &Path, source: io::Error) -> Error {
    Error::Os {
        op,
        path: path.to_path_buf(),
        source,
    }
}
