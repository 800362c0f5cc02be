//! Normalized `lstat` metadata
//!
//! [`read_metadata`] queries a path without following a terminal symlink and
//! copies the native status fields into a [`NormalizedStat`], a fixed record
//! whose layout does not depend on the host platform.
//!
//! # Usage
//!
//! ```rust,no_run
//! use portstat::metadata::read_metadata;
//!
//! # fn example() -> portstat::Result<()> {
//! let stat = read_metadata("/etc/hosts")?;
//! println!("size: {}, mode: {:o}", stat.size, stat.mode);
//! println!("mtime: {}.{:09}", stat.modified.sec, stat.modified.nsec);
//! # Ok(())
//! # }
//! ```

use crate::error::{os_error, Operation, Result};
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Nanoseconds per second; every `Timespec::nsec` is below this
pub const NSEC_PER_SEC: u64 = 1_000_000_000;

/// A timestamp split into whole seconds and nanoseconds since the Unix epoch
///
/// `sec` holds the native signed seconds reinterpreted as unsigned, so a
/// pre-epoch time round-trips through `sec as i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timespec {
    /// Seconds since the epoch
    pub sec: u64,
    /// Sub-second nanoseconds, `0..=999_999_999`
    pub nsec: u64,
}

impl Timespec {
    fn from_native(sec: i64, nsec: i64) -> Self {
        Self {
            sec: sec as u64,
            // The kernel keeps tv_nsec in range; clamp anything else.
            nsec: u64::try_from(nsec).map_or(0, |n| n.min(NSEC_PER_SEC - 1)),
        }
    }

    /// Convert to `SystemTime`, treating `sec` as signed
    ///
    /// Returns `None` if the value is outside what `SystemTime` can represent.
    #[must_use]
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let secs = self.sec as i64;
        let nanos = Duration::from_nanos(self.nsec);
        if secs >= 0 {
            SystemTime::UNIX_EPOCH
                .checked_add(Duration::from_secs(secs.unsigned_abs()))?
                .checked_add(nanos)
        } else {
            SystemTime::UNIX_EPOCH
                .checked_sub(Duration::from_secs(secs.unsigned_abs()))?
                .checked_add(nanos)
        }
    }
}

/// Platform-independent snapshot of a file's status
///
/// Every integer field is widened to `i64`. Unsigned native values above
/// `i64::MAX` keep their bit pattern (`field as u64` recovers them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizedStat {
    /// Device containing the file
    pub dev: i64,
    /// Inode number
    pub ino: i64,
    /// Number of hard links
    pub nlink: i64,
    /// File type and permission bits
    pub mode: i64,
    /// Owner user ID
    pub uid: i64,
    /// Owner group ID
    pub gid: i64,
    /// Device ID, for character and block special files
    pub rdev: i64,
    /// Size in bytes (symlinks: length of the target path)
    pub size: i64,
    /// Preferred I/O block size
    pub blksize: i64,
    /// Number of 512-byte blocks allocated
    pub blocks: i64,
    /// Last access
    pub accessed: Timespec,
    /// Last content modification
    pub modified: Timespec,
    /// Last status change
    pub changed: Timespec,
}

impl NormalizedStat {
    /// Copy the native status fields into the normalized layout
    ///
    /// This is the only place that knows native field names. `std` maps the
    /// per-platform timestamp members (`st_atim` on Linux, `st_atimespec` on
    /// Darwin and the BSDs) onto `atime`/`atime_nsec`.
    #[must_use]
    pub fn from_native(meta: &Metadata) -> Self {
        Self {
            dev: meta.dev() as i64,
            ino: meta.ino() as i64,
            nlink: meta.nlink() as i64,
            mode: i64::from(meta.mode()),
            uid: i64::from(meta.uid()),
            gid: i64::from(meta.gid()),
            rdev: meta.rdev() as i64,
            size: meta.size() as i64,
            blksize: meta.blksize() as i64,
            blocks: meta.blocks() as i64,
            accessed: Timespec::from_native(meta.atime(), meta.atime_nsec()),
            modified: Timespec::from_native(meta.mtime(), meta.mtime_nsec()),
            changed: Timespec::from_native(meta.ctime(), meta.ctime_nsec()),
        }
    }

    /// The `S_IFMT` portion of `mode`
    #[must_use]
    pub fn file_type_bits(&self) -> i64 {
        self.mode & i64::from(libc::S_IFMT)
    }

    /// Check if this is a regular file
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.file_type_bits() == i64::from(libc::S_IFREG)
    }

    /// Check if this is a directory
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type_bits() == i64::from(libc::S_IFDIR)
    }

    /// Check if this is a symlink
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.file_type_bits() == i64::from(libc::S_IFLNK)
    }

    /// Get file permissions (mode & 0o7777)
    #[must_use]
    pub fn permissions(&self) -> i64 {
        self.mode & 0o7777
    }
}

/// Read normalized metadata for `path` without following a final symlink
///
/// The file is not opened, so its access time is left alone.
///
/// # Errors
///
/// Returns [`Error::Os`](crate::Error::Os) with operation
/// [`Operation::Lstat`] if:
/// - The path does not exist
/// - Permission is denied on a path component
/// - A path component is not a directory
/// - The path or a component is too long
/// - Any other I/O error occurs
pub fn read_metadata(path: impl AsRef<Path>) -> Result<NormalizedStat> {
    let path = path.as_ref();
    let meta =
        std::fs::symlink_metadata(path).map_err(|e| os_error(Operation::Lstat, path, e))?;
    Ok(NormalizedStat::from_native(&meta))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_regular_file_size_and_links() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        std::fs::write(&path, vec![7u8; 4321]).unwrap();

        let stat = read_metadata(&path).unwrap();
        assert_eq!(stat.size, 4321);
        assert!(stat.nlink >= 1);
        assert!(stat.is_file());
        assert!(!stat.is_dir());
        assert!(!stat.is_symlink());
    }

    #[test]
    fn test_matches_std_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        std::fs::write(&path, b"hello").unwrap();

        let stat = read_metadata(&path).unwrap();
        let meta = std::fs::symlink_metadata(&path).unwrap();
        assert_eq!(stat.ino as u64, meta.ino());
        assert_eq!(stat.dev as u64, meta.dev());
        assert_eq!(stat.uid, i64::from(meta.uid()));
        assert_eq!(stat.gid, i64::from(meta.gid()));
        assert_eq!(stat.mode, i64::from(meta.mode()));
        assert_eq!(stat.modified.sec as i64, meta.mtime());
        assert_eq!(stat.modified.nsec as i64, meta.mtime_nsec());
    }

    #[test]
    fn test_directory() {
        let temp_dir = TempDir::new().unwrap();
        let stat = read_metadata(temp_dir.path()).unwrap();
        assert!(stat.is_dir());
        assert!(stat.nlink >= 1);
    }

    #[test]
    fn test_symlink_not_followed() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target.txt");
        let link = temp_dir.path().join("link");
        std::fs::write(&target, b"content that is longer than the link").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let link_stat = read_metadata(&link).unwrap();
        let target_stat = read_metadata(&target).unwrap();
        assert!(link_stat.is_symlink());
        assert_ne!(link_stat.ino, target_stat.ino);
    }

    #[test]
    fn test_dangling_symlink_is_readable() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("dangling");
        std::os::unix::fs::symlink(temp_dir.path().join("nowhere"), &link).unwrap();

        assert!(read_metadata(&link).unwrap().is_symlink());
    }

    #[test]
    fn test_nonexistent_path() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_metadata(temp_dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn test_component_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();

        let err = read_metadata(file.join("child")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
    }

    #[test]
    fn test_nanoseconds_in_range() {
        let temp_dir = TempDir::new().unwrap();
        let stat = read_metadata(temp_dir.path()).unwrap();
        for ts in [stat.accessed, stat.modified, stat.changed] {
            assert!(ts.nsec < NSEC_PER_SEC);
        }
    }

    #[test]
    fn test_timespec_pre_epoch_round_trip() {
        let ts = Timespec::from_native(-10, 500);
        assert_eq!(ts.sec as i64, -10);
        let expected = SystemTime::UNIX_EPOCH - Duration::from_secs(10) + Duration::from_nanos(500);
        assert_eq!(ts.to_system_time(), Some(expected));
    }

    #[test]
    fn test_timespec_clamps_bad_nanoseconds() {
        assert_eq!(Timespec::from_native(1, -1).nsec, 0);
        assert_eq!(Timespec::from_native(1, 5_000_000_000).nsec, NSEC_PER_SEC - 1);
    }
}
