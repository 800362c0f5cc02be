//! Directory enumeration one entry at a time
//!
//! [`DirectoryCursor`] owns an `opendir(3)` stream. Each call to
//! [`DirectoryCursor::next_entry`] performs one `readdir(3)` and turns the
//! native `dirent` into an owned [`DirectoryEntry`] with a coarse
//! [`EntryKind`]. No traversal policy lives here: no recursion, no filtering
//! of `.` and `..`, no symlink following.
//!
//! # Usage
//!
//! ```rust,no_run
//! use portstat::directory::DirectoryCursor;
//!
//! # fn example() -> portstat::Result<()> {
//! let mut cursor = DirectoryCursor::open("/tmp")?;
//! while let Some(entry) = cursor.next_entry()? {
//!     println!("{} {} {:?}", entry.kind().tag() as char, entry.ino(), entry.name());
//! }
//! cursor.close()?;
//! # Ok(())
//! # }
//! ```

use crate::error::{os_error, Error, Operation, Result};
use nix::errno::Errno;
use std::ffi::{CStr, CString, OsStr};
use std::io;
use std::mem::ManuallyDrop;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tracing::{debug, trace};

/// Longest accepted entry name in bytes, excluding the terminator
pub const NAME_MAX_LEN: usize = 255;

/// Coarse classification of a directory entry
///
/// Only directories are distinguished. `Unknown` means the filesystem did not
/// fill in the type and an `lstat` would be needed to find out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// `DT_DIR`
    Directory,
    /// Any reported type other than a directory
    Other,
    /// `DT_UNKNOWN`, or a platform without `d_type`
    Unknown,
}

impl EntryKind {
    /// Single-byte tag: `d`, `.` or `u`
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Directory => b'd',
            Self::Other => b'.',
            Self::Unknown => b'u',
        }
    }

    /// Parse a tag produced by [`EntryKind::tag`]
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'd' => Some(Self::Directory),
            b'.' => Some(Self::Other),
            b'u' => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// One name from a directory stream
///
/// The name is at most [`NAME_MAX_LEN`] bytes and never contains a NUL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    ino: i64,
    kind: EntryKind,
    name: Vec<u8>,
}

impl DirectoryEntry {
    /// Build an entry from raw parts, enforcing the name bound
    ///
    /// # Errors
    ///
    /// Returns [`Error::NameTooLong`] if `name` is longer than
    /// [`NAME_MAX_LEN`] bytes. The name is never truncated.
    pub fn from_raw(ino: i64, kind: EntryKind, name: &[u8]) -> Result<Self> {
        if name.len() > NAME_MAX_LEN {
            return Err(Error::NameTooLong {
                name_len: name.len(),
                limit: NAME_MAX_LEN,
            });
        }
        Ok(Self {
            ino,
            kind,
            name: name.to_vec(),
        })
    }

    /// Inode number as reported by `readdir`
    #[must_use]
    pub fn ino(&self) -> i64 {
        self.ino
    }

    /// Entry kind
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Raw name bytes
    #[must_use]
    pub fn name_bytes(&self) -> &[u8] {
        &self.name
    }

    /// Name as an `OsStr`
    #[must_use]
    pub fn name(&self) -> &OsStr {
        OsStr::from_bytes(&self.name)
    }

    /// Whether this is `.` or `..`
    #[must_use]
    pub fn is_dot_or_dotdot(&self) -> bool {
        matches!(self.name.as_slice(), b"." | b"..")
    }
}

/// Native `dirent` field access
///
/// Inode and type member names differ between kernels; nothing outside this
/// module touches them.
mod native {
    use super::EntryKind;

    #[cfg(any(target_os = "freebsd", target_os = "netbsd", target_os = "openbsd"))]
    pub(super) fn entry_inode(ent: &libc::dirent) -> i64 {
        ent.d_fileno as i64
    }

    #[cfg(not(any(target_os = "freebsd", target_os = "netbsd", target_os = "openbsd")))]
    pub(super) fn entry_inode(ent: &libc::dirent) -> i64 {
        ent.d_ino as i64
    }

    #[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
    pub(super) fn entry_kind(ent: &libc::dirent) -> EntryKind {
        match ent.d_type {
            libc::DT_UNKNOWN => EntryKind::Unknown,
            libc::DT_DIR => EntryKind::Directory,
            _ => EntryKind::Other,
        }
    }

    #[cfg(any(target_os = "solaris", target_os = "illumos"))]
    pub(super) fn entry_kind(_ent: &libc::dirent) -> EntryKind {
        EntryKind::Unknown
    }
}

/// One record as `readdir` produced it, before the name bound is checked
struct RawEntry<'a> {
    ino: i64,
    kind: EntryKind,
    name: &'a [u8],
}

/// Result of a single `readdir` call
enum ReadOutcome<'a> {
    Entry(RawEntry<'a>),
    EndOfStream,
    Failed(io::Error),
}

impl ReadOutcome<'_> {
    /// Interpret a NULL `readdir` return from the errno it left behind
    fn from_null_read(errno: Errno) -> Self {
        match errno {
            Errno::UnknownErrno => Self::EndOfStream,
            errno => Self::Failed(io::Error::from(errno)),
        }
    }
}

/// Where a cursor pulls raw records from
trait EntrySource {
    fn read(&mut self) -> ReadOutcome<'_>;
}

/// Owned `DIR *`, closed on drop
struct DirStream(NonNull<libc::DIR>);

// SAFETY: a DIR stream may move between threads; DirectoryCursor only hands
// out `&mut` access so it is never used from two threads at once.
unsafe impl Send for DirStream {}

impl DirStream {
    fn open(path: &CStr) -> io::Result<Self> {
        // SAFETY: path is a valid NUL-terminated string for the call.
        let dir = unsafe { libc::opendir(path.as_ptr()) };
        NonNull::new(dir)
            .map(Self)
            .ok_or_else(io::Error::last_os_error)
    }

    fn close(self) -> io::Result<()> {
        let this = ManuallyDrop::new(self);
        // SAFETY: the stream is open and Drop will not run for it again.
        if unsafe { libc::closedir(this.0.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

impl EntrySource for DirStream {
    fn read(&mut self) -> ReadOutcome<'_> {
        // readdir returns NULL for both end-of-stream and failure; only errno
        // tells them apart, so it must be zero going in.
        Errno::clear();
        // SAFETY: self.0 is an open stream owned by this value.
        let ent = unsafe { libc::readdir(self.0.as_ptr()) };
        // SAFETY: a non-null dirent stays valid until the next readdir or
        // closedir on this stream, both of which need `&mut self`.
        match unsafe { ent.as_ref() } {
            Some(ent) => ReadOutcome::Entry(RawEntry {
                ino: native::entry_inode(ent),
                kind: native::entry_kind(ent),
                // SAFETY: d_name is NUL-terminated by the kernel.
                name: unsafe { CStr::from_ptr(ent.d_name.as_ptr()) }.to_bytes(),
            }),
            None => ReadOutcome::from_null_read(Errno::last()),
        }
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        // SAFETY: the stream is open; close() skips this via ManuallyDrop.
        unsafe {
            libc::closedir(self.0.as_ptr());
        }
    }
}

/// An open directory stream
///
/// Dropping the cursor closes the stream; call [`DirectoryCursor::close`] to
/// observe a `closedir` failure.
pub struct DirectoryCursor {
    stream: DirStream,
    path: PathBuf,
}

impl std::fmt::Debug for DirectoryCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryCursor")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl DirectoryCursor {
    /// Open a directory stream
    ///
    /// # Errors
    ///
    /// Returns [`Error::Os`] with operation [`Operation::OpenDir`] if:
    /// - The path doesn't exist
    /// - The path is not a directory
    /// - Permission is denied
    /// - The path contains an interior NUL byte
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            os_error(
                Operation::OpenDir,
                path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path contains an interior NUL byte",
                ),
            )
        })?;
        let stream = DirStream::open(&c_path).map_err(|e| os_error(Operation::OpenDir, path, e))?;
        trace!(path = %path.display(), "opened directory stream");
        Ok(Self {
            stream,
            path: path.to_path_buf(),
        })
    }

    /// Path the cursor was opened with
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Advance by one entry
    ///
    /// Returns `Ok(None)` at end of stream, and keeps returning it on later
    /// calls. Entry order is whatever the OS produces.
    ///
    /// # Errors
    ///
    /// - [`Error::Os`] with operation [`Operation::ReadDir`] if `readdir`
    ///   fails
    /// - [`Error::NameTooLong`] if the entry's name exceeds
    ///   [`NAME_MAX_LEN`]; the cursor stays usable and the next call moves on
    ///   to the following entry
    pub fn next_entry(&mut self) -> Result<Option<DirectoryEntry>> {
        next_from(&mut self.stream, &self.path)
    }

    /// Close the stream
    ///
    /// # Errors
    ///
    /// Returns [`Error::Os`] with operation [`Operation::CloseDir`] if
    /// `closedir` fails. The stream is released either way.
    pub fn close(self) -> Result<()> {
        let Self { stream, path } = self;
        stream
            .close()
            .map_err(|e| os_error(Operation::CloseDir, &path, e))?;
        trace!(path = %path.display(), "closed directory stream");
        Ok(())
    }
}

/// Pull one record from `source` and apply the name bound
///
/// A rejected name consumes only its own record, so the following call moves
/// on to the next one.
fn next_from<S: EntrySource>(source: &mut S, path: &Path) -> Result<Option<DirectoryEntry>> {
    match source.read() {
        ReadOutcome::EndOfStream => Ok(None),
        ReadOutcome::Failed(e) => Err(os_error(Operation::ReadDir, path, e)),
        ReadOutcome::Entry(raw) => {
            let entry = DirectoryEntry::from_raw(raw.ino, raw.kind, raw.name);
            if let Err(ref e) = entry {
                debug!(path = %path.display(), error = %e, "rejected directory entry");
            }
            entry.map(Some)
        }
    }
}

impl Iterator for DirectoryCursor {
    type Item = Result<DirectoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
