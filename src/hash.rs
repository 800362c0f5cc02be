//! Streaming SHA-1 of whole file contents
//!
//! [`hash_file_contents`] opens a file, preferably without touching its access
//! time, and feeds it through SHA-1 in [`CHUNK_SIZE`] pieces.
//!
//! # Open strategy
//!
//! Opens follow [`OPEN_ATTEMPTS`] in order: first with `O_NOATIME`, then as a
//! plain read-only open. `O_NOATIME` is refused with `EPERM` unless the caller
//! owns the file (or has `CAP_FOWNER`), and some filesystems reject it
//! outright, so its failure is treated as a capability probe rather than an
//! error. Platforms without the flag perform a plain open on the first
//! attempt.
//!
//! The [`FileOpener`] trait is the seam for substituting how each attempt is
//! carried out.

use crate::error::{os_error, Error, Operation, Result};
use sha1::Digest as _;
use sha1::Sha1;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace};

/// Bytes requested per `read`
pub const CHUNK_SIZE: usize = 65535;

/// Length of a SHA-1 digest in bytes
pub const DIGEST_LEN: usize = 20;

#[cfg(any(target_os = "linux", target_os = "android"))]
const NO_ATIME_FLAG: libc::c_int = libc::O_NOATIME;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const NO_ATIME_FLAG: libc::c_int = 0;

/// A SHA-1 digest
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wrap raw digest bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::LowerHex for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(self, f)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self:x})")
    }
}

/// Error parsing a hex digest
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected 40 hex digits, got {input:?}")]
pub struct ParseDigestError {
    input: String,
}

impl FromStr for Digest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ParseDigestError {
            input: s.to_string(),
        };
        if s.len() != DIGEST_LEN * 2 || !s.is_ascii() {
            return Err(invalid());
        }
        let mut bytes = [0u8; DIGEST_LEN];
        for (byte, pair) in bytes.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

/// How a single open attempt is made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only, asking the OS not to update access time
    NoAtime,
    /// Plain read-only
    ReadOnly,
}

/// Open attempts, in order; the first success wins
pub const OPEN_ATTEMPTS: [OpenMode; 2] = [OpenMode::NoAtime, OpenMode::ReadOnly];

/// Performs one open attempt for the hasher
pub trait FileOpener {
    /// Byte source produced by a successful open
    type Reader: Read;

    /// Open `path` in the given mode
    ///
    /// # Errors
    ///
    /// Returns the OS error from the open call.
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Self::Reader>;
}

/// Opens files with `open(2)`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl FileOpener for SystemOpener {
    type Reader = File;

    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.read(true);
        if mode == OpenMode::NoAtime {
            options.custom_flags(NO_ATIME_FLAG);
        }
        options.open(path)
    }
}

/// SHA-1 hasher for whole files
///
/// Stateless between calls; each call owns its file handle and buffer.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher<O = SystemOpener> {
    opener: O,
}

impl ContentHasher {
    /// Hasher using the system `open(2)`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<O: FileOpener> ContentHasher<O> {
    /// Hasher using a custom opener
    pub fn with_opener(opener: O) -> Self {
        Self { opener }
    }

    /// Hash the full contents of `path`
    ///
    /// # Errors
    ///
    /// - [`Error::Os`] with [`Operation::Open`] if every open attempt fails;
    ///   the code is from the last (plain read-only) attempt
    /// - [`Error::Os`] with [`Operation::Read`] if a read fails; no partial
    ///   digest is produced
    /// - [`Error::Allocation`] if the read buffer cannot be reserved
    pub fn hash_file(&self, path: impl AsRef<Path>) -> Result<Digest> {
        let path = path.as_ref();
        let mut reader = self
            .open_with_fallback(path)
            .map_err(|e| os_error(Operation::Open, path, e))?;
        digest_reader(&mut reader, path, CHUNK_SIZE)
    }

    fn open_with_fallback(&self, path: &Path) -> io::Result<O::Reader> {
        let mut result = self.opener.open(path, OPEN_ATTEMPTS[0]);
        for &mode in &OPEN_ATTEMPTS[1..] {
            match &result {
                Ok(_) => break,
                Err(e) => {
                    debug!(
                        path = %path.display(),
                        error = %e,
                        next = ?mode,
                        "open attempt failed, retrying"
                    );
                }
            }
            result = self.opener.open(path, mode);
        }
        result
    }
}

/// Hash the full contents of `path` with the system opener
///
/// # Errors
///
/// See [`ContentHasher::hash_file`].
pub fn hash_file_contents(path: impl AsRef<Path>) -> Result<Digest> {
    ContentHasher::new().hash_file(path)
}

/// Stream `reader` through SHA-1 using a `buf_size` byte working buffer
fn digest_reader<R: Read>(reader: &mut R, path: &Path, buf_size: usize) -> Result<Digest> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(buf_size)
        .map_err(|source| Error::Allocation {
            size: buf_size,
            source,
        })?;
    buf.resize(buf_size, 0);

    let mut hasher = Sha1::new();
    let mut total: u64 = 0;
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
                total += n as u64;
            }
            // EINTR is not a failure; restart the read.
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(os_error(Operation::Read, path, e)),
        }
    }

    let digest = Digest(hasher.finalize().into());
    trace!(path = %path.display(), bytes = total, %digest, "hashed file");
    Ok(digest)
}
