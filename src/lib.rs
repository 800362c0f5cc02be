//! # portstat
//!
//! Platform-normalized filesystem primitives for Unix:
//! - `lstat` metadata as a fixed [`NormalizedStat`] record
//! - Directory enumeration through an owned [`DirectoryCursor`]
//! - Streaming SHA-1 of file contents that avoids access-time updates
//!
//! The three parts are independent; callers compose them. Nothing here walks
//! directory trees, caches results or spawns threads.
//!
//! ## Example
//!
//! ```rust,no_run
//! use portstat::{hash_file_contents, read_metadata, DirectoryCursor};
//!
//! # fn example() -> portstat::Result<()> {
//! let mut cursor = DirectoryCursor::open("/etc")?;
//! while let Some(entry) = cursor.next_entry()? {
//!     if entry.is_dot_or_dotdot() {
//!         continue;
//!     }
//!     let path = std::path::Path::new("/etc").join(entry.name());
//!     let stat = read_metadata(&path)?;
//!     if stat.is_file() {
//!         println!("{}  {}", hash_file_contents(&path)?, path.display());
//!     }
//! }
//! cursor.close()?;
//! # Ok(())
//! # }
//! ```

#[cfg(not(unix))]
compile_error!("portstat only supports Unix platforms");

pub mod cli;
pub mod directory;
pub mod error;
pub mod hash;
pub mod metadata;

// Re-export main types
pub use directory::{DirectoryCursor, DirectoryEntry, EntryKind, NAME_MAX_LEN};
pub use error::{Error, ErrorKind, Operation, Result};
pub use hash::{hash_file_contents, ContentHasher, Digest, CHUNK_SIZE, DIGEST_LEN};
pub use metadata::{read_metadata, NormalizedStat, Timespec};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
