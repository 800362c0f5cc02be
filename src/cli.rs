//! Command-line interface definitions
//!
//! Argument parsing and the per-subcommand drivers for the `portstat`
//! binary. Each driver reports per-path failures to the error stream and
//! keeps going; the caller turns the failure count into an exit status.

use crate::directory::DirectoryCursor;
use crate::hash::hash_file_contents;
use crate::metadata::{read_metadata, NormalizedStat, Timespec};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Portable lstat, directory listing and SHA-1 hashing
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Output and logging configuration
    #[command(flatten)]
    pub output: OutputConfig,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print normalized metadata for each path (symlinks are not followed)
    Stat {
        /// Paths to query
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },

    /// List the entries of a directory as `kind inode name`
    Ls {
        /// Directory to list
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Skip `.` and `..`
        #[arg(long)]
        no_dots: bool,
    },

    /// Print the SHA-1 of each file's contents
    Hash {
        /// Files to hash
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
}

/// Output configuration
#[derive(clap::Args, Debug, Clone, Default)]
#[command(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all logging except errors)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl OutputConfig {
    /// Default log level; `RUST_LOG` overrides it
    #[must_use]
    pub const fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// Render one `NormalizedStat` as a single line
#[must_use]
pub fn format_stat(path: &Path, stat: &NormalizedStat) -> String {
    fn ts(t: &Timespec) -> String {
        format!("{}.{:09}", t.sec as i64, t.nsec)
    }
    format!(
        "{} dev={} ino={} nlink={} mode={:o} uid={} gid={} rdev={} size={} blksize={} blocks={} atime={} mtime={} ctime={}",
        path.display(),
        stat.dev,
        stat.ino,
        stat.nlink,
        stat.mode,
        stat.uid,
        stat.gid,
        stat.rdev,
        stat.size,
        stat.blksize,
        stat.blocks,
        ts(&stat.accessed),
        ts(&stat.modified),
        ts(&stat.changed),
    )
}

/// Run the parsed command
///
/// Results go to `out`, per-path failures to `err`.
///
/// # Returns
///
/// The number of paths or entries that failed.
///
/// # Errors
///
/// Returns an error only if writing to `out` or `err` fails.
pub fn run<W: Write, E: Write>(args: &Args, out: &mut W, err: &mut E) -> Result<usize> {
    let mut failures = 0;
    match &args.command {
        Command::Stat { paths } => {
            for path in paths {
                match read_metadata(path) {
                    Ok(stat) => writeln!(out, "{}", format_stat(path, &stat))?,
                    Err(e) => {
                        failures += 1;
                        writeln!(err, "portstat: {e}")?;
                    }
                }
            }
        }
        Command::Ls { dir, no_dots } => {
            failures += list_directory(dir, *no_dots, out, err)?;
        }
        Command::Hash { paths } => {
            for path in paths {
                match hash_file_contents(path) {
                    Ok(digest) => writeln!(out, "{digest}  {}", path.display())?,
                    Err(e) => {
                        failures += 1;
                        writeln!(err, "portstat: {e}")?;
                    }
                }
            }
        }
    }
    out.flush().context("Failed to flush output")?;
    Ok(failures)
}

fn list_directory<W: Write, E: Write>(
    dir: &Path,
    no_dots: bool,
    out: &mut W,
    err: &mut E,
) -> Result<usize> {
    let mut cursor = match DirectoryCursor::open(dir) {
        Ok(cursor) => cursor,
        Err(e) => {
            writeln!(err, "portstat: {e}")?;
            return Ok(1);
        }
    };

    let mut failures = 0;
    loop {
        match cursor.next_entry() {
            Ok(Some(entry)) => {
                if no_dots && entry.is_dot_or_dotdot() {
                    continue;
                }
                writeln!(
                    out,
                    "{} {} {}",
                    entry.kind().tag() as char,
                    entry.ino(),
                    entry.name().to_string_lossy()
                )?;
            }
            Ok(None) => break,
            Err(e @ crate::Error::NameTooLong { .. }) => {
                failures += 1;
                writeln!(err, "portstat: {}: {e}", dir.display())?;
            }
            Err(e) => {
                failures += 1;
                writeln!(err, "portstat: {e}")?;
                break;
            }
        }
    }

    if let Err(e) = cursor.close() {
        failures += 1;
        writeln!(err, "portstat: {e}")?;
    }
    Ok(failures)
}
