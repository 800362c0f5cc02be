//! portstat - portable lstat, readdir and SHA-1 hashing

use anyhow::Result;
use clap::Parser;
use portstat::cli::{run, Args};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(args.output.log_level().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let failures = run(&args, &mut stdout.lock(), &mut stderr.lock())?;

    if failures > 0 {
        tracing::debug!(failures, "finished with errors");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
