//! Disco Cleaner - a music library normalizer.
//!
//! Walks an Artist/Album/Song directory tree and repairs what it finds:
//! song filenames, album directory names, ID3 tags and cover files. Every
//! destructive change is confirmed with the operator unless `force` is set.

pub mod cli;
pub mod config;
pub mod cover;
pub mod error;
pub mod launcher;
pub mod library;
pub mod metadata;
pub mod organizer;
pub mod scanner;
pub mod session;
pub mod terminal;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Diagnostics go to stderr so they never interleave with operator prompts
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("disco_cleaner=warn")),
        )
        .init();

    cli::run_command(&args)
}
