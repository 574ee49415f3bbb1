//! Command-line interface for disco-cleaner.
//!
//! The binary takes no subcommand: it loads the configuration, overlays the
//! artist/album selection given on the command line and walks the library.

mod commands;

pub use commands::{Cli, run_command};
