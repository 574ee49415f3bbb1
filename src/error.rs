//! Application-wide error types.
//!
//! Library modules return [`Result`] built on the [`Error`] enum below,
//! while `main` uses `anyhow` for convenient top-level propagation.
//!
//! # Taxonomy
//!
//! - An empty directory is never an error: listings return
//!   [`crate::scanner::Listing::Empty`] instead.
//! - [`Error::Tag`]: the tag codec failed to read or persist a song's tag.
//!   Reported, then processing continues with the next song.
//! - [`Error::ExternalTool`]: ImageMagick, the file manager or the text editor
//!   could not be started or exited abnormally. Only the dependent operation
//!   is abandoned.
//! - [`Error::Config`] / [`Error::Pattern`]: the configuration could not be
//!   loaded. Fatal for the whole run.
//!
//! # Example
//!
//! ```ignore
//! use disco_cleaner::error::{Error, Result, ResultExt};
//!
//! fn rename(from: &Path, to: &Path) -> Result<()> {
//!     std::fs::rename(from, to).with_context(format!("renaming {}", from.display()))
//! }
//! ```

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tag reading/writing error
    #[error("Tag error for {path}: {message}")]
    Tag { path: PathBuf, message: String },

    /// External program failed to start or exited abnormally
    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configured name pattern is not a valid regular expression
    #[error("Invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a tag error.
    pub fn tag(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Tag {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an external tool error.
    pub fn external_tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Render the error and every source below it, one per line.
    ///
    /// Each line holds only what that level adds; a message that ends with
    /// its source's text has that suffix trimmed, since the next line shows it.
    pub fn chain(&self) -> String {
        let mut messages = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            messages.push(err.to_string());
            source = err.source();
        }

        let mut lines: Vec<&str> = messages
            .windows(2)
            .map(|pair| own_message(&pair[0], &pair[1]))
            .collect();
        if let Some(last) = messages.last() {
            lines.push(last);
        }
        lines.join("\n  caused by: ")
    }
}

fn own_message<'a>(message: &'a str, source: &str) -> &'a str {
    message
        .strip_suffix(source)
        .and_then(|rest| rest.strip_suffix(": "))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(message)
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}
