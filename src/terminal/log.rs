//! In-memory run log, written to disk once at the end of a run.

use std::fs;
use std::path::{Path, PathBuf};

/// Append-only accumulator of operator messages.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    pub fn append(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render the log with a header carrying the run timestamp.
    pub fn render(&self) -> String {
        let started = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut out = format!("disco-cleaner run of {started}\n\n");
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Write the log to `path`, replacing any previous log.
    pub fn write_to(&self, path: &Path) -> std::io::Result<PathBuf> {
        fs::write(path, self.render())?;
        Ok(path.to_path_buf())
    }
}
