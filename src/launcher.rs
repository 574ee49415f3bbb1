//! Launching the operator's file manager or text editor.
//!
//! Launches are fire-and-forget: the child process is spawned and never
//! waited on, so the run continues while the operator looks at the path.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Opens a path in an external program.
#[cfg_attr(test, mockall::automock)]
pub trait Launcher {
    /// Start `command <path>` without waiting for it to exit.
    fn open(&self, command: &str, path: &Path) -> Result<()>;
}

/// Spawns real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, command: &str, path: &Path) -> Result<()> {
        let child = Command::new(command)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::external_tool(command, format!("cannot start: {e}")))?;
        tracing::debug!(command, pid = child.id(), path = %path.display(), "Launched");
        Ok(())
    }
}
