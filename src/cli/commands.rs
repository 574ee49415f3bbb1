//! CLI definition and the run handler.
//!
//! Parsing errors (unknown arguments, missing values) are handled by clap,
//! which prints usage and exits with code 2. Everything after parsing
//! returns an `anyhow::Result<()>`; only configuration failures end up there.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::config::{self, ConfigError, LOG_FILE_NAME};
use crate::cover::ImageMagick;
use crate::launcher::{Launcher, SystemLauncher};
use crate::library;
use crate::metadata::Mp3Codec;
use crate::session::{RepairPolicy, Session};
use crate::terminal::{ConsoleTerminal, Interaction, RunLog};

/// Disco Cleaner: normalize a music library's filenames, tags and covers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Only process this artist directory
    #[arg(long, value_name = "NAME")]
    pub artist: Option<String>,

    /// Only process album directories with this name (across all artists)
    #[arg(long, value_name = "NAME")]
    pub album: Option<String>,

    /// Configuration file (default: OS config dir/disco-cleaner/config.toml)
    #[arg(long, value_name = "PATH", env = "DISCO_CLEANER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Load the configuration and walk the library once.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::config_path().ok_or(ConfigError::NoConfigDir)?,
    };
    let config = config::load_or_init(&config_path)
        .context("Cannot load configuration")?
        .with_selection(cli.artist.clone(), cli.album.clone());
    let policy = RepairPolicy::from_config(&config).context("Invalid configuration")?;
    debug!(?policy, "Repair policy compiled");

    let log = config.log.enabled.then(RunLog::default);
    let mut terminal = ConsoleTerminal::stdio(log);
    let codec = Mp3Codec;
    let images = ImageMagick::default();
    let launcher = SystemLauncher;

    let root = config.library.path.clone();
    info!(root = %root.display(), "Walking library");
    let summary = {
        let mut session = Session::new(policy, &mut terminal, &codec, &images, &launcher);
        library::run(&mut session, &root)
    };
    debug!(?summary, "Run finished");

    let written = terminal.log().map(|log| log.write_to(Path::new(LOG_FILE_NAME)));
    match written {
        Some(Ok(path)) if config.log.show => {
            show_log(&mut terminal, &launcher, config.library.text_editor.as_deref(), &path);
        }
        Some(Ok(path)) => info!(path = %path.display(), "Run log written"),
        Some(Err(e)) => error!(error = %e, "Failed to write {LOG_FILE_NAME}"),
        None => {}
    }

    Ok(())
}

/// Open the written run log in the configured text editor.
fn show_log(
    terminal: &mut dyn Interaction,
    launcher: &dyn Launcher,
    editor: Option<&str>,
    path: &Path,
) {
    let Some(editor) = editor else {
        debug!("No text editor configured, not showing the log");
        return;
    };
    if let Err(e) = launcher.open(editor, path) {
        error!(error = %e.chain(), "Cannot open text editor");
        terminal.error("Cannot open text editor", 0);
    }
}
