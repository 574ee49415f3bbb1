//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory unless a path is
//! given with `--config` (or `DISCO_CLEANER_CONFIG`):
//! - Windows: %APPDATA%\disco-cleaner\config.toml
//! - macOS: ~/Library/Application Support/disco-cleaner/config.toml
//! - Linux: ~/.config/disco-cleaner/config.toml
//!
//! A default file is written on first run. Every rule is optional: leaving a
//! key out disables the check that depends on it. Unlike a UI preference
//! file, a config that cannot be read or parsed aborts the run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the library lives and which helper programs to launch
    pub library: LibraryConfig,

    /// Filename and album directory naming rules
    pub naming: NamingConfig,

    /// ID3 tag rules
    pub tags: TagsConfig,

    /// Cover file rules
    pub cover: CoverConfig,

    /// Interaction behaviour
    pub behavior: BehaviorConfig,

    /// Run log settings
    pub log: LogConfig,

    /// Selection overlaid from the command line, never read from the file
    #[serde(skip)]
    pub selection: Selection,
}

/// Library location and helper programs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root of the Artist/Album/Song tree
    pub path: PathBuf,

    /// Program used to open a directory for the operator (e.g. "nautilus")
    pub file_manager: Option<String>,

    /// Program used to show the run log (e.g. "gedit")
    pub text_editor: Option<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: default_music_dir(),
            file_manager: None,
            text_editor: None,
        }
    }
}

/// Naming rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Regular expression every song filename must fully match
    pub filename_pattern: Option<String>,

    /// Regular expression every album directory name must fully match
    pub album_pattern: Option<String>,

    /// Mask used to rebuild an album directory name:
    /// `%a` = artist, `%b` = album, `%y` = year
    pub album_mask: Option<String>,
}

/// Tag rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagsConfig {
    /// ID3v2 frames that are both allowed and mandatory (e.g. ["TIT2", "TPE1"])
    pub frames: Option<Vec<String>>,

    /// Whether a vendor-specific (APE) tag may stay in the file
    pub custom_tag_allowed: bool,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            frames: None,
            custom_tag_allowed: true,
        }
    }
}

/// Cover rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    /// Expected cover filename inside each album (e.g. "cover.jpg")
    pub file_name: Option<String>,

    /// Older cover filenames to rename or convert into `file_name`
    pub legacy_names: Option<Vec<String>>,

    /// JPEG only: convert progressive covers to baseline and push the file
    /// into the songs' tags when it differs
    pub process: bool,
}

/// Interaction behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Apply every rename/delete/cleanup without asking
    pub force: bool,
}

/// Run log settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Write the operator messages to `disco-cleaner.log` at the end of the run
    pub enabled: bool,

    /// Open the written log in `library.text_editor`
    pub show: bool,
}

/// Artist/album restriction given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl Config {
    /// Overlay the command-line selection. Called once, before traversal.
    pub fn with_selection(mut self, artist: Option<String>, album: Option<String>) -> Self {
        self.selection = Selection { artist, album };
        self
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// File name of the run log written in the working directory
pub const LOG_FILE_NAME: &str = "disco-cleaner.log";

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("disco-cleaner"))
}

/// Get the full path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

fn default_music_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
        .unwrap_or_else(|| PathBuf::from("Music"))
}

/// Load configuration from `path`, writing a default file there first if
/// none exists yet.
pub fn load_or_init(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, writing defaults", path);
        save(&Config::default(), path)?;
    }
    load(path)
}

/// Load configuration from disk
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    let config = toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Save configuration to disk
///
/// Creates the parent directory if it doesn't exist.
pub fn save(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
