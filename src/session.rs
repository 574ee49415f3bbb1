//! Run context: the compiled repair policy plus every collaborator the
//! repair engine talks to.
//!
//! A [`Session`] is built once at startup and passed by reference down the
//! traversal. Nothing in the engine reaches for global state.

use std::path::{Path, PathBuf};

use crate::config::{Config, Selection};
use crate::cover::ImageTool;
use crate::error::{Error, Result};
use crate::launcher::Launcher;
use crate::metadata::TagCodec;
use crate::organizer::naming::NamePattern;
use crate::scanner::{self, Listing};
use crate::terminal::Interaction;

/// Album directory naming rule. Only active when both parts are configured.
#[derive(Debug, Clone)]
pub struct AlbumNaming {
    pub pattern: NamePattern,
    pub mask: String,
}

/// Cover file rules.
#[derive(Debug, Clone)]
pub struct CoverPolicy {
    pub file_name: String,
    pub legacy_names: Option<Vec<String>>,
    pub process: bool,
}

/// Rules derived from the configuration, compiled once per run.
#[derive(Debug, Clone, Default)]
pub struct RepairPolicy {
    pub filename_pattern: Option<NamePattern>,
    pub album_naming: Option<AlbumNaming>,
    /// Allowed (and mandatory) frame keys, in configured order
    pub tag_frames: Option<Vec<String>>,
    pub custom_tag_allowed: bool,
    pub cover: Option<CoverPolicy>,
    /// Auto-confirm every question that guards a change
    pub force: bool,
    pub file_manager: Option<String>,
    pub selection: Selection,
}

impl RepairPolicy {
    /// Compile the configuration. Fails on an invalid name pattern.
    pub fn from_config(config: &Config) -> Result<Self> {
        let naming = &config.naming;

        let filename_pattern = naming
            .filename_pattern
            .as_deref()
            .map(NamePattern::new)
            .transpose()?;

        let album_naming = match (&naming.album_pattern, &naming.album_mask) {
            (Some(pattern), Some(mask)) => Some(AlbumNaming {
                pattern: NamePattern::new(pattern)?,
                mask: mask.clone(),
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("album_pattern and album_mask must both be set to rename albums");
                None
            }
            (None, None) => None,
        };

        if config.tags.frames.as_ref().is_some_and(|f| f.is_empty()) {
            return Err(Error::config("tags.frames must list at least one frame"));
        }

        let cover = config.cover.file_name.as_ref().map(|file_name| CoverPolicy {
            file_name: file_name.clone(),
            legacy_names: config.cover.legacy_names.clone(),
            process: config.cover.process,
        });

        Ok(Self {
            filename_pattern,
            album_naming,
            tag_frames: config.tags.frames.clone(),
            custom_tag_allowed: config.tags.custom_tag_allowed,
            cover,
            force: config.behavior.force,
            file_manager: config.library.file_manager.clone(),
            selection: config.selection.clone(),
        })
    }

    /// Configured cover filename, if any.
    pub fn cover_name(&self) -> Option<&str> {
        self.cover.as_ref().map(|c| c.file_name.as_str())
    }
}

/// Everything one run needs.
pub struct Session<'a> {
    pub policy: RepairPolicy,
    pub terminal: &'a mut dyn Interaction,
    pub codec: &'a dyn TagCodec,
    pub images: &'a dyn ImageTool,
    pub launcher: &'a dyn Launcher,
}

impl<'a> Session<'a> {
    pub fn new(
        policy: RepairPolicy,
        terminal: &'a mut dyn Interaction,
        codec: &'a dyn TagCodec,
        images: &'a dyn ImageTool,
        launcher: &'a dyn Launcher,
    ) -> Self {
        Self {
            policy,
            terminal,
            codec,
            images,
            launcher,
        }
    }

    /// Ask a question guarding a change; always yes in force mode.
    pub fn confirm_action(&mut self, prompt: &str, indent: usize) -> bool {
        if self.policy.force {
            tracing::debug!(prompt, "Auto-confirmed");
            return true;
        }
        self.terminal.ask_yes_no(prompt, indent)
    }

    /// Point the operator at `path`, offering to open it in the file manager.
    pub fn signal(&mut self, message: &str, path: &Path, indent: usize) {
        self.terminal.warn(&format!("{message}."), indent);
        let Some(file_manager) = self.policy.file_manager.clone() else {
            return;
        };
        if !self.terminal.ask_yes_no("Open? (Y/n)", indent) {
            return;
        }
        if let Err(e) = self.launcher.open(&file_manager, path) {
            self.report(&e, "Cannot open file manager", indent);
        }
    }

    /// Signal, then wait for the operator to acknowledge.
    pub fn signal_and_continue(&mut self, message: &str, path: &Path, indent: usize) {
        self.signal(message, path, indent);
        self.terminal.ask_to_continue(indent);
    }

    /// List an album's entries, signalling when there are none.
    ///
    /// Returns `None` for an empty album so callers can return early.
    pub fn list_songs(&mut self, album: &Path) -> Option<Vec<PathBuf>> {
        match scanner::list_dir(album) {
            Listing::Entries(entries) => Some(entries),
            Listing::Empty => {
                self.signal_and_continue("No songs in directory", album, 2);
                None
            }
        }
    }

    /// Show a failure to the operator and log its full chain.
    pub fn report(&mut self, error: &Error, message: &str, indent: usize) {
        tracing::error!(error = %error.chain(), "{message}");
        self.terminal.error(message, indent);
    }
}
