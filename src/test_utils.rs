//! Test utilities and fixtures for disco-cleaner tests.
//!
//! This module provides stand-ins for every collaborator a [`Session`]
//! needs, plus helpers for building Artist/Album/Song trees on disk.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{Harness, album_dir, touch};
//!
//! #[test]
//! fn test_something() {
//!     let root = tempfile::tempdir().unwrap();
//!     let album = album_dir(root.path(), "Beatles", "Abbey Road");
//!     touch(&album, "01 - Come Together.mp3");
//!
//!     let mut harness = Harness::default();
//!     let mut session = harness.session(RepairPolicy::default());
//!     // ... test logic
//! }
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cover::ImageTool;
use crate::error::{Error, Result};
use crate::launcher::Launcher;
use crate::metadata::{TagCodec, TagSnapshot};
use crate::scanner::file_name;
use crate::session::{RepairPolicy, Session};
use crate::terminal::{Interaction, Level, is_affirmative};

// ============================================================================
// Scripted terminal
// ============================================================================

/// Terminal answering questions from a script and recording everything.
///
/// Once the script runs out every question is answered yes, the same as
/// pressing enter (or a closed stdin) on the real console.
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    answers: VecDeque<String>,
    messages: Vec<(Level, String, usize)>,
    questions: Vec<String>,
}

impl ScriptedTerminal {
    pub fn new<'s>(answers: impl IntoIterator<Item = &'s str>) -> Self {
        Self {
            answers: answers.into_iter().map(str::to_string).collect(),
            ..Default::default()
        }
    }

    /// Every message shown, with level and indent.
    pub fn messages(&self) -> &[(Level, String, usize)] {
        &self.messages
    }

    /// Every question asked, in order.
    pub fn questions(&self) -> Vec<String> {
        self.questions.clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.at_level(Level::Info)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.at_level(Level::Warning)
    }

    pub fn errors(&self) -> Vec<String> {
        self.at_level(Level::Error)
    }

    pub fn confirmations(&self) -> Vec<String> {
        self.at_level(Level::Confirmation)
    }

    fn at_level(&self, level: Level) -> Vec<String> {
        self.messages
            .iter()
            .filter(|(l, _, _)| *l == level)
            .map(|(_, m, _)| m.clone())
            .collect()
    }
}

impl Interaction for ScriptedTerminal {
    fn notify(&mut self, level: Level, message: &str, indent: usize) {
        self.messages.push((level, message.to_string(), indent));
    }

    fn ask_yes_no(&mut self, prompt: &str, _indent: usize) -> bool {
        self.questions.push(prompt.to_string());
        self.answers.pop_front().is_none_or(|a| is_affirmative(&a))
    }
}

// ============================================================================
// In-memory tag codec
// ============================================================================

/// A mutation applied through [`MemoryCodec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecWrite {
    RemoveFrames { file: String, keys: Vec<String> },
    RemoveVendor { file: String },
    WriteCover { file: String, bytes: Vec<u8> },
}

/// Tag codec holding snapshots in memory, keyed by file name.
///
/// Files without a stored snapshot read as untagged as long as they exist
/// on disk. Keying by name keeps snapshots valid across album renames.
#[derive(Debug, Default)]
pub struct MemoryCodec {
    tags: RefCell<HashMap<String, TagSnapshot>>,
    writes: RefCell<Vec<CodecWrite>>,
    failing: RefCell<HashSet<String>>,
}

impl MemoryCodec {
    /// Store `snapshot` under the file name of its path.
    pub fn insert(&self, snapshot: TagSnapshot) {
        self.tags
            .borrow_mut()
            .insert(file_name(snapshot.path()), snapshot);
    }

    /// Make every mutation of `name` fail.
    pub fn fail_writes_for(&self, name: &str) {
        self.failing.borrow_mut().insert(name.to_string());
    }

    /// Current snapshot stored for `name`.
    pub fn snapshot(&self, name: &str) -> Option<TagSnapshot> {
        self.tags.borrow().get(name).cloned()
    }

    /// Every mutation applied so far.
    pub fn writes(&self) -> Vec<CodecWrite> {
        self.writes.borrow().clone()
    }

    fn mutate(
        &self,
        path: &Path,
        write: CodecWrite,
        change: impl FnOnce(TagSnapshot) -> TagSnapshot,
    ) -> Result<TagSnapshot> {
        let name = file_name(path);
        if self.failing.borrow().contains(&name) {
            return Err(Error::tag(path, "write refused"));
        }
        let next = change(self.read(path)?);
        self.tags.borrow_mut().insert(name, next.clone());
        self.writes.borrow_mut().push(write);
        Ok(next)
    }
}

impl TagCodec for MemoryCodec {
    fn read(&self, path: &Path) -> Result<TagSnapshot> {
        if let Some(tag) = self.tags.borrow().get(&file_name(path)) {
            return Ok(tag.clone());
        }
        if path.exists() {
            Ok(TagSnapshot::untagged(path))
        } else {
            Err(Error::tag(path, "no such file"))
        }
    }

    fn remove_frames(&self, path: &Path, keys: &[String]) -> Result<TagSnapshot> {
        let write = CodecWrite::RemoveFrames {
            file: file_name(path),
            keys: keys.to_vec(),
        };
        self.mutate(path, write, |tag| tag.without_frames(keys))
    }

    fn remove_vendor_tag(&self, path: &Path) -> Result<TagSnapshot> {
        let write = CodecWrite::RemoveVendor {
            file: file_name(path),
        };
        self.mutate(path, write, |tag| tag.without_vendor())
    }

    fn write_embedded_cover(&self, path: &Path, bytes: &[u8]) -> Result<TagSnapshot> {
        let write = CodecWrite::WriteCover {
            file: file_name(path),
            bytes: bytes.to_vec(),
        };
        self.mutate(path, write, |tag| {
            tag.without_frames(&["APIC".to_string()])
                .with_cover(bytes.to_vec())
        })
    }
}

// ============================================================================
// Image tool and launcher stand-ins
// ============================================================================

/// Image tool that reports a fixed encoding and converts by copying.
#[derive(Debug, Default)]
pub struct FakeImageTool {
    pub baseline: bool,
}

impl FakeImageTool {
    pub fn baseline() -> Self {
        Self { baseline: true }
    }
}

impl ImageTool for FakeImageTool {
    fn is_baseline_jpeg(&self, _path: &Path) -> Result<bool> {
        Ok(self.baseline)
    }

    fn convert(&self, src: &Path, dst: &Path) -> Result<()> {
        if src != dst {
            fs::copy(src, dst)?;
        }
        Ok(())
    }
}

/// Launcher that records what it was asked to open.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    opened: RefCell<Vec<(String, PathBuf)>>,
}

impl RecordingLauncher {
    pub fn opened(&self) -> Vec<(String, PathBuf)> {
        self.opened.borrow().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn open(&self, command: &str, path: &Path) -> Result<()> {
        self.opened
            .borrow_mut()
            .push((command.to_string(), path.to_path_buf()));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Owns a full set of collaborators and lends them to a [`Session`].
pub struct Harness {
    pub terminal: ScriptedTerminal,
    pub codec: MemoryCodec,
    pub images: Box<dyn ImageTool>,
    pub launcher: RecordingLauncher,
}

impl Default for Harness {
    fn default() -> Self {
        Self::with_images(FakeImageTool::baseline())
    }
}

impl Harness {
    pub fn with_answers<'s>(answers: impl IntoIterator<Item = &'s str>) -> Self {
        Self {
            terminal: ScriptedTerminal::new(answers),
            ..Default::default()
        }
    }

    pub fn with_images(images: impl ImageTool + 'static) -> Self {
        Self {
            terminal: ScriptedTerminal::default(),
            codec: MemoryCodec::default(),
            images: Box::new(images),
            launcher: RecordingLauncher::default(),
        }
    }

    pub fn session(&mut self, policy: RepairPolicy) -> Session<'_> {
        Session::new(
            policy,
            &mut self.terminal,
            &self.codec,
            &*self.images,
            &self.launcher,
        )
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Create `<root>/<artist>/<album>` and return the album path.
pub fn album_dir(root: &Path, artist: &str, album: &str) -> PathBuf {
    let dir = root.join(artist).join(album);
    fs::create_dir_all(&dir).expect("Failed to create album directory");
    dir
}

/// Create an empty file named `name` in `dir`.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    write_file(dir, name, b"")
}

/// Create a file named `name` in `dir` holding `bytes`.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("Failed to write fixture file");
    path
}

/// Names of the entries in `dir`, sorted.
pub fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read directory")
        .map(|e| e.expect("Failed to read entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scripted_terminal_falls_back_to_yes() {
        let mut terminal = ScriptedTerminal::new(["n"]);
        assert!(!terminal.ask_to_retry(1));
        assert!(terminal.ask_to_retry(1));
        assert_eq!(terminal.questions(), ["Retry? (Y/n)", "Retry? (Y/n)"]);
    }

    #[test]
    fn test_memory_codec_reads_existing_files_as_untagged() {
        let dir = tempdir().unwrap();
        let song = touch(dir.path(), "01 - Song.mp3");
        let codec = MemoryCodec::default();

        let tag = codec.read(&song).unwrap();
        assert!(!tag.has_modern_tag());
        assert!(codec.read(&dir.path().join("missing.mp3")).is_err());
    }

    #[test]
    fn test_memory_codec_records_writes() {
        let codec = MemoryCodec::default();
        codec.insert(
            TagSnapshot::untagged("a.mp3")
                .with_frame("TIT2", "x")
                .with_frame("TALB", "y"),
        );

        let next = codec
            .remove_frames(Path::new("a.mp3"), &["TALB".to_string()])
            .unwrap();

        assert_eq!(next.frame_keys().len(), 1);
        assert_eq!(
            codec.writes(),
            [CodecWrite::RemoveFrames {
                file: "a.mp3".into(),
                keys: vec!["TALB".into()],
            }]
        );
    }
}
