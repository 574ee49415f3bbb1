//! Directory listing for the Artist/Album/Song tree.
//!
//! Listings are one level deep and sorted by name so runs are repeatable.
//! An empty (or unreadable) directory is a normal outcome, not an error:
//! callers branch on [`Listing::Empty`].

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Entries directly inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Entries(Vec<PathBuf>),
    Empty,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        matches!(self, Listing::Empty)
    }

    /// The entries, or an empty vec.
    pub fn into_entries(self) -> Vec<PathBuf> {
        match self {
            Listing::Entries(entries) => entries,
            Listing::Empty => Vec::new(),
        }
    }
}

/// List the entries directly inside `dir`.
pub fn list_dir(dir: &Path) -> Listing {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => entries.push(entry.into_path()),
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry"),
        }
    }

    if entries.is_empty() {
        Listing::Empty
    } else {
        Listing::Entries(entries)
    }
}

/// Whether the path names an MP3 file (case-insensitive extension).
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"))
}

/// Final path component as a display string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extension of a filename without the dot, or "" when there is none.
///
/// A leading dot (".hidden") is not treated as an extension separator.
pub fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[i + 1..],
        _ => "",
    }
}
