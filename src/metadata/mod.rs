//! MP3 tag access and reconciliation.
//!
//! Tags are handled as immutable [`TagSnapshot`]s: reading a song returns a
//! snapshot, and every mutating [`TagCodec`] call persists the change and
//! returns a fresh snapshot of the file as it is now on disk. A snapshot is
//! never updated in place, so nothing can act on a tag that a previous
//! write has already replaced.
//!
//! # Modules
//! - [`codec`]: the production codec (lofty for tag detection, id3 for frames)
//! - [`reconcile`]: per-album tag checks and cleanup

pub mod codec;
pub mod reconcile;

pub use codec::Mp3Codec;
pub use reconcile::{TagCheck, check_tags};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Reads and rewrites song tags.
///
/// Mutations are persisted with a temp-file swap: the edited file is written
/// next to the original, the original is deleted, and the copy is moved into
/// its place.
pub trait TagCodec {
    /// Snapshot the tags currently stored in `path`.
    fn read(&self, path: &Path) -> Result<TagSnapshot>;

    /// Remove every ID3v2 frame whose key is in `keys`.
    fn remove_frames(&self, path: &Path, keys: &[String]) -> Result<TagSnapshot>;

    /// Remove the vendor-specific (APE) tag.
    fn remove_vendor_tag(&self, path: &Path) -> Result<TagSnapshot>;

    /// Replace the embedded cover image with `bytes` (JPEG).
    fn write_embedded_cover(&self, path: &Path, bytes: &[u8]) -> Result<TagSnapshot>;
}

/// Artist/album/year as stored in the legacy (ID3v1) section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
}

/// Tag state of one song at the moment it was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSnapshot {
    path: PathBuf,
    legacy: Option<TagFields>,
    modern: bool,
    vendor: bool,
    frames: BTreeMap<String, String>,
    cover: Option<Vec<u8>>,
}

impl TagSnapshot {
    /// Snapshot of a file without any tag.
    pub fn untagged(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Add an ID3v1 section.
    pub fn with_legacy(mut self, fields: TagFields) -> Self {
        self.legacy = Some(fields);
        self
    }

    /// Add an ID3v2 frame (marks the ID3v2 section present).
    pub fn with_frame(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.modern = true;
        self.frames.entry(key.into()).or_insert_with(|| value.into());
        self
    }

    /// Add an APE section.
    pub fn with_vendor(mut self) -> Self {
        self.vendor = true;
        self
    }

    /// Add an embedded cover (as an APIC frame).
    pub fn with_cover(mut self, bytes: Vec<u8>) -> Self {
        self.modern = true;
        self.frames.entry("APIC".to_string()).or_default();
        self.cover = Some(bytes);
        self
    }

    /// Copy of this snapshot without the given frames.
    pub fn without_frames(&self, keys: &[String]) -> Self {
        let mut next = self.clone();
        for key in keys {
            next.frames.remove(key);
            if key == "APIC" {
                next.cover = None;
            }
        }
        next
    }

    /// Copy of this snapshot without the APE section.
    pub fn without_vendor(&self) -> Self {
        Self {
            vendor: false,
            ..self.clone()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_legacy_tag(&self) -> bool {
        self.legacy.is_some()
    }

    pub fn has_modern_tag(&self) -> bool {
        self.modern
    }

    pub fn has_vendor_tag(&self) -> bool {
        self.vendor
    }

    /// Keys of every ID3v2 frame present, each listed once.
    pub fn frame_keys(&self) -> BTreeSet<&str> {
        self.frames.keys().map(String::as_str).collect()
    }

    /// Text of a frame; empty for binary frames such as APIC.
    pub fn frame_value(&self, key: &str) -> Option<&str> {
        self.frames.get(key).map(String::as_str)
    }

    pub fn embedded_cover(&self) -> Option<&[u8]> {
        self.cover.as_deref()
    }

    pub fn artist(&self) -> Option<&str> {
        self.field(|f| f.artist.as_deref(), &["TPE1"])
    }

    pub fn album(&self) -> Option<&str> {
        self.field(|f| f.album.as_deref(), &["TALB"])
    }

    pub fn year(&self) -> Option<&str> {
        self.field(|f| f.year.as_deref(), &["TYER", "TDRC"])
            .map(|y| y.get(..4).filter(|p| p.chars().all(|c| c.is_ascii_digit())).unwrap_or(y))
    }

    // The legacy section wins when it carries a value, as ID3v1-era players did.
    fn field<'a>(
        &'a self,
        legacy: impl Fn(&'a TagFields) -> Option<&'a str>,
        frames: &[&str],
    ) -> Option<&'a str> {
        self.legacy
            .as_ref()
            .and_then(legacy)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                frames
                    .iter()
                    .find_map(|key| self.frame_value(key))
                    .filter(|v| !v.trim().is_empty())
            })
    }
}

/// Human description of an ID3v2 frame key.
pub fn frame_description(key: &str) -> Option<&'static str> {
    Some(match key {
        "APIC" => "Cover",
        "COMM" => "Comment",
        "TALB" => "Album",
        "TCON" => "Genre",
        "TCOM" => "Composer",
        "TDRC" => "Recording date",
        "TIT2" => "Title",
        "TPE1" => "Artist",
        "TPE2" => "Album artist",
        "TPOS" => "Disc number",
        "TRCK" => "Track number",
        "TYER" => "Year",
        "USLT" => "Lyrics",
        _ => return None,
    })
}
