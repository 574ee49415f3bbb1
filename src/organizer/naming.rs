//! Name validation and album directory name derivation.
//!
//! Patterns always match the whole name: `\d{2} - .+\.mp3` accepts
//! `01 - Come Together.mp3` but not `01 - Come Together.mp3.bak`.

use regex::Regex;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::metadata::{TagCodec, TagSnapshot};
use crate::scanner::is_audio_file;

/// Characters that cannot appear in a directory name on common filesystems.
const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// A configured name pattern, anchored to match the whole name.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| Error::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Whether `name` fully matches `pattern`.
pub fn is_valid_name(name: &str, pattern: &NamePattern) -> bool {
    pattern.regex.is_match(name)
}

/// Placeholders understood by the album mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `%a`
    Artist,
    /// `%b`
    Album,
    /// `%y`
    Year,
}

impl Placeholder {
    pub const ALL: [Placeholder; 3] = [Placeholder::Artist, Placeholder::Album, Placeholder::Year];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Artist => "%a",
            Placeholder::Album => "%b",
            Placeholder::Year => "%y",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Placeholder::Artist => "Artist",
            Placeholder::Album => "Album",
            Placeholder::Year => "Year",
        }
    }

    fn value(self, tag: &TagSnapshot) -> Option<&str> {
        match self {
            Placeholder::Artist => tag.artist(),
            Placeholder::Album => tag.album(),
            Placeholder::Year => tag.year(),
        }
    }
}

/// Album directory name built from a mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedName {
    /// The name, already stripped of illegal characters
    pub name: String,
    /// Placeholders left in place because the tag had no value for them
    pub unavailable: Vec<Placeholder>,
    /// Song whose tag supplied the values
    pub source: PathBuf,
}

/// Substitute the mask's placeholders with the tag's values.
///
/// Each placeholder is handled on its own: a missing or empty value leaves
/// that placeholder's literal text in the name and is reported in
/// `unavailable`.
pub fn apply_mask(mask: &str, tag: &TagSnapshot) -> (String, Vec<Placeholder>) {
    let mut name = mask.to_string();
    let mut unavailable = Vec::new();
    for placeholder in Placeholder::ALL {
        match placeholder.value(tag).filter(|v| !v.is_empty()) {
            Some(value) => name = name.replace(placeholder.token(), value),
            None => unavailable.push(placeholder),
        }
    }
    (strip_illegal_chars(&name), unavailable)
}

/// Derive the album directory name from the first audio file in `songs`.
///
/// Returns `Ok(None)` when `songs` holds no audio file.
pub fn derive_album_name(
    codec: &dyn TagCodec,
    songs: &[PathBuf],
    mask: &str,
) -> Result<Option<DerivedName>> {
    let Some(song) = songs.iter().find(|p| is_audio_file(p) && p.is_file()) else {
        return Ok(None);
    };

    let tag = codec.read(song)?;
    let (name, unavailable) = apply_mask(mask, &tag);
    Ok(Some(DerivedName {
        name,
        unavailable,
        source: song.clone(),
    }))
}

/// Remove every character that is illegal in a filesystem name.
pub fn strip_illegal_chars(name: &str) -> String {
    name.chars().filter(|c| !ILLEGAL_CHARS.contains(c)).collect()
}

/// Path the album directory would have after renaming it to `name`.
pub fn renamed_path(album: &Path, name: &str) -> PathBuf {
    album.with_file_name(name)
}
