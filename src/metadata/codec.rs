//! Production [`TagCodec`] for MP3 files.
//!
//! lofty detects which tag sections a file carries (ID3v1, ID3v2, APE) and
//! reads the ID3v1 fields. Frame-level ID3v2 work (frame keys, APIC data,
//! frame removal) goes through the `id3` crate, which exposes raw frames.

use id3::frame::{Content, Picture, PictureType};
use id3::{TagLike, Version};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, TagType};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{TagCodec, TagFields, TagSnapshot};
use crate::error::{Error, Result, ResultExt};

/// Tag codec backed by lofty and id3.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3Codec;

impl TagCodec for Mp3Codec {
    fn read(&self, path: &Path) -> Result<TagSnapshot> {
        let tagged_file = Probe::open(path)
            .map_err(|e| Error::tag(path, format!("cannot open: {e}")))?
            .read()
            .map_err(|e| Error::tag(path, format!("cannot read tags: {e}")))?;

        let mut snapshot = TagSnapshot::untagged(path);

        if let Some(v1) = tagged_file.tag(TagType::Id3v1) {
            snapshot = snapshot.with_legacy(TagFields {
                artist: v1.artist().map(|s| s.to_string()),
                album: v1.album().map(|s| s.to_string()),
                year: v1.year().map(|y| y.to_string()),
            });
        }

        if tagged_file.contains_tag_type(TagType::Ape) {
            snapshot = snapshot.with_vendor();
        }

        if tagged_file.contains_tag_type(TagType::Id3v2) {
            let tag = read_id3(path)?;
            let (frames, cover) = collect_frames(&tag);
            for (key, value) in frames {
                snapshot = snapshot.with_frame(key, value);
            }
            if let Some(bytes) = cover {
                snapshot = snapshot.with_cover(bytes);
            }
        }

        Ok(snapshot)
    }

    fn remove_frames(&self, path: &Path, keys: &[String]) -> Result<TagSnapshot> {
        let mut tag = read_id3(path)?;
        for key in keys {
            let removed = tag.remove(key.as_str());
            tracing::debug!(
                path = %path.display(),
                key = %key,
                count = removed.len(),
                "Removed frames"
            );
        }
        let version = writable_version(&tag);
        swap_persist(path, |tmp| {
            tag.write_to_path(tmp, version)
                .map_err(|e| Error::tag(path, format!("cannot write tag: {e}")))
        })?;
        self.read(path)
    }

    fn remove_vendor_tag(&self, path: &Path) -> Result<TagSnapshot> {
        swap_persist(path, |tmp| {
            TagType::Ape
                .remove_from_path(tmp)
                .map_err(|e| Error::tag(path, format!("cannot remove APE tag: {e}")))
        })?;
        self.read(path)
    }

    fn write_embedded_cover(&self, path: &Path, bytes: &[u8]) -> Result<TagSnapshot> {
        let mut tag = match id3::Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => id3::Tag::new(),
            Err(e) => return Err(Error::tag(path, format!("cannot read ID3v2 tag: {e}"))),
        };
        let version = writable_version(&tag);

        tag.remove_all_pictures();
        tag.add_frame(Picture {
            mime_type: "image/jpeg".to_string(),
            picture_type: PictureType::CoverFront,
            description: String::new(),
            data: bytes.to_vec(),
        });

        swap_persist(path, |tmp| {
            tag.write_to_path(tmp, version)
                .map_err(|e| Error::tag(path, format!("cannot write cover: {e}")))
        })?;
        self.read(path)
    }
}

fn read_id3(path: &Path) -> Result<id3::Tag> {
    id3::Tag::read_from_path(path)
        .map_err(|e| Error::tag(path, format!("cannot read ID3v2 tag: {e}")))
}

/// id3 cannot write ID3v2.2, so such tags are upgraded to ID3v2.3.
fn writable_version(tag: &id3::Tag) -> Version {
    match tag.version() {
        Version::Id3v22 => Version::Id3v23,
        v => v,
    }
}

/// Frame key to text value, plus the first embedded picture.
fn collect_frames(tag: &id3::Tag) -> (BTreeMap<String, String>, Option<Vec<u8>>) {
    let mut frames = BTreeMap::new();
    for frame in tag.frames() {
        let value = match frame.content() {
            Content::Text(s) => s.clone(),
            _ => String::new(),
        };
        frames.entry(frame.id().to_string()).or_insert(value);
    }
    let cover = tag.pictures().next().map(|p| p.data.clone());
    (frames, cover)
}

/// Sibling path used while rewriting `path`.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("_tmp");
    PathBuf::from(name)
}

/// Apply `edit` to a copy of `path`, then swap the copy into place.
///
/// The original is only deleted once the edit succeeded; a failed edit
/// leaves the original untouched and removes the copy.
pub(crate) fn swap_persist(path: &Path, edit: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    let tmp = temp_sibling(path);
    fs::copy(path, &tmp).with_context(format!("copying {} for rewrite", path.display()))?;

    if let Err(e) = edit(&tmp) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            tracing::warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temp file");
        }
        return Err(e);
    }

    fs::remove_file(path).with_context(format!("deleting {}", path.display()))?;
    fs::rename(&tmp, path).with_context(format!("moving {} into place", tmp.display()))?;
    Ok(())
}
