//! Per-album tag checks.
//!
//! Each song ends up [`SongState::Clean`] or [`SongState::Skipped`]. A song
//! can also ask for a restart: when the operator answers "retry" to a
//! warning, the whole album is checked again from a fresh listing, so fixes
//! made by hand in the meantime are picked up.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{TagSnapshot, frame_description};
use crate::scanner::{file_name, is_audio_file};
use crate::session::Session;
use crate::terminal::MAX_ATTEMPTS;

const SONG_INDENT: usize = 2;

/// Result of checking one album.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCheck {
    /// Songs whose tag matches the policy after the check
    pub clean: usize,
    /// Songs left as they were (declined, unreadable or failed to persist)
    pub skipped: usize,
    /// Times the operator restarted the check
    pub restarts: usize,
}

/// How one song's check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SongState {
    Clean,
    Skipped,
    Restart,
}

/// Check every song in `album` against the allowed frame keys.
///
/// Does nothing when no frame list is configured. Entries that are not MP3
/// files are skipped and the check moves on to the next entry.
pub fn check_tags(session: &mut Session<'_>, album: &Path) -> TagCheck {
    let Some(allowed) = session.policy.tag_frames.clone() else {
        return TagCheck::default();
    };

    let mut check = TagCheck::default();
    for _ in 0..MAX_ATTEMPTS {
        let Some(entries) = session.list_songs(album) else {
            return check;
        };

        check.clean = 0;
        check.skipped = 0;
        let mut restart = false;
        for song in songs(&entries) {
            match check_song(session, song, &allowed) {
                SongState::Clean => check.clean += 1,
                SongState::Skipped => check.skipped += 1,
                SongState::Restart => {
                    restart = true;
                    break;
                }
            }
        }

        if !restart {
            return check;
        }
        check.restarts += 1;
        tracing::debug!(
            album = %album.display(),
            restarts = check.restarts,
            "Restarting tag check"
        );
    }

    tracing::warn!(album = %album.display(), "Tag check abandoned after {MAX_ATTEMPTS} passes");
    check
}

fn songs(entries: &[PathBuf]) -> impl Iterator<Item = &PathBuf> {
    entries.iter().filter(|path| {
        let audio = is_audio_file(path) && path.is_file();
        if !audio {
            tracing::debug!(path = %path.display(), "Not an MP3 file, skipping tag check");
        }
        audio
    })
}

fn check_song(session: &mut Session<'_>, song: &Path, allowed: &[String]) -> SongState {
    let name = file_name(song);
    let mut tag = match session.codec.read(song) {
        Ok(tag) => tag,
        Err(e) => {
            session.report(&e, &format!("Cannot read MP3 tag of {name}"), SONG_INDENT);
            return SongState::Skipped;
        }
    };
    let mut left_alone = false;

    if tag.has_legacy_tag() {
        session
            .terminal
            .warn(&format!("{name} has Id3v1 tag"), SONG_INDENT);
        if session.terminal.ask_to_retry(SONG_INDENT) {
            return SongState::Restart;
        }
        left_alone = true;
    }

    if tag.has_modern_tag() {
        let missing = missing_frames(&tag, allowed);
        if !missing.is_empty() {
            session
                .terminal
                .warn(&format!("{name} has missing frames:"), SONG_INDENT);
            for key in missing {
                let description = frame_description(key).unwrap_or(key);
                session.terminal.warn(&format!("- {description}"), SONG_INDENT + 1);
            }
            if session.terminal.ask_to_retry(SONG_INDENT) {
                return SongState::Restart;
            }
            left_alone = true;
        }

        if has_excess_frames(&tag, allowed) {
            let extra = extra_frames(&tag, allowed);
            tracing::debug!(song = %name, ?extra, "Frames outside the allowed set");
            if session.confirm_action(&format!("{name} has invalid tag. Clean?"), SONG_INDENT) {
                match session.codec.remove_frames(song, &extra) {
                    Ok(next) => {
                        tracing::info!(song = %name, removed = ?extra, "Tag cleaned");
                        tag = next;
                        session.terminal.confirm("Tag cleaned", SONG_INDENT);
                    }
                    Err(e) => {
                        session.report(&e, &format!("Cannot clean tag of {name}"), SONG_INDENT);
                        return SongState::Skipped;
                    }
                }
            } else {
                left_alone = true;
            }
        }
    }

    if !session.policy.custom_tag_allowed && tag.has_vendor_tag() {
        if session.confirm_action("Delete custom tag? (Y/n)", SONG_INDENT) {
            match session.codec.remove_vendor_tag(song) {
                Ok(_) => {
                    tracing::info!(song = %name, "Custom tag deleted");
                    session.terminal.confirm("Custom tag deleted", SONG_INDENT);
                }
                Err(e) => {
                    session.report(&e, &format!("Cannot delete custom tag of {name}"), SONG_INDENT);
                    return SongState::Skipped;
                }
            }
        } else {
            left_alone = true;
        }
    }

    if left_alone {
        SongState::Skipped
    } else {
        SongState::Clean
    }
}

/// Allowed keys absent from the tag, in configured order.
pub fn missing_frames<'a>(tag: &TagSnapshot, allowed: &'a [String]) -> Vec<&'a str> {
    let present = tag.frame_keys();
    allowed
        .iter()
        .map(String::as_str)
        .filter(|key| !present.contains(key))
        .collect()
}

/// Whether the tag carries more frames than the allowed list holds.
pub fn has_excess_frames(tag: &TagSnapshot, allowed: &[String]) -> bool {
    tag.frame_keys().len() > allowed.len()
}

/// Keys present in the tag but not allowed.
pub fn extra_frames(tag: &TagSnapshot, allowed: &[String]) -> Vec<String> {
    let allowed: BTreeSet<&str> = allowed.iter().map(String::as_str).collect();
    tag.frame_keys()
        .into_iter()
        .filter(|key| !allowed.contains(key))
        .map(str::to_string)
        .collect()
}
