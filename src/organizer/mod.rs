//! Per-album repair.
//!
//! [`repair_album`] runs the album through a fixed sequence of steps. Each
//! step lists the directory afresh, handles its own failures and reports
//! them to the operator, so a failing step never stops the ones after it:
//!
//! 1. sub-directories inside the album are pointed out
//! 2. song filenames are checked against the filename pattern
//! 3. tags are checked against the allowed frames
//! 4. the cover file is reconciled, required and processed
//! 5. files that are neither songs nor the cover are deleted
//! 6. the album directory is renamed from its tags

pub mod naming;

use std::fs;
use std::path::{Path, PathBuf};

use crate::cover;
use crate::error::Error;
use crate::metadata::check_tags;
use crate::scanner::{self, file_name, is_audio_file};
use crate::session::Session;
use crate::terminal::MAX_ATTEMPTS;
use naming::{derive_album_name, is_valid_name, renamed_path};

const ALBUM_INDENT: usize = 1;
const SONG_INDENT: usize = 2;

/// How an album's repair ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumOutcome {
    /// Every step ran; `path` is where the album lives now
    Repaired { path: PathBuf },
    /// The album directory holds nothing
    Empty,
}

/// Run every configured repair step on one album.
pub fn repair_album(session: &mut Session<'_>, album: &Path) -> AlbumOutcome {
    if session.list_songs(album).is_none() {
        return AlbumOutcome::Empty;
    }

    check_entries_are_files(session, album);

    if session.policy.filename_pattern.is_some() {
        validate_song_filenames(session, album);
    }

    if session.policy.tag_frames.is_some() {
        let check = check_tags(session, album);
        tracing::debug!(album = %album.display(), ?check, "Tags checked");
    }

    if let Some(policy) = session.policy.cover.clone() {
        if policy.legacy_names.is_some() {
            cover::reconcile_cover(session, album, &policy);
        }
        if cover::ensure_cover_exists(session, album, &policy.file_name) {
            let sync = cover::ensure_cover_processed(session, album, &policy);
            tracing::debug!(album = %album.display(), ?sync, "Cover processed");
        }
    }

    delete_invalid_files(session, album);

    let path = rename_album_directory(session, album);
    AlbumOutcome::Repaired { path }
}

/// Point out every sub-directory inside the album.
pub fn check_entries_are_files(session: &mut Session<'_>, album: &Path) {
    for entry in scanner::list_dir(album).into_entries() {
        if entry.is_dir() {
            session.signal_and_continue(
                &format!("{} is not a file", file_name(&entry)),
                album,
                SONG_INDENT,
            );
        }
    }
}

/// Point out every song whose filename does not match the pattern.
///
/// Answering "retry" starts over from a fresh listing. Returns the number of
/// invalid names seen in the last pass.
pub fn validate_song_filenames(session: &mut Session<'_>, album: &Path) -> usize {
    let Some(pattern) = session.policy.filename_pattern.clone() else {
        return 0;
    };

    let mut invalid = 0;
    'passes: for _ in 0..MAX_ATTEMPTS {
        invalid = 0;
        for song in scanner::list_dir(album).into_entries() {
            let name = file_name(&song);
            if !song.is_file() || !is_audio_file(&song) || is_valid_name(&name, &pattern) {
                continue;
            }
            invalid += 1;
            session.signal(&format!("{name} is not a valid filename"), album, SONG_INDENT);
            if session.terminal.ask_to_retry(SONG_INDENT) {
                continue 'passes;
            }
        }
        return invalid;
    }
    invalid
}

/// Whether a file with this name should be deleted from an album.
///
/// Songs and the configured cover file stay; everything else goes.
pub fn is_deletion_candidate(name: &str, cover_name: Option<&str>) -> bool {
    !is_audio_file(Path::new(name)) && cover_name != Some(name)
}

/// Delete every file that is neither a song nor the cover file.
///
/// Sub-directories are left to [`check_entries_are_files`].
pub fn delete_invalid_files(session: &mut Session<'_>, album: &Path) {
    let cover_name = session.policy.cover_name().map(str::to_string);
    for entry in scanner::list_dir(album).into_entries() {
        let name = file_name(&entry);
        if !entry.is_file() || !is_deletion_candidate(&name, cover_name.as_deref()) {
            continue;
        }
        if !session.confirm_action(&format!("Delete {name}? (Y/n)"), SONG_INDENT) {
            continue;
        }
        match fs::remove_file(&entry) {
            Ok(()) => {
                tracing::info!(path = %entry.display(), "Deleted");
                session.terminal.confirm(&format!("{name} deleted"), SONG_INDENT);
            }
            Err(e) => {
                let message = format!("Cannot delete {name}");
                session.report(&Error::from(e), &message, SONG_INDENT);
            }
        }
    }
}

/// Rename the album directory from its first song's tag.
///
/// Skipped when the name already matches the album pattern. Returns where
/// the album lives afterwards.
pub fn rename_album_directory(session: &mut Session<'_>, album: &Path) -> PathBuf {
    let Some(naming) = session.policy.album_naming.clone() else {
        return album.to_path_buf();
    };
    let current = file_name(album);
    if is_valid_name(&current, &naming.pattern) {
        return album.to_path_buf();
    }

    for _ in 0..MAX_ATTEMPTS {
        let songs = scanner::list_dir(album).into_entries();
        let derived = match derive_album_name(session.codec, &songs, &naming.mask) {
            Ok(derived) => derived,
            Err(e) => {
                session.report(&e, "Cannot read MP3 tag", ALBUM_INDENT);
                return album.to_path_buf();
            }
        };

        let Some(derived) = derived else {
            session
                .terminal
                .warn("Cannot build album directory name from mask", ALBUM_INDENT);
            if session.terminal.ask_to_retry(ALBUM_INDENT) {
                continue;
            }
            return album.to_path_buf();
        };

        for field in &derived.unavailable {
            session.terminal.warn(
                &format!("{} cannot be used in album directory mask", field.label()),
                SONG_INDENT,
            );
        }

        if derived.name == current {
            return album.to_path_buf();
        }
        return rename_to(session, album, &current, &derived.name);
    }
    album.to_path_buf()
}

fn rename_to(session: &mut Session<'_>, album: &Path, current: &str, target_name: &str) -> PathBuf {
    let target = renamed_path(album, target_name);
    if !session.confirm_action(&format!("Rename {current} to {target_name}? (Y/n)"), SONG_INDENT) {
        return album.to_path_buf();
    }

    let result = if target.exists() {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        )))
    } else {
        fs::rename(album, &target).map_err(Error::from)
    };

    match result {
        Ok(()) => {
            tracing::info!(from = %album.display(), to = %target.display(), "Renamed album");
            session.terminal.confirm(&format!("{current} renamed"), SONG_INDENT);
            target
        }
        Err(e) => {
            session.report(&e, &format!("Cannot rename to {target_name}"), SONG_INDENT);
            album.to_path_buf()
        }
    }
}
