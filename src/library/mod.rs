//! Library traversal: artists, then albums, then each album's repair.
//!
//! The walk is depth-first and strictly sequential. Problems at one level
//! (a stray file among artists, an artist without albums, an empty album)
//! are pointed out to the operator and the walk moves on to the next
//! sibling; nothing found below the root stops the run.

use std::path::Path;

use crate::organizer::{AlbumOutcome, repair_album};
use crate::scanner::{self, Listing, file_name};
use crate::session::Session;

const ARTIST_INDENT: usize = 0;
const ALBUM_INDENT: usize = 1;
const SONG_INDENT: usize = 2;

/// What a run went through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub artists: usize,
    pub albums: usize,
    pub empty_albums: usize,
}

/// Walk the library under `root`, repairing every selected album.
pub fn run(session: &mut Session<'_>, root: &Path) -> RunSummary {
    let mut summary = RunSummary::default();

    let artists = match scanner::list_dir(root) {
        Listing::Entries(entries) => entries,
        Listing::Empty => {
            session.signal_and_continue("No artists in directory", root, ARTIST_INDENT);
            return summary;
        }
    };

    let selection = session.policy.selection.clone();
    for artist in artists {
        let name = file_name(&artist);
        if selection.album.is_none() && selection.artist.as_ref().is_some_and(|a| *a != name) {
            continue;
        }

        if selection.album.is_none() {
            session.terminal.info(&format!("{name}:"), ARTIST_INDENT);
        }

        if !artist.is_dir() {
            session.signal_and_continue(&format!("{name} is not a directory"), root, ARTIST_INDENT);
            continue;
        }
        summary.artists += 1;

        let albums = match scanner::list_dir(&artist) {
            Listing::Entries(entries) => entries,
            Listing::Empty => {
                session.signal_and_continue("No albums in directory", &artist, ARTIST_INDENT);
                continue;
            }
        };

        for album in albums {
            let album_name = file_name(&album);
            if selection.album.as_ref().is_some_and(|a| *a != album_name) {
                continue;
            }

            session.terminal.info(&format!("{album_name}:"), ALBUM_INDENT);

            if !album.is_dir() {
                session.signal_and_continue(
                    &format!("{album_name} is not a directory"),
                    &artist,
                    ALBUM_INDENT,
                );
                continue;
            }
            summary.albums += 1;

            let _span =
                tracing::debug_span!("album", artist = %name, album = %album_name).entered();
            match repair_album(session, &album) {
                AlbumOutcome::Repaired { path } => {
                    tracing::debug!(path = %path.display(), "Album done");
                    session.terminal.confirm("[OK]", SONG_INDENT);
                }
                AlbumOutcome::Empty => summary.empty_albums += 1,
            }
        }
    }

    tracing::info!(
        artists = summary.artists,
        albums = summary.albums,
        empty = summary.empty_albums,
        "Library walk finished"
    );
    summary
}
