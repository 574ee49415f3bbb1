use std::fs;
use std::path::{Path, PathBuf};

use super::is_jpeg;
use crate::error::{Error, Result, ResultExt};
use crate::scanner::{self, extension, file_name, is_audio_file};
use crate::session::{CoverPolicy, Session};
use crate::terminal::MAX_ATTEMPTS;

const INDENT: usize = 2;

/// What processing did to the songs' embedded covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSync {
    /// Processing is off or the cover is not a JPEG
    NotApplicable,
    /// No song in the album to compare against
    NoSongs,
    /// Every song already carries the cover file's bytes
    Unchanged,
    /// The cover was written into this many songs
    Written(usize),
}

/// Turn a legacy-named image into the cover file.
///
/// Does nothing when the cover file already exists or no legacy image is
/// present. Same extension: rename (asks first). Different extension:
/// convert, leaving the legacy file for the deletion step.
pub fn reconcile_cover(session: &mut Session<'_>, album: &Path, policy: &CoverPolicy) {
    let target = album.join(&policy.file_name);
    if target.is_file() {
        return;
    }
    let Some(legacy_names) = &policy.legacy_names else {
        return;
    };

    let entries = scanner::list_dir(album).into_entries();
    let Some(legacy) = find_legacy_cover(&entries, legacy_names) else {
        return;
    };
    let legacy_name = file_name(legacy);

    if extension(&legacy_name).eq_ignore_ascii_case(extension(&policy.file_name)) {
        let prompt = format!("Rename {legacy_name} to {}? (Y/n)", policy.file_name);
        if !session.confirm_action(&prompt, INDENT) {
            return;
        }
        match fs::rename(legacy, &target) {
            Ok(()) => {
                tracing::info!(from = %legacy.display(), to = %target.display(), "Renamed cover");
                session.terminal.confirm(&format!("{legacy_name} renamed"), INDENT);
            }
            Err(e) => {
                let message = format!("Cannot rename {legacy_name}");
                session.report(&Error::from(e), &message, INDENT);
            }
        }
    } else {
        match session.images.convert(legacy, &target) {
            Ok(()) => session.terminal.confirm(
                &format!("{legacy_name} converted to {}", policy.file_name),
                INDENT,
            ),
            Err(e) => session.report(&e, "Cannot convert cover", INDENT),
        }
    }
}

fn find_legacy_cover<'a>(entries: &'a [PathBuf], legacy_names: &[String]) -> Option<&'a PathBuf> {
    entries
        .iter()
        .filter(|p| p.is_file())
        .find(|p| legacy_names.iter().any(|n| *n == file_name(p)))
}

/// Keep pointing the operator at the album until the cover file exists.
///
/// Returns whether the cover exists when the operator stops retrying.
pub fn ensure_cover_exists(session: &mut Session<'_>, album: &Path, cover_name: &str) -> bool {
    let cover = album.join(cover_name);
    for _ in 0..MAX_ATTEMPTS {
        if cover.is_file() {
            return true;
        }
        session.signal("Cover does not exist", album, INDENT);
        if !session.terminal.ask_to_retry(INDENT) {
            return false;
        }
    }
    cover.is_file()
}

/// Normalise a JPEG cover and sync it into the songs' tags.
///
/// A progressive cover is converted in place to baseline first. The file is
/// then compared with the picture embedded in each song, and written into
/// the songs whose picture differs or is missing.
pub fn ensure_cover_processed(
    session: &mut Session<'_>,
    album: &Path,
    policy: &CoverPolicy,
) -> CoverSync {
    if !policy.process || !is_jpeg(&policy.file_name) {
        return CoverSync::NotApplicable;
    }

    let cover = album.join(&policy.file_name);
    let bytes = match normalise(session, &cover) {
        Ok(bytes) => bytes,
        Err(e) => {
            session.report(&e, "Cannot convert cover", INDENT);
            return CoverSync::NotApplicable;
        }
    };

    let songs: Vec<PathBuf> = scanner::list_dir(album)
        .into_entries()
        .into_iter()
        .filter(|p| is_audio_file(p) && p.is_file())
        .collect();
    if songs.is_empty() {
        return CoverSync::NoSongs;
    }

    let mut stale = Vec::new();
    for song in &songs {
        match session.codec.read(song) {
            Ok(tag) if tag.embedded_cover() == Some(bytes.as_slice()) => {}
            Ok(_) => stale.push(song),
            Err(e) => {
                let message = format!("Cannot read MP3 tag of {}", file_name(song));
                session.report(&e, &message, INDENT);
            }
        }
    }
    if stale.is_empty() {
        return CoverSync::Unchanged;
    }

    let mut written = 0;
    for song in stale {
        match session.codec.write_embedded_cover(song, &bytes) {
            Ok(_) => written += 1,
            Err(e) => {
                let message = format!("Cannot save cover to {}", file_name(song));
                session.report(&e, &message, INDENT);
            }
        }
    }
    if written > 0 {
        tracing::info!(album = %album.display(), songs = written, "Cover saved to MP3");
        session.terminal.confirm("Cover saved to MP3", INDENT);
    }
    CoverSync::Written(written)
}

/// Convert a progressive cover to baseline in place and return its bytes.
fn normalise(session: &Session<'_>, cover: &Path) -> Result<Vec<u8>> {
    if !session.images.is_baseline_jpeg(cover)? {
        tracing::debug!(cover = %cover.display(), "Progressive JPEG, converting to baseline");
        session.images.convert(cover, cover)?;
    }
    fs::read(cover).with_context(format!("reading {}", cover.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::MockImageTool;
    use crate::metadata::TagSnapshot;
    use crate::session::RepairPolicy;
    use crate::test_utils::{CodecWrite, FakeImageTool, Harness, entry_names, touch, write_file};
    use tempfile::tempdir;

    fn cover_policy(legacy: &[&str], process: bool) -> CoverPolicy {
        CoverPolicy {
            file_name: "cover.jpg".into(),
            legacy_names: Some(legacy.iter().map(|s| s.to_string()).collect()),
            process,
        }
    }

    #[test]
    fn test_existing_cover_is_left_alone() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), "folder.jpg");
        let mut harness = Harness::default();

        reconcile_cover(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&["folder.jpg"], false),
        );

        assert_eq!(entry_names(dir.path()), ["cover.jpg", "folder.jpg"]);
        assert!(harness.terminal.questions().is_empty());
    }

    #[test]
    fn test_same_extension_legacy_cover_is_renamed() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "folder.jpg", b"jpeg");
        touch(dir.path(), "01 - Come Together.mp3");
        let mut harness = Harness::default();

        reconcile_cover(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&["front.jpg", "folder.jpg"], false),
        );

        assert_eq!(entry_names(dir.path()), ["01 - Come Together.mp3", "cover.jpg"]);
        assert_eq!(harness.terminal.questions(), ["Rename folder.jpg to cover.jpg? (Y/n)"]);
        assert_eq!(harness.terminal.confirmations(), ["folder.jpg renamed"]);
    }

    #[test]
    fn test_declined_rename_keeps_legacy_cover() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "folder.jpg");
        let mut harness = Harness::with_answers(["n"]);

        reconcile_cover(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&["folder.jpg"], false),
        );

        assert_eq!(entry_names(dir.path()), ["folder.jpg"]);
    }

    #[test]
    fn test_other_extension_legacy_cover_is_converted() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "front.png", b"png");
        let mut harness = Harness::with_images(FakeImageTool::baseline());

        reconcile_cover(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&["front.png"], false),
        );

        assert_eq!(entry_names(dir.path()), ["cover.jpg", "front.png"]);
        assert!(harness.terminal.questions().is_empty());
        assert_eq!(
            harness.terminal.confirmations(),
            ["front.png converted to cover.jpg"]
        );
    }

    #[test]
    fn test_failed_conversion_is_reported() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "front.png");
        let mut images = MockImageTool::new();
        images
            .expect_convert()
            .times(1)
            .returning(|_, _| Err(Error::external_tool("convert", "exit status: 1")));
        let mut harness = Harness::with_images(images);

        reconcile_cover(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&["front.png"], false),
        );

        assert_eq!(harness.terminal.errors(), ["Cannot convert cover"]);
    }

    #[test]
    fn test_ensure_cover_exists_retries_until_declined() {
        let dir = tempdir().unwrap();
        let mut harness = Harness::with_answers(["y", "n"]);

        let exists = ensure_cover_exists(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            "cover.jpg",
        );

        assert!(!exists);
        assert_eq!(
            harness.terminal.warnings(),
            ["Cover does not exist.", "Cover does not exist."]
        );
    }

    #[test]
    fn test_ensure_cover_exists_is_bounded() {
        let dir = tempdir().unwrap();
        let mut harness = Harness::default();

        let exists = ensure_cover_exists(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            "cover.jpg",
        );

        assert!(!exists);
        assert_eq!(harness.terminal.questions().len(), MAX_ATTEMPTS);
    }

    #[test]
    fn test_baseline_cover_is_never_converted() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "cover.jpg", b"baseline");
        touch(dir.path(), "01 - Come Together.mp3");
        let mut images = MockImageTool::new();
        images.expect_is_baseline_jpeg().times(1).returning(|_| Ok(true));
        images.expect_convert().never();
        let mut harness = Harness::with_images(images);
        harness.codec.insert(
            TagSnapshot::untagged("01 - Come Together.mp3").with_cover(b"baseline".to_vec()),
        );

        let sync = ensure_cover_processed(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&[], true),
        );

        assert_eq!(sync, CoverSync::Unchanged);
        assert!(harness.codec.writes().is_empty());
    }

    #[test]
    fn test_progressive_cover_is_converted_then_compared() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "cover.jpg", b"progressive");
        touch(dir.path(), "01 - Come Together.mp3");
        touch(dir.path(), "02 - Something.mp3");
        let mut images = MockImageTool::new();
        images.expect_is_baseline_jpeg().times(1).returning(|_| Ok(false));
        images
            .expect_convert()
            .withf(|src, dst| src == dst && src.ends_with("cover.jpg"))
            .times(1)
            .returning(|src, _| {
                fs::write(src, b"baseline")?;
                Ok(())
            });
        let mut harness = Harness::with_images(images);
        harness.codec.insert(
            TagSnapshot::untagged("01 - Come Together.mp3").with_cover(b"progressive".to_vec()),
        );

        let sync = ensure_cover_processed(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&[], true),
        );

        assert_eq!(sync, CoverSync::Written(2));
        assert_eq!(
            harness.codec.writes(),
            [
                CodecWrite::WriteCover {
                    file: "01 - Come Together.mp3".into(),
                    bytes: b"baseline".to_vec(),
                },
                CodecWrite::WriteCover {
                    file: "02 - Something.mp3".into(),
                    bytes: b"baseline".to_vec(),
                },
            ]
        );
        assert_eq!(harness.terminal.confirmations(), ["Cover saved to MP3"]);
    }

    #[test]
    fn test_progressive_cover_matching_tags_writes_nothing() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "cover.jpg", b"progressive");
        touch(dir.path(), "01 - Come Together.mp3");
        let mut images = MockImageTool::new();
        images.expect_is_baseline_jpeg().returning(|_| Ok(false));
        images.expect_convert().times(1).returning(|src, _| {
            fs::write(src, b"baseline")?;
            Ok(())
        });
        let mut harness = Harness::with_images(images);
        harness.codec.insert(
            TagSnapshot::untagged("01 - Come Together.mp3").with_cover(b"baseline".to_vec()),
        );

        let sync = ensure_cover_processed(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&[], true),
        );

        assert_eq!(sync, CoverSync::Unchanged);
        assert!(harness.codec.writes().is_empty());
    }

    #[test]
    fn test_only_songs_with_stale_cover_are_written() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "cover.jpg", b"baseline");
        touch(dir.path(), "01 - Come Together.mp3");
        touch(dir.path(), "02 - Something.mp3");
        touch(dir.path(), "03 - Maxwell's Silver Hammer.mp3");
        let mut harness = Harness::with_images(FakeImageTool::baseline());
        harness.codec.insert(
            TagSnapshot::untagged("01 - Come Together.mp3").with_cover(b"baseline".to_vec()),
        );
        harness
            .codec
            .insert(TagSnapshot::untagged("02 - Something.mp3").with_cover(b"stale".to_vec()));

        let sync = ensure_cover_processed(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&[], true),
        );

        assert_eq!(sync, CoverSync::Written(2));
        let cover = |name: &str| {
            harness
                .codec
                .snapshot(name)
                .and_then(|tag| tag.embedded_cover().map(<[u8]>::to_vec))
        };
        assert_eq!(cover("01 - Come Together.mp3"), Some(b"baseline".to_vec()));
        assert_eq!(cover("02 - Something.mp3"), Some(b"baseline".to_vec()));
        assert_eq!(cover("03 - Maxwell's Silver Hammer.mp3"), Some(b"baseline".to_vec()));
        assert!(!harness.codec.writes().iter().any(|w| matches!(
            w,
            CodecWrite::WriteCover { file, .. } if file == "01 - Come Together.mp3"
        )));
    }

    #[test]
    fn test_inspection_failure_is_reported() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "cover.jpg", b"jpeg");
        let mut images = MockImageTool::new();
        images
            .expect_is_baseline_jpeg()
            .returning(|_| Err(Error::external_tool("identify", "failed to run")));
        let mut harness = Harness::with_images(images);

        let sync = ensure_cover_processed(
            &mut harness.session(RepairPolicy::default()),
            dir.path(),
            &cover_policy(&[], true),
        );

        assert_eq!(sync, CoverSync::NotApplicable);
        assert_eq!(harness.terminal.errors(), ["Cannot convert cover"]);
    }

    #[test]
    fn test_processing_skipped_for_png_or_when_disabled() {
        let dir = tempdir().unwrap();
        let mut images = MockImageTool::new();
        images.expect_is_baseline_jpeg().never();
        let mut harness = Harness::with_images(images);
        let png = CoverPolicy {
            file_name: "cover.png".into(),
            legacy_names: None,
            process: true,
        };

        let mut session = harness.session(RepairPolicy::default());
        assert_eq!(
            ensure_cover_processed(&mut session, dir.path(), &png),
            CoverSync::NotApplicable
        );
        assert_eq!(
            ensure_cover_processed(&mut session, dir.path(), &cover_policy(&[], false)),
            CoverSync::NotApplicable
        );
    }
}
