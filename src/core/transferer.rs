//! Atomic transfer of a validated file into its canonical storage
//! location plus a mirrored symlink (spec §4.9). Ground-truthed on
//! `examples/original_source/src/services/transferer.py`
//! (`TransfererService.check_conflict`/`transfer_file`,
//! `_create_mirror_symlink`, rollback-on-symlink-failure), using this
//! crate's own [`crate::core::fs_port::Filesystem`] for the atomic move
//! and hash-prefix comparison, and [`crate::core::relpath`] for the
//! relative symlink target. `ConflictType::SimilarContent` is additive
//! (spec §4.9, not present in the Python original): it fires when the
//! destination directory already holds a file whose renamed stem, minus
//! technical suffix, matches the incoming file's.

use std::path::{Path, PathBuf};

use crate::core::fs_port::Filesystem;
use crate::core::relpath;
use crate::error::{Error, Result};

/// Kind of conflict detected at the destination (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
    /// Same content hash: the incoming file is already stored.
    Duplicate,
    /// Same destination name, different content.
    NameCollision,
    /// Different name, but the Organizer/Renamer would place both files
    /// at the same canonical stem — likely the same title re-encoded.
    SimilarContent,
}

/// Details of a conflict surfaced by [`check_conflict`].
#[derive(Debug, Clone)]
pub struct ConflictInfo {
    pub conflict_type: ConflictType,
    pub existing_path: PathBuf,
    pub existing_hash: String,
    pub new_hash: String,
}

/// Result of a successful transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub final_path: PathBuf,
    pub symlink_path: PathBuf,
}

/// Checks whether `destination` already exists and, if so, classifies the
/// conflict by comparing content hashes (first 10 MiB, spec §4.9).
pub async fn check_conflict(
    fs: &dyn Filesystem,
    source: &Path,
    destination: &Path,
) -> Result<Option<ConflictInfo>> {
    if !fs.exists(destination).await {
        return Ok(None);
    }

    let source_hash = fs.hash_prefix(source).await?;
    let dest_hash = fs.hash_prefix(destination).await?;

    let conflict_type = if source_hash == dest_hash {
        ConflictType::Duplicate
    } else {
        ConflictType::NameCollision
    };

    Ok(Some(ConflictInfo {
        conflict_type,
        existing_path: destination.to_path_buf(),
        existing_hash: dest_hash,
        new_hash: source_hash,
    }))
}

/// Scans `destination`'s siblings for a file whose canonical stem (path
/// stem minus its final `" {LANG} {CODEC} {RES}"` technical suffix, as
/// produced by [`crate::core::renamer`]) matches `destination`'s own stem
/// under a different name — the additive `SimilarContent` class.
pub async fn check_similar_content(
    fs: &dyn Filesystem,
    destination: &Path,
) -> Result<Option<ConflictInfo>> {
    let Some(parent) = destination.parent() else {
        return Ok(None);
    };
    if !fs.exists(parent).await {
        return Ok(None);
    }
    let Some(canonical) = canonical_stem(destination) else {
        return Ok(None);
    };

    for path in fs.list_children(parent).await? {
        if path == destination {
            continue;
        }
        if canonical_stem(&path).as_deref() == Some(canonical.as_str()) {
            return Ok(Some(ConflictInfo {
                conflict_type: ConflictType::SimilarContent,
                existing_path: path,
                existing_hash: String::new(),
                new_hash: String::new(),
            }));
        }
    }
    Ok(None)
}

/// Strips a trailing `" LANG CODEC RES"` technical suffix (any subset,
/// in that order) from a file stem, leaving the title/year portion that
/// the Renamer treats as canonical.
fn canonical_stem(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let known_tokens = [
        "MULTi", "VOSTFR", "EN", "FR", "DE", "ES", "IT", "JA",
        "x264", "x265", "AV1", "XviD",
        "4K", "1080p", "720p", "SD",
    ];
    let mut words: Vec<&str> = stem.split(' ').collect();
    while let Some(last) = words.last() {
        if known_tokens.contains(last) {
            words.pop();
        } else {
            break;
        }
    }
    Some(words.join(" ").trim().to_string())
}

/// Runs both conflict checks in order (spec §4.9: destination-exists hash
/// compare, then the broader same-canonical-position class) and returns
/// the first that fires.
pub async fn detect_conflict(
    fs: &dyn Filesystem,
    source: &Path,
    destination: &Path,
) -> Result<Option<ConflictInfo>> {
    if let Some(conflict) = check_conflict(fs, source, destination).await? {
        return Ok(Some(conflict));
    }
    check_similar_content(fs, destination).await
}

/// What the caller decided to do about a [`ConflictInfo`] (spec §4.9: "the
/// caller decides (keep_old, keep_new, keep_both, skip)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Leave the existing destination file untouched; drop the incoming one.
    KeepOld,
    /// Overwrite the existing destination file with the incoming one.
    KeepNew,
    /// Keep both: the incoming file is transferred under a disambiguated name.
    KeepBoth,
    /// Do nothing this run; leave the `PendingValidation` pending.
    Skip,
}

/// Applies a caller's [`ConflictResolution`] to an already-detected
/// conflict. `KeepOld`/`Skip` perform no filesystem mutation and return
/// `Ok(None)`; `KeepNew` removes the existing destination first;
/// `KeepBoth` transfers to a disambiguated sibling path instead.
pub async fn transfer_with_resolution(
    fs: &dyn Filesystem,
    source: &Path,
    destination: &Path,
    symlink_destination: &Path,
    resolution: ConflictResolution,
) -> Result<Option<TransferOutcome>> {
    match resolution {
        ConflictResolution::KeepOld | ConflictResolution::Skip => Ok(None),
        ConflictResolution::KeepNew => {
            if fs.exists(destination).await {
                fs.remove_file(destination).await?;
            }
            do_transfer(fs, source, destination, symlink_destination).await.map(Some)
        }
        ConflictResolution::KeepBoth => {
            let (alt_destination, alt_symlink) = disambiguate(fs, destination, symlink_destination).await?;
            do_transfer(fs, source, &alt_destination, &alt_symlink).await.map(Some)
        }
    }
}

/// Finds the first `{stem} (N){ext}` variant that doesn't already exist at
/// `destination`, mirroring the same suffix onto `symlink_destination`.
async fn disambiguate(fs: &dyn Filesystem, destination: &Path, symlink_destination: &Path) -> Result<(PathBuf, PathBuf)> {
    let stem = destination.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = destination.extension().and_then(|e| e.to_str());
    let dest_parent = destination.parent().unwrap_or(Path::new(""));
    let link_parent = symlink_destination.parent().unwrap_or(Path::new(""));

    let mut n = 2;
    loop {
        let name = match ext {
            Some(e) => format!("{stem} ({n}).{e}"),
            None => format!("{stem} ({n})"),
        };
        let candidate_dest = dest_parent.join(&name);
        if !fs.exists(&candidate_dest).await {
            return Ok((candidate_dest, link_parent.join(&name)));
        }
        n += 1;
    }
}

/// Moves `source` to `destination` and creates a relative symlink at
/// `symlink_destination` (spec §4.9: "compute the symlink path, either a
/// mirror of the storage path under the symlink root, or a caller-provided
/// custom path" — the caller, not the Transferer, decides which; here it is
/// always supplied explicitly since the Organizer already computed it,
/// possibly diverging from a plain mirror per spec §4.7). Rolls back the
/// move if symlink creation fails, so a failed transfer never leaves an
/// orphaned storage file.
pub async fn transfer_file(
    fs: &dyn Filesystem,
    source: &Path,
    destination: &Path,
    symlink_destination: &Path,
) -> Result<TransferOutcome> {
    if let Some(conflict) = detect_conflict(fs, source, destination).await? {
        return Err(Error::Conflict(Box::new(conflict)));
    }
    do_transfer(fs, source, destination, symlink_destination).await
}

/// The atomic move + symlink creation + rollback-on-failure core shared by
/// [`transfer_file`] and [`transfer_with_resolution`] (spec §4.9 steps 2-4).
async fn do_transfer(
    fs: &dyn Filesystem,
    source: &Path,
    destination: &Path,
    symlink_destination: &Path,
) -> Result<TransferOutcome> {
    if let Some(parent) = destination.parent() {
        fs.create_dir_all(parent).await?;
    }
    fs.move_file(source, destination).await?;

    match create_mirror_symlink(fs, destination, symlink_destination).await {
        Ok(()) => Ok(TransferOutcome {
            final_path: destination.to_path_buf(),
            symlink_path: symlink_destination.to_path_buf(),
        }),
        Err(e) => {
            let _ = fs.move_file(destination, source).await;
            Err(e)
        }
    }
}

async fn create_mirror_symlink(fs: &dyn Filesystem, target: &Path, symlink_path: &Path) -> Result<()> {
    if let Some(parent) = symlink_path.parent() {
        fs.create_dir_all(parent).await?;
    }
    let relative_target = match symlink_path.parent() {
        Some(parent) => relpath::relative_to(target, parent),
        None => target.to_path_buf(),
    };
    fs.create_symlink(&relative_target, symlink_path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::fs::StdFilesystem;

    #[test]
    fn canonical_stem_strips_technical_suffix() {
        assert_eq!(
            canonical_stem(Path::new("Inception (2010) MULTi x264 1080p.mkv")).as_deref(),
            Some("Inception (2010)")
        );
        assert_eq!(
            canonical_stem(Path::new("Inception (2010) [fr] x264 1080p.mkv")).as_deref(),
            Some("Inception (2010) [fr]")
        );
    }

    #[tokio::test]
    async fn transfer_file_moves_and_creates_relative_symlink() {
        let fs = StdFilesystem;
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("incoming.mkv");
        std::fs::write(&source, b"hello").unwrap();

        let destination = tmp.path().join("storage/Films/A/A (2020).mkv");
        let symlink_destination = tmp.path().join("video/Films/A/A (2020).mkv");

        let outcome = transfer_file(&fs, &source, &destination, &symlink_destination).await.unwrap();
        assert!(!source.exists());
        assert!(destination.exists());
        assert_eq!(outcome.final_path, destination);

        let resolved = std::fs::read_link(&symlink_destination).unwrap();
        assert!(resolved.is_relative());
        assert_eq!(
            std::fs::canonicalize(symlink_destination.parent().unwrap().join(&resolved)).unwrap(),
            std::fs::canonicalize(&destination).unwrap()
        );
    }

    #[tokio::test]
    async fn duplicate_content_is_detected_as_conflict() {
        let fs = StdFilesystem;
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("incoming.mkv");
        let destination = tmp.path().join("existing.mkv");
        std::fs::write(&source, b"same bytes").unwrap();
        std::fs::write(&destination, b"same bytes").unwrap();

        let conflict = detect_conflict(&fs, &source, &destination).await.unwrap().unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::Duplicate);
    }

    #[tokio::test]
    async fn name_collision_is_detected_when_content_differs() {
        let fs = StdFilesystem;
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("incoming.mkv");
        let destination = tmp.path().join("existing.mkv");
        std::fs::write(&source, b"new bytes").unwrap();
        std::fs::write(&destination, b"old bytes").unwrap();

        let conflict = detect_conflict(&fs, &source, &destination).await.unwrap().unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::NameCollision);
    }

    #[tokio::test]
    async fn keep_both_transfers_to_a_disambiguated_sibling_name() {
        let fs = StdFilesystem;
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("incoming.mkv");
        let destination = tmp.path().join("Movie (2020).mkv");
        let symlink_destination = tmp.path().join("link/Movie (2020).mkv");
        std::fs::write(&source, b"new bytes").unwrap();
        std::fs::write(&destination, b"old bytes").unwrap();

        let outcome =
            transfer_with_resolution(&fs, &source, &destination, &symlink_destination, ConflictResolution::KeepBoth)
                .await
                .unwrap()
                .unwrap();

        assert_eq!(outcome.final_path, tmp.path().join("Movie (2020) (2).mkv"));
        assert!(destination.exists(), "original file is untouched");
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn keep_old_and_skip_perform_no_mutation() {
        let fs = StdFilesystem;
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("incoming.mkv");
        let destination = tmp.path().join("existing.mkv");
        std::fs::write(&source, b"new").unwrap();
        std::fs::write(&destination, b"old").unwrap();

        for resolution in [ConflictResolution::KeepOld, ConflictResolution::Skip] {
            let outcome =
                transfer_with_resolution(&fs, &source, &destination, &tmp.path().join("link.mkv"), resolution)
                    .await
                    .unwrap();
            assert!(outcome.is_none());
            assert!(source.exists());
            assert_eq!(std::fs::read(&destination).unwrap(), b"old");
        }
    }
}
