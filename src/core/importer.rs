//! Import-inverse: reconstructing the catalog from an already-organized
//! tree (spec §4.13). Ground-truthed on
//! `examples/original_source/src/services/importer.py`
//! (`ImporterService.scan_library`/`_should_import`/`_import_file`,
//! `scan_from_symlinks`/`_process_symlink`/`_import_symlink`): a physical
//! scan under `storage_dir` and a symlink scan under `symlink_dir`, both
//! deciding per file between `Import` (new), `SkipKnown` (same hash
//! already on record), `UpdatePath` (known hash, moved on disk), using
//! [`crate::core::batch::ItemOutcome`] instead of a bespoke result type.

use std::path::{Path, PathBuf};

use crate::core::batch::ItemOutcome;
use crate::core::entities::{PendingValidation, VideoFile};
use crate::core::fs_port::Filesystem;
use crate::core::repository::{PendingValidationRepository, VideoFileRepository};
use crate::core::scanner::{SourceSubtree, VIDEO_EXTENSIONS};
use crate::error::Result;
use crate::services::ffprobe::MediaProbe;

/// What happened to one file during an import scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportDecision {
    Import,
    SkipKnown,
    UpdatePath,
    /// Known path, content hash changed — spec §4.10's "found by path but
    /// hash mismatched → reimport".
    Reimport,
}

fn has_ignored_substring(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    crate::core::scanner::IGNORED_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Scans `storage_dir` recursively and imports every video file not
/// already known (spec §4.13 physical mode).
pub async fn import_from_storage(
    fs: &dyn Filesystem,
    probe: &dyn MediaProbe,
    video_repo: &dyn VideoFileRepository,
    pending_repo: &dyn PendingValidationRepository,
    storage_dir: &Path,
) -> Result<Vec<ItemOutcome<ImportDecision>>> {
    let mut outcomes = Vec::new();
    for entry in fs.list_video_files(storage_dir, VIDEO_EXTENSIONS).await? {
        if has_ignored_substring(&file_name(&entry.path)) {
            continue;
        }
        outcomes.push(process_physical_file(fs, probe, video_repo, pending_repo, &entry.path, entry.size_bytes).await);
    }
    Ok(outcomes)
}

/// Scans `symlink_dir` recursively, resolving every symlink to its
/// physical target and importing both paths (spec §4.13 symlink mode,
/// "import-inverse").
pub async fn import_from_symlinks(
    fs: &dyn Filesystem,
    probe: &dyn MediaProbe,
    video_repo: &dyn VideoFileRepository,
    pending_repo: &dyn PendingValidationRepository,
    symlink_dir: &Path,
) -> Result<Vec<ItemOutcome<ImportDecision>>> {
    let mut outcomes = Vec::new();
    for link_path in fs.list_children(symlink_dir).await.unwrap_or_default() {
        outcomes.extend(walk_symlinks(fs, probe, video_repo, pending_repo, &link_path).await?);
    }
    Ok(outcomes)
}

/// Recursively walks `dir`, yielding one outcome per symlink found. Not
/// part of the [`Filesystem`] port since only the Importer needs a
/// symlink-aware recursive walk (the Scanner's walk already skips
/// symlinks entirely, per spec §4.3).
fn walk_symlinks<'a>(
    fs: &'a dyn Filesystem,
    probe: &'a dyn MediaProbe,
    video_repo: &'a dyn VideoFileRepository,
    pending_repo: &'a dyn PendingValidationRepository,
    path: &'a Path,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<ItemOutcome<ImportDecision>>>> + 'a>> {
    Box::pin(async move {
        let mut outcomes = Vec::new();
        if fs.is_symlink(path).await {
            let filename = file_name(path);
            if has_video_extension(&filename) && !has_ignored_substring(&filename) {
                outcomes.push(process_symlink(fs, probe, video_repo, pending_repo, path).await);
            }
            return Ok(outcomes);
        }
        for child in fs.list_children(path).await.unwrap_or_default() {
            outcomes.extend(walk_symlinks(fs, probe, video_repo, pending_repo, &child).await?);
        }
        Ok(outcomes)
    })
}

/// Decides what to do with a file at `path` (spec §4.10): known by hash at
/// the same path → `SkipKnown`; known by hash at a different path →
/// `UpdatePath`; unknown by hash but a record already exists at this exact
/// path → `Reimport` (content changed under a stable name); otherwise a
/// brand-new `Import`.
async fn decide(
    fs: &dyn Filesystem,
    repo: &dyn VideoFileRepository,
    path: &Path,
) -> Result<(ImportDecision, Option<VideoFile>, String)> {
    let content_hash = fs.hash_prefix(path).await?;
    if let Some(existing) = repo.get_by_hash(&content_hash).await? {
        if existing.path != path {
            return Ok((ImportDecision::UpdatePath, Some(existing), content_hash));
        }
        return Ok((ImportDecision::SkipKnown, Some(existing), content_hash));
    }
    if let Some(existing) = repo.get_by_path(path).await? {
        return Ok((ImportDecision::Reimport, Some(existing), content_hash));
    }
    Ok((ImportDecision::Import, None, content_hash))
}

async fn process_physical_file(
    fs: &dyn Filesystem,
    probe: &dyn MediaProbe,
    video_repo: &dyn VideoFileRepository,
    pending_repo: &dyn PendingValidationRepository,
    path: &Path,
    size_bytes: u64,
) -> ItemOutcome<ImportDecision> {
    match process_physical_file_inner(fs, probe, video_repo, pending_repo, path, size_bytes).await {
        Ok(outcome) => outcome,
        Err(e) => ItemOutcome::Failed { path: path.to_path_buf(), reason: e.to_string() },
    }
}

async fn process_physical_file_inner(
    fs: &dyn Filesystem,
    probe: &dyn MediaProbe,
    video_repo: &dyn VideoFileRepository,
    pending_repo: &dyn PendingValidationRepository,
    path: &Path,
    size_bytes: u64,
) -> Result<ItemOutcome<ImportDecision>> {
    let (decision, existing, content_hash) = decide(fs, video_repo, path).await?;

    match decision {
        ImportDecision::SkipKnown => Ok(ItemOutcome::Ok(ImportDecision::SkipKnown)),
        ImportDecision::UpdatePath => {
            if let Some(mut existing) = existing {
                existing.path = path.to_path_buf();
                video_repo.save(&existing).await?;
            }
            Ok(ItemOutcome::Ok(ImportDecision::UpdatePath))
        }
        ImportDecision::Reimport => {
            let mut existing = existing.expect("Reimport decision always carries the stale record");
            existing.content_hash = Some(content_hash);
            existing.size_bytes = size_bytes;
            existing.media_info = probe.probe(path).await.unwrap_or(None);
            video_repo.save(&existing).await?;
            save_pending_if_absent(pending_repo, existing).await?;
            Ok(ItemOutcome::Ok(ImportDecision::Reimport))
        }
        ImportDecision::Import => {
            let mut video_file = VideoFile::new(path.to_path_buf(), size_bytes);
            video_file.content_hash = Some(content_hash);
            video_file.media_info = probe.probe(path).await.unwrap_or(None);
            video_repo.save(&video_file).await?;
            pending_repo.save(&PendingValidation::new(video_file)).await?;
            Ok(ItemOutcome::Ok(ImportDecision::Import))
        }
    }
}

async fn process_symlink(
    fs: &dyn Filesystem,
    probe: &dyn MediaProbe,
    video_repo: &dyn VideoFileRepository,
    pending_repo: &dyn PendingValidationRepository,
    symlink_path: &Path,
) -> ItemOutcome<ImportDecision> {
    match process_symlink_inner(fs, probe, video_repo, pending_repo, symlink_path).await {
        Ok(outcome) => outcome,
        Err(e) => ItemOutcome::Failed { path: symlink_path.to_path_buf(), reason: e.to_string() },
    }
}

async fn process_symlink_inner(
    fs: &dyn Filesystem,
    probe: &dyn MediaProbe,
    video_repo: &dyn VideoFileRepository,
    pending_repo: &dyn PendingValidationRepository,
    symlink_path: &Path,
) -> Result<ItemOutcome<ImportDecision>> {
    let raw_target = fs.read_symlink(symlink_path).await?;
    let target = if raw_target.is_absolute() {
        raw_target
    } else {
        symlink_path.parent().unwrap_or(Path::new(".")).join(raw_target)
    };

    if !fs.exists(&target).await {
        return Ok(ItemOutcome::Failed {
            path: symlink_path.to_path_buf(),
            reason: format!("symlink target not found: {target:?}"),
        });
    }
    if fs.is_symlink(&target).await {
        return Ok(ItemOutcome::Failed {
            path: symlink_path.to_path_buf(),
            reason: "symlink target is itself a symlink".to_string(),
        });
    }

    let (decision, existing, content_hash) = decide(fs, video_repo, &target).await?;

    match decision {
        ImportDecision::SkipKnown => {
            if let Some(mut existing) = existing {
                if existing.symlink_path.is_none() {
                    existing.symlink_path = Some(symlink_path.to_path_buf());
                    video_repo.save(&existing).await?;
                    return Ok(ItemOutcome::Ok(ImportDecision::UpdatePath));
                }
            }
            Ok(ItemOutcome::Ok(ImportDecision::SkipKnown))
        }
        ImportDecision::UpdatePath => {
            if let Some(mut existing) = existing {
                existing.path = target.clone();
                existing.symlink_path = Some(symlink_path.to_path_buf());
                video_repo.save(&existing).await?;
            }
            Ok(ItemOutcome::Ok(ImportDecision::UpdatePath))
        }
        ImportDecision::Reimport => {
            let mut existing = existing.expect("Reimport decision always carries the stale record");
            existing.content_hash = Some(content_hash);
            existing.size_bytes = fs.size(&target).await?;
            existing.symlink_path = Some(symlink_path.to_path_buf());
            existing.media_info = probe.probe(&target).await.unwrap_or(None);
            video_repo.save(&existing).await?;
            save_pending_if_absent(pending_repo, existing).await?;
            Ok(ItemOutcome::Ok(ImportDecision::Reimport))
        }
        ImportDecision::Import => {
            let size_bytes = fs.size(&target).await?;
            let mut video_file = VideoFile::new(target.clone(), size_bytes);
            video_file.symlink_path = Some(symlink_path.to_path_buf());
            video_file.content_hash = Some(content_hash);
            video_file.media_info = probe.probe(&target).await.unwrap_or(None);
            video_repo.save(&video_file).await?;
            pending_repo.save(&PendingValidation::new(video_file)).await?;
            Ok(ItemOutcome::Ok(ImportDecision::Import))
        }
    }
}

/// A reimported file's content changed, so it needs fresh validation; only
/// create a new `PendingValidation` if one isn't already sitting there from
/// an earlier, still-unresolved import (avoids duplicate pending rows on
/// repeated `import` runs over the same stale file).
async fn save_pending_if_absent(pending_repo: &dyn PendingValidationRepository, video_file: VideoFile) -> Result<()> {
    if pending_repo.get_by_video_file_id(&video_file.id).await?.is_some() {
        return Ok(());
    }
    pending_repo.save(&PendingValidation::new(video_file)).await
}

/// Detects whether `path` lives under a `Films`/`Séries` subtree, by
/// walking its ancestors (spec §4.7's managed-scope folder names).
pub fn detect_import_type(path: &Path) -> Option<SourceSubtree> {
    for ancestor in path.ancestors() {
        match ancestor.file_name().and_then(|n| n.to_str()) {
            Some("Films") => return Some(SourceSubtree::Movies),
            Some("Séries") | Some("Series") => return Some(SourceSubtree::Series),
            _ => continue,
        }
    }
    None
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn has_video_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::db::{SqlitePendingValidationRepository, SqliteStore, SqliteVideoFileRepository};
    use crate::infra::fs::StdFilesystem;
    use crate::services::ffprobe::NullMediaProbe;

    #[test]
    fn detects_films_and_series_subtrees() {
        assert_eq!(detect_import_type(Path::new("/storage/Films/Drame/I/Movie.mkv")), Some(SourceSubtree::Movies));
        assert_eq!(
            detect_import_type(Path::new("/storage/Séries/G/Show (2011)/Saison 01/ep.mkv")),
            Some(SourceSubtree::Series)
        );
        assert_eq!(detect_import_type(Path::new("/storage/Unsorted/x.mkv")), None);
    }

    #[test]
    fn recognizes_video_extensions() {
        assert!(has_video_extension("Movie.mkv"));
        assert!(!has_video_extension("Movie.nfo"));
    }

    #[tokio::test]
    async fn import_creates_video_file_and_pending_validation() {
        let fs = StdFilesystem;
        let probe = NullMediaProbe;
        let store = SqliteStore::open_in_memory().unwrap();
        let video_repo = SqliteVideoFileRepository::new(store.clone());
        let pending_repo = SqlitePendingValidationRepository::new(store);

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Movie (2020).mkv");
        std::fs::write(&path, b"hello").unwrap();

        let outcomes = import_from_storage(&fs, &probe, &video_repo, &pending_repo, tmp.path()).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], ItemOutcome::Ok(ImportDecision::Import)));

        let saved = video_repo.get_by_path(&path).await.unwrap().expect("video file saved");
        let pending = pending_repo.get_by_video_file_id(&saved.id).await.unwrap();
        assert!(pending.is_some(), "import must create a PendingValidation alongside the VideoFile (spec §4.10)");
        assert!(pending.unwrap().candidates.is_empty());
    }

    #[tokio::test]
    async fn changed_content_at_a_known_path_reimports_in_place() {
        let fs = StdFilesystem;
        let probe = NullMediaProbe;
        let store = SqliteStore::open_in_memory().unwrap();
        let video_repo = SqliteVideoFileRepository::new(store.clone());
        let pending_repo = SqlitePendingValidationRepository::new(store);

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Movie (2020).mkv");
        std::fs::write(&path, b"original bytes").unwrap();
        import_from_storage(&fs, &probe, &video_repo, &pending_repo, tmp.path()).await.unwrap();
        let first = video_repo.get_by_path(&path).await.unwrap().unwrap();
        let first_id = first.id.clone();

        std::fs::write(&path, b"replaced bytes, different hash").unwrap();
        let outcomes = import_from_storage(&fs, &probe, &video_repo, &pending_repo, tmp.path()).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], ItemOutcome::Ok(ImportDecision::Reimport)));

        let all = video_repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1, "reimport updates the existing record instead of minting a new one");
        assert_eq!(all[0].id, first_id);
        assert!(pending_repo.get_by_video_file_id(&first_id).await.unwrap().is_some());
    }
}
