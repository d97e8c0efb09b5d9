//! The Cleanup Engine (spec §4.11): analyze/execute over the two managed
//! subtrees (`Films`, `Séries`). Ground-truthed on
//! `examples/original_source/src/services/cleanup/analyzers.py` (scan
//! phase) and `executors.py` (execute phase), tied together the way
//! `cleanup_service.py`'s `CleanupService.analyze`/`execute` do, with
//! per-section error counters instead of exceptions (spec §7, §9).

pub mod fix_links;
pub mod prefix_grouper;
pub mod subdivision;
pub mod symlink_repair;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::entities::SubdivisionPlan;
use crate::core::fs_port::Filesystem;
use crate::core::organizer;
use crate::core::repository::{EpisodeRepository, MovieRepository, SeriesRepository, VideoFileRepository};
use crate::error::Result;

/// The two managed top-level directories; the Cleanup Engine never
/// touches anything outside them (spec §4.11, GLOSSARY "Managed scope").
pub const MANAGED_SUBDIRS: &[&str] = &["Films", "Séries"];

/// Default oversized-directory threshold (spec §4.11).
pub const DEFAULT_MAX_PER_DIR: usize = 50;

/// Whether `path` lies under one of the two managed subdirectories of
/// `video_dir` (spec's `is_in_managed_scope`).
pub fn is_in_managed_scope(path: &Path, video_dir: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(video_dir) else { return false };
    relative.components().next().is_some_and(|c| MANAGED_SUBDIRS.contains(&c.as_os_str().to_string_lossy().as_ref()))
}

#[derive(Debug, Clone)]
pub struct MisplacedSymlink {
    pub symlink_path: PathBuf,
    pub target_path: PathBuf,
    pub current_dir: PathBuf,
    pub expected_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DuplicateSymlink {
    pub directory: PathBuf,
    pub target_path: PathBuf,
    pub keep: PathBuf,
    pub remove: Vec<PathBuf>,
}

/// Full result of the analyze phase (spec §4.11 `CleanupReport`).
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub broken_symlinks: Vec<symlink_repair::BrokenSymlink>,
    pub misplaced_symlinks: Vec<MisplacedSymlink>,
    pub duplicate_symlinks: Vec<DuplicateSymlink>,
    pub oversized_dirs: Vec<SubdivisionPlan>,
    pub empty_dirs: Vec<PathBuf>,
    pub not_in_db_count: usize,
}

impl CleanupReport {
    pub fn total_issues(&self) -> usize {
        self.broken_symlinks.len()
            + self.misplaced_symlinks.len()
            + self.duplicate_symlinks.len()
            + self.oversized_dirs.len()
            + self.empty_dirs.len()
    }

    pub fn has_issues(&self) -> bool {
        self.total_issues() > 0
    }
}

/// Counters from the execute phase, per category, with accumulated error
/// messages (spec §4.11, §7: "explicit error accounting, counters not
/// exceptions").
#[derive(Debug, Clone, Default)]
pub struct CleanupResult {
    pub repaired_symlinks: usize,
    pub failed_repairs: usize,
    pub broken_symlinks_deleted: usize,
    pub moved_symlinks: usize,
    pub duplicate_symlinks_removed: usize,
    pub subdivisions_created: usize,
    pub symlinks_redistributed: usize,
    pub empty_dirs_removed: usize,
    pub errors: Vec<String>,
}

/// Recursively lists every path (files and directories) under the
/// managed subtrees (spec's `iter_managed_paths`).
pub async fn iter_managed_paths(fs: &dyn Filesystem, video_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for subdir_name in MANAGED_SUBDIRS {
        let subdir = video_dir.join(subdir_name);
        if fs.exists(&subdir).await {
            walk_all(fs, &subdir, &mut out).await?;
        }
    }
    Ok(out)
}

fn walk_all<'a>(
    fs: &'a dyn Filesystem,
    dir: &'a Path,
    out: &'a mut Vec<PathBuf>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        for child in fs.list_children(dir).await.unwrap_or_default() {
            out.push(child.clone());
            if !fs.is_symlink(&child).await {
                walk_all(fs, &child, out).await?;
            }
        }
        Ok(())
    })
}

/// Detects valid symlinks whose current directory doesn't match where the
/// Organizer would place them today (spec §4.11 "Misplaced symlinks").
pub async fn scan_misplaced_symlinks(
    fs: &dyn Filesystem,
    video_dir: &Path,
    video_file_repo: &dyn VideoFileRepository,
    movie_repo: &dyn MovieRepository,
    series_repo: &dyn SeriesRepository,
    episode_repo: &dyn EpisodeRepository,
) -> Result<(Vec<MisplacedSymlink>, usize)> {
    let mut misplaced = Vec::new();
    let mut not_in_db = 0;

    for path in iter_managed_paths(fs, video_dir).await? {
        if !fs.is_symlink(&path).await {
            continue;
        }
        let raw = fs.read_symlink(&path).await.unwrap_or_default();
        let target = if raw.is_absolute() { raw } else { path.parent().map(|p| p.join(&raw)).unwrap_or(raw) };
        if !fs.exists(&target).await {
            continue;
        }

        let video_file = match video_file_repo.get_by_symlink_path(&path).await? {
            Some(vf) => Some(vf),
            None => video_file_repo.get_by_path(&target).await?,
        };
        let Some(video_file) = video_file else {
            not_in_db += 1;
            continue;
        };

        let Some(expected_dir) =
            find_expected_dir(video_dir, &video_file.id, movie_repo, series_repo, episode_repo).await?
        else {
            continue;
        };

        let current_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if current_dir != expected_dir {
            misplaced.push(MisplacedSymlink {
                symlink_path: path,
                target_path: target,
                current_dir,
                expected_dir,
            });
        }
    }

    Ok((misplaced, not_in_db))
}

async fn find_expected_dir(
    symlink_root: &Path,
    video_file_id: &crate::core::entities::VideoFileId,
    movie_repo: &dyn MovieRepository,
    series_repo: &dyn SeriesRepository,
    episode_repo: &dyn EpisodeRepository,
) -> Result<Option<PathBuf>> {
    if let Some(movie) = movie_repo.get_by_video_file_id(video_file_id).await? {
        return Ok(Some(organizer::movie_symlink_dir(symlink_root, &movie.genres, &movie.title)));
    }
    if let Some(episode) = episode_repo.get_by_video_file_id(video_file_id).await? {
        if let Some(series) = series_repo.get_by_id(&episode.series_id).await? {
            return Ok(Some(organizer::series_symlink_dir(
                symlink_root,
                &series.title,
                series.year,
                episode.season_number,
            )));
        }
    }
    Ok(None)
}

/// Groups valid symlinks by `(parent dir, resolved target)`; any group of
/// 2+ is a duplicate (spec §4.11 "Duplicate symlinks"). The longest
/// filename is kept — it carries the most technical metadata.
pub async fn scan_duplicate_symlinks(fs: &dyn Filesystem, video_dir: &Path) -> Result<Vec<DuplicateSymlink>> {
    let mut groups: HashMap<(PathBuf, PathBuf), Vec<PathBuf>> = HashMap::new();

    for path in iter_managed_paths(fs, video_dir).await? {
        if !fs.is_symlink(&path).await {
            continue;
        }
        let raw = fs.read_symlink(&path).await.unwrap_or_default();
        let target = if raw.is_absolute() { raw } else { path.parent().map(|p| p.join(&raw)).unwrap_or(raw) };
        if !fs.exists(&target).await {
            continue;
        }
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        groups.entry((parent, target)).or_default().push(path);
    }

    let mut out = Vec::new();
    for ((directory, target_path), mut symlinks) in groups {
        if symlinks.len() < 2 {
            continue;
        }
        symlinks.sort_by_key(|p| std::cmp::Reverse(p.file_name().map(|n| n.len()).unwrap_or(0)));
        let keep = symlinks.remove(0);
        out.push(DuplicateSymlink { directory, target_path, keep, remove: symlinks });
    }
    out.sort_by(|a, b| a.directory.cmp(&b.directory));
    Ok(out)
}

/// Detects managed directories whose direct-children count exceeds
/// `max_per_dir`, producing a [`SubdivisionPlan`] each — except season
/// folders under `Séries` made up entirely of symlinks (spec §4.11).
pub async fn scan_oversized_dirs(fs: &dyn Filesystem, video_dir: &Path, max_per_dir: usize) -> Result<Vec<SubdivisionPlan>> {
    let mut plans = Vec::new();

    for path in iter_managed_paths(fs, video_dir).await? {
        if fs.is_symlink(&path).await {
            continue;
        }
        let children = fs.list_children(&path).await.unwrap_or_default();
        let mut items = Vec::new();
        let mut all_symlinks = true;
        for child in &children {
            let is_symlink = fs.is_symlink(child).await;
            if is_symlink {
                items.push(child.clone());
            } else {
                let has_children = !fs.list_children(child).await.unwrap_or_default().is_empty();
                if has_children || looks_like_dir(fs, child).await {
                    items.push(child.clone());
                    all_symlinks = false;
                }
            }
        }
        if items.is_empty() {
            continue;
        }
        if all_symlinks && is_under_series(&path, video_dir) {
            continue;
        }
        if items.len() > max_per_dir {
            let siblings = path
                .parent()
                .map(|p| fs.list_children(p))
                .unwrap();
            let siblings: Vec<PathBuf> =
                siblings.await.unwrap_or_default().into_iter().filter(|s| s != &path).collect();
            plans.push(subdivision::calculate_subdivision_ranges(&path, &items, max_per_dir, &siblings));
        }
    }

    subdivision::refine_plans_destinations(&mut plans);
    Ok(plans)
}

async fn looks_like_dir(fs: &dyn Filesystem, path: &Path) -> bool {
    fs.list_children(path).await.is_ok()
}

fn is_under_series(path: &Path, video_dir: &Path) -> bool {
    path.strip_prefix(video_dir).ok().and_then(|r| r.components().next()).is_some_and(|c| c.as_os_str() == "Séries")
}

/// Bottom-up enumeration of empty managed directories, excluding the
/// `Films`/`Séries` roots themselves (spec §4.11 "Empty directories").
pub async fn scan_empty_dirs(fs: &dyn Filesystem, video_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for path in iter_managed_paths(fs, video_dir).await? {
        if !fs.is_symlink(&path).await && looks_like_dir(fs, &path).await {
            dirs.push(path);
        }
    }
    dirs.sort_by_key(|p| std::cmp::Reverse(p.components().count()));

    let mut empty = Vec::new();
    for dir in dirs {
        if MANAGED_SUBDIRS.iter().any(|m| dir == video_dir.join(m)) {
            continue;
        }
        if fs.list_children(&dir).await.unwrap_or_default().is_empty() {
            empty.push(dir);
        }
    }
    Ok(empty)
}

/// Applies the repairs for a set of broken symlinks whose best candidate
/// clears `min_score`; others are left untouched for manual review.
pub async fn repair_broken_symlinks(
    fs: &dyn Filesystem,
    broken: &[symlink_repair::BrokenSymlink],
    min_score: f64,
) -> CleanupResult {
    let mut result = CleanupResult::default();
    for info in broken {
        let Some(candidate) = info.best_candidate() else { continue };
        if candidate.score < min_score {
            continue;
        }
        match symlink_repair::repair_symlink(fs, &info.symlink_path, &candidate.path).await {
            Ok(()) => result.repaired_symlinks += 1,
            Err(e) => {
                result.failed_repairs += 1;
                result.errors.push(format!("repair failed {}: {e}", info.symlink_path.display()));
            }
        }
    }
    result
}

/// Deletes broken symlinks that have no acceptable repair candidate.
pub async fn delete_broken_symlinks(fs: &dyn Filesystem, broken: &[symlink_repair::BrokenSymlink], min_score: f64) -> CleanupResult {
    let mut result = CleanupResult::default();
    for info in broken {
        let has_candidate = info.best_candidate().is_some_and(|c| c.score >= min_score);
        if has_candidate {
            continue;
        }
        match fs.remove_file(&info.symlink_path).await {
            Ok(()) => result.broken_symlinks_deleted += 1,
            Err(e) => result.errors.push(format!("delete failed {}: {e}", info.symlink_path.display())),
        }
    }
    result
}

pub async fn fix_misplaced_symlinks(
    fs: &dyn Filesystem,
    misplaced: &[MisplacedSymlink],
    video_file_repo: &dyn VideoFileRepository,
) -> CleanupResult {
    let mut result = CleanupResult::default();
    for info in misplaced {
        let new_path = info.expected_dir.join(info.symlink_path.file_name().unwrap_or_default());
        let outcome: Result<()> = async {
            fs.create_dir_all(&info.expected_dir).await?;
            fs.move_file(&info.symlink_path, &new_path).await?;
            video_file_repo.update_symlink_path(&info.symlink_path, &new_path).await?;
            Ok(())
        }
        .await;
        match outcome {
            Ok(()) => result.moved_symlinks += 1,
            Err(e) => result.errors.push(format!("move failed {}: {e}", info.symlink_path.display())),
        }
    }
    result
}

pub async fn fix_duplicate_symlinks(fs: &dyn Filesystem, duplicates: &[DuplicateSymlink]) -> CleanupResult {
    let mut result = CleanupResult::default();
    for dup in duplicates {
        for link in &dup.remove {
            match fs.remove_file(link).await {
                Ok(()) => result.duplicate_symlinks_removed += 1,
                Err(e) => result.errors.push(format!("remove failed {}: {e}", link.display())),
            }
        }
    }
    result
}

/// Two-phase subdivision execute (spec §4.11, §4.12 step 6): create every
/// range subdirectory and move in-range items first, then redirect
/// out-of-range items — possibly into a sibling's own freshly-created
/// sub-range.
pub async fn subdivide_oversized_dirs(
    fs: &dyn Filesystem,
    plans: &[SubdivisionPlan],
    video_file_repo: &dyn VideoFileRepository,
) -> CleanupResult {
    let mut result = CleanupResult::default();
    let mut all_out_of_range: Vec<(PathBuf, PathBuf)> = Vec::new();

    for plan in plans {
        let mut ok = true;
        for (_, dest) in &plan.items_to_move {
            if let Some(parent) = dest.parent() {
                if fs.create_dir_all(parent).await.is_err() {
                    ok = false;
                }
            }
        }
        for (source, dest) in &plan.items_to_move {
            match fs.move_file(source, dest).await {
                Ok(()) => {
                    let _ = video_file_repo.update_symlink_path(source, dest).await;
                    result.symlinks_redistributed += 1;
                }
                Err(e) => result.errors.push(format!("move failed {}: {e}", source.display())),
            }
        }
        all_out_of_range.extend(plan.out_of_range_items.iter().cloned());
        if ok {
            result.subdivisions_created += 1;
        } else {
            result.errors.push(format!("subdivision failed {}", plan.parent_dir.display()));
        }
    }

    for (source, planned_dest) in all_out_of_range {
        let actual_dest = if let Some(parent) = planned_dest.parent() {
            let siblings: Vec<PathBuf> = fs.list_children(parent).await.unwrap_or_default();
            subdivision::refine_out_of_range_dest(&planned_dest, &siblings)
        } else {
            planned_dest.clone()
        };
        let outcome: Result<()> = async {
            if let Some(parent) = actual_dest.parent() {
                fs.create_dir_all(parent).await?;
            }
            fs.move_file(&source, &actual_dest).await?;
            video_file_repo.update_symlink_path(&source, &actual_dest).await?;
            Ok(())
        }
        .await;
        match outcome {
            Ok(()) => result.symlinks_redistributed += 1,
            Err(e) => result.errors.push(format!("out-of-range move failed {}: {e}", source.display())),
        }
    }

    result
}

/// Removes empty directories deepest-first.
pub async fn clean_empty_dirs(fs: &dyn Filesystem, empty_dirs: &[PathBuf]) -> CleanupResult {
    let mut result = CleanupResult::default();
    let mut sorted = empty_dirs.to_vec();
    sorted.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
    for dir in sorted {
        match fs.remove_dir(&dir).await {
            Ok(()) => result.empty_dirs_removed += 1,
            Err(e) => result.errors.push(format!("rmdir failed {}: {e}", dir.display())),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_scope_accepts_films_and_series() {
        let root = Path::new("/video");
        assert!(is_in_managed_scope(&root.join("Films/Action/M/movie.mkv"), root));
        assert!(is_in_managed_scope(&root.join("Séries/G/Show (2011)"), root));
        assert!(!is_in_managed_scope(&root.join("Other/x.mkv"), root));
    }
}
