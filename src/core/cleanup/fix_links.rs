//! Logic behind the `fix-symlinks` and `fix-bad-links` CLI verbs (spec §6).
//! Ground-truthed on `examples/original_source/src/adapters/cli/commands/
//! fix_symlinks_command.py` (`_find_misplaced_symlinks`) and
//! `fix_bad_links_command.py` (`_find_duplicate_targets`,
//! `_match_episode_id`, `_find_correct_target_in_storage`,
//! `_get_series_storage_dir`). Kept here as pure analysis/decision
//! functions; the CLI layer drives the filesystem mutation loop so the
//! dry-run/live split lives in one place (spec §5: "clean cancellation
//! between steps").

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::fs_port::Filesystem;
use crate::core::scanner::VIDEO_EXTENSIONS;
use crate::error::Result;

lazy_static! {
    static ref SXXEXX: Regex = Regex::new(r"(?i)S(\d+)E(\d+)").unwrap();
}

/// Converts every relative symlink under `root` into an absolute one,
/// reporting counts without touching anything when `dry_run`
/// (`fix_symlinks_command.py` phase 1). Broken links are reported but
/// left untouched — repair is [`crate::core::cleanup::symlink_repair`]'s job.
#[derive(Debug, Clone, Default)]
pub struct AbsoluteConversionReport {
    pub converted: Vec<PathBuf>,
    pub already_absolute: usize,
    pub broken: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, String)>,
}

pub async fn convert_relative_to_absolute(
    fs: &dyn Filesystem,
    root: &Path,
    dry_run: bool,
) -> Result<AbsoluteConversionReport> {
    let mut report = AbsoluteConversionReport::default();
    walk_convert(fs, root, dry_run, &mut report).await?;
    Ok(report)
}

fn walk_convert<'a>(
    fs: &'a dyn Filesystem,
    dir: &'a Path,
    dry_run: bool,
    report: &'a mut AbsoluteConversionReport,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        for child in fs.list_children(dir).await.unwrap_or_default() {
            if fs.is_symlink(&child).await {
                let raw_target = fs.read_symlink(&child).await.unwrap_or_default();
                if raw_target.is_absolute() {
                    report.already_absolute += 1;
                    continue;
                }
                let resolved = child.parent().map(|p| p.join(&raw_target)).unwrap_or(raw_target);
                if !fs.exists(&resolved).await {
                    report.broken.push(child);
                    continue;
                }
                if dry_run {
                    report.converted.push(child);
                } else {
                    match rewrite_target(fs, &child, &resolved).await {
                        Ok(()) => report.converted.push(child),
                        Err(e) => report.errors.push((child, e.to_string())),
                    }
                }
            } else {
                walk_convert(fs, &child, dry_run, report).await?;
            }
        }
        Ok(())
    })
}

async fn rewrite_target(fs: &dyn Filesystem, link: &Path, target: &Path) -> Result<()> {
    fs.remove_file(link).await?;
    fs.create_symlink(target, link).await
}

/// A video symlink found directly in a "mixed" directory — one that
/// holds both subdivision subdirectories and video files — which means
/// the file belongs one level deeper (`_find_misplaced_symlinks`).
#[derive(Debug, Clone)]
pub struct RelocationPlan {
    pub current: PathBuf,
    pub correct: PathBuf,
}

/// Finds symlinks sitting in a mixed directory (subdirectories +
/// video files side by side) that should be relocated into the matching
/// subdivision leaf, given a navigation function that already knows how
/// to walk `Xx-Yy` ranges (spec's `_navigate_to_leaf`, reused here as
/// [`crate::core::cleanup::subdivision::find_sibling_for_key`]-style
/// logic via the caller).
pub async fn find_mixed_directory_relocations(
    fs: &dyn Filesystem,
    scan_dir: &Path,
    navigate_to_leaf: impl Fn(&Path, &str) -> PathBuf,
) -> Result<Vec<RelocationPlan>> {
    let mut out = Vec::new();
    walk_mixed(fs, scan_dir, &navigate_to_leaf, &mut out).await?;
    Ok(out)
}

fn walk_mixed<'a>(
    fs: &'a dyn Filesystem,
    dir: &'a Path,
    navigate_to_leaf: &'a impl Fn(&Path, &str) -> PathBuf,
    out: &'a mut Vec<RelocationPlan>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        let children = fs.list_children(dir).await.unwrap_or_default();
        let mut subdirs = Vec::new();
        let mut video_links = Vec::new();
        for child in &children {
            let is_symlink = fs.is_symlink(child).await;
            let name = child.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if !is_symlink && is_probably_dir(fs, child).await {
                subdirs.push(child.clone());
            } else if is_symlink && has_video_extension(name) {
                video_links.push(child.clone());
            }
        }

        if !subdirs.is_empty() && !video_links.is_empty() {
            for link in &video_links {
                let name = link.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                let title = extract_title_from_filename(name);
                if title.is_empty() {
                    continue;
                }
                let correct_dir = navigate_to_leaf(dir, &title);
                if correct_dir != dir {
                    out.push(RelocationPlan { current: link.clone(), correct: correct_dir.join(name) });
                }
            }
        }

        for subdir in subdirs {
            walk_mixed(fs, &subdir, navigate_to_leaf, out).await?;
        }
        Ok(())
    })
}

async fn is_probably_dir(fs: &dyn Filesystem, path: &Path) -> bool {
    fs.list_children(path).await.is_ok()
}

fn has_video_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn extract_title_from_filename(filename: &str) -> String {
    let stem = Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    match stem.find('(') {
        Some(idx) => stem[..idx].trim().to_string(),
        None => stem.trim().to_string(),
    }
}

/// Whether `filename` contains an `SxxExx` token matching `season`/`episode`
/// exactly (avoids `S04E02` matching `S04E021`, per the source's comment).
pub fn matches_episode_id(filename: &str, season: u32, episode: u32) -> bool {
    let upper = filename.to_uppercase();
    SXXEXX.captures_iter(&upper).any(|cap| {
        let s: u32 = cap[1].parse().unwrap_or(0);
        let e: u32 = cap[2].parse().unwrap_or(0);
        s == season && e == episode
    })
}

fn extract_episode_id(filename: &str) -> Option<(u32, u32)> {
    let upper = filename.to_uppercase();
    let cap = SXXEXX.captures(&upper)?;
    Some((cap[1].parse().ok()?, cap[2].parse().ok()?))
}

/// Finds the storage directory for a series given one of its episode
/// files' storage path: walk up to the parent of the `Saison NN`
/// ancestor (`_get_series_storage_dir`).
pub fn series_storage_dir_from_target(target: &Path) -> Option<PathBuf> {
    let mut acc = PathBuf::new();
    for component in target.components() {
        let comp_str = component.as_os_str().to_string_lossy();
        if comp_str.starts_with("Saison") {
            return Some(acc);
        }
        acc.push(component);
    }
    target.parent().map(Path::to_path_buf)
}

/// Groups valid video symlinks under the managed roots by their resolved
/// target, keeping only groups with 2+ links — several episode symlinks
/// pointing at the same physical file, almost always a mis-link
/// (`_find_duplicate_targets`).
pub async fn find_duplicate_targets(fs: &dyn Filesystem, video_dir: &Path) -> Result<HashMap<PathBuf, Vec<PathBuf>>> {
    let mut by_target: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
    for managed in ["Films", "Séries"] {
        let subdir = video_dir.join(managed);
        if !fs.exists(&subdir).await {
            continue;
        }
        collect_duplicate_targets(fs, &subdir, &mut by_target).await?;
    }
    by_target.retain(|_, links| links.len() > 1);
    Ok(by_target)
}

fn collect_duplicate_targets<'a>(
    fs: &'a dyn Filesystem,
    dir: &'a Path,
    out: &'a mut HashMap<PathBuf, Vec<PathBuf>>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        for child in fs.list_children(dir).await.unwrap_or_default() {
            let name = child.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if fs.is_symlink(&child).await {
                if !has_video_extension(name) {
                    continue;
                }
                let raw = fs.read_symlink(&child).await.unwrap_or_default();
                let resolved = if raw.is_absolute() { raw } else { child.parent().map(|p| p.join(&raw)).unwrap_or(raw) };
                if fs.exists(&resolved).await {
                    out.entry(resolved).or_default().push(child);
                }
            } else {
                collect_duplicate_targets(fs, &child, out).await?;
            }
        }
        Ok(())
    })
}

/// One corrective action produced by the bad-links pass.
#[derive(Debug, Clone)]
pub enum BadLinkOutcome {
    AlreadyCorrect(PathBuf),
    Fix { link: PathBuf, correct_target: PathBuf },
    NotFound(PathBuf),
    SkippedNoEpisodeToken(PathBuf),
}

/// For every symlink sharing a target with at least one sibling, checks
/// whether its own `SxxExx` token matches the target and, if not, finds
/// the correct file in the series' storage directory
/// (`fix_bad_links_command.py`'s main loop).
pub async fn plan_bad_link_fixes(fs: &dyn Filesystem, duplicates: &HashMap<PathBuf, Vec<PathBuf>>) -> Result<Vec<BadLinkOutcome>> {
    let mut out = Vec::new();

    for (target, links) in duplicates {
        let Some(series_dir) = series_storage_dir_from_target(target) else {
            out.extend(links.iter().cloned().map(BadLinkOutcome::NotFound));
            continue;
        };

        for link in links {
            let name = link.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let Some((season, episode)) = extract_episode_id(name) else {
                out.push(BadLinkOutcome::SkippedNoEpisodeToken(link.clone()));
                continue;
            };

            let target_name = target.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if matches_episode_id(target_name, season, episode) {
                out.push(BadLinkOutcome::AlreadyCorrect(link.clone()));
                continue;
            }

            match find_episode_in_storage(fs, &series_dir, season, episode).await? {
                Some(correct_target) => out.push(BadLinkOutcome::Fix { link: link.clone(), correct_target }),
                None => out.push(BadLinkOutcome::NotFound(link.clone())),
            }
        }
    }

    Ok(out)
}

async fn find_episode_in_storage(fs: &dyn Filesystem, series_dir: &Path, season: u32, episode: u32) -> Result<Option<PathBuf>> {
    if !fs.exists(series_dir).await {
        return Ok(None);
    }
    for entry in fs.list_video_files(series_dir, VIDEO_EXTENSIONS).await? {
        if fs.is_symlink(&entry.path).await {
            continue;
        }
        let name = entry.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if matches_episode_id(name, season, episode) {
            return Ok(Some(entry.path));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_episode_not_prefix() {
        assert!(matches_episode_id("Show S04E02.mkv", 4, 2));
        assert!(!matches_episode_id("Show S04E021.mkv", 4, 2));
    }

    #[test]
    fn finds_series_storage_dir_above_season_folder() {
        let target = Path::new("/storage/Séries/M-O/Mr Selfridge (2013)/Saison 01/ep.mkv");
        let dir = series_storage_dir_from_target(target).unwrap();
        assert_eq!(dir, PathBuf::from("/storage/Séries/M-O/Mr Selfridge (2013)"));
    }

    #[test]
    fn extracts_title_before_parenthesis() {
        assert_eq!(extract_title_from_filename("Marty Supreme (2025) MULTi x265 1080p.mkv"), "Marty Supreme");
    }
}
