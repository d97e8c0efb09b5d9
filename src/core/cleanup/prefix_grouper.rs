//! Prefix Grouper (spec §4.12 supplement): detects video files sharing a
//! recurring title prefix inside one sort-letter directory and regroups
//! them under a dedicated subdirectory (e.g. four `American *` files in
//! `A-Ami/` move into `A-Ami/American/`). Ground-truthed on
//! `examples/original_source/src/services/prefix_grouper.py`
//! (`PrefixGrouperService.analyze`/`execute`, `_find_leaf_dirs`,
//! `_is_prefix_dir`, `_analyze_directory`, `_merge_groups`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::cleanup::subdivision::is_range_dir;
use crate::core::fs_port::Filesystem;
use crate::core::relpath;
use crate::core::scanner::VIDEO_EXTENSIONS;
use crate::core::text_normalize::strip_article;
use crate::error::Result;

lazy_static! {
    static ref YEAR_PAREN: Regex = Regex::new(r"\(\d{4}\)").unwrap();
}

/// A detected group of files sharing a prefix, not yet moved.
#[derive(Debug, Clone)]
pub struct PrefixGroup {
    pub parent_dir: PathBuf,
    pub prefix: String,
    pub files: Vec<PathBuf>,
}

/// Extracts a file's title: strip extension, then everything before the
/// first `(YYYY)` year marker.
pub fn extract_title_from_filename(filename: &str) -> String {
    let stem = Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    match YEAR_PAREN.find(stem) {
        Some(m) => stem[..m.start()].trim().to_string(),
        None => stem.to_string(),
    }
}

/// Extracts the first significant word of a title: article stripped,
/// first whitespace-separated token kept (hyphenated compounds like
/// `"Au-delà"` stay as one token).
pub fn extract_first_word(title: &str) -> String {
    let stripped = strip_article(title);
    stripped.trim().split_whitespace().next().unwrap_or("").to_string()
}

fn has_video_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Finds every leaf directory under `root` (a directory holding at least
/// one video file directly, not only subdirectories) and detects
/// recurring prefix groups within each (spec §4.12 supplement).
pub async fn analyze(fs: &dyn Filesystem, root: &Path, min_count: usize) -> Result<Vec<PrefixGroup>> {
    let mut groups = Vec::new();
    let leaf_dirs = find_leaf_dirs(fs, root).await?;
    for leaf_dir in leaf_dirs {
        groups.extend(analyze_directory(fs, &leaf_dir, min_count).await?);
    }
    Ok(groups)
}

async fn find_leaf_dirs(fs: &dyn Filesystem, root: &Path) -> Result<Vec<PathBuf>> {
    let mut leaf_dirs = Vec::new();
    if !fs.exists(root).await {
        return Ok(leaf_dirs);
    }
    collect_leaf_dirs(fs, root, &mut leaf_dirs).await?;
    leaf_dirs.sort();
    Ok(leaf_dirs)
}

fn collect_leaf_dirs<'a>(
    fs: &'a dyn Filesystem,
    dir: &'a Path,
    out: &'a mut Vec<PathBuf>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        let children = fs.list_children(dir).await.unwrap_or_default();
        let mut has_media = false;
        let mut subdirs = Vec::new();
        for child in &children {
            if fs.is_symlink(child).await || !child_is_dir(fs, child).await {
                if has_video_extension(&file_name(child)) {
                    has_media = true;
                }
            } else {
                subdirs.push(child.clone());
            }
        }
        if has_media {
            out.push(dir.to_path_buf());
        }
        for subdir in subdirs {
            collect_leaf_dirs(fs, &subdir, out).await?;
        }
        Ok(())
    })
}

async fn child_is_dir(fs: &dyn Filesystem, path: &Path) -> bool {
    !fs.list_children(path).await.map(|c| c.is_empty()).unwrap_or(true)
        || fs.size(path).await.is_err()
}

/// Whether `directory` is already a prefix-group subdirectory: not a
/// single letter or alphabetic range, and its media files' first words
/// start with the directory's own name.
async fn is_prefix_dir(fs: &dyn Filesystem, directory: &Path) -> Result<bool> {
    let name = file_name(directory);
    if name.chars().count() <= 1 || is_range_dir(&name) {
        return Ok(false);
    }
    let name_lower = name.to_lowercase();
    for child in fs.list_children(directory).await.unwrap_or_default() {
        let filename = file_name(&child);
        if has_video_extension(&filename) {
            let title = extract_title_from_filename(&filename);
            let first_word = extract_first_word(&title);
            if !first_word.is_empty() && first_word.to_lowercase().starts_with(&name_lower) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

async fn analyze_directory(fs: &dyn Filesystem, directory: &Path, min_count: usize) -> Result<Vec<PrefixGroup>> {
    if is_prefix_dir(fs, directory).await? {
        return Ok(Vec::new());
    }

    let mut word_to_files: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut children = fs.list_children(directory).await.unwrap_or_default();
    children.sort();
    for child in children {
        let filename = file_name(&child);
        if !has_video_extension(&filename) {
            continue;
        }
        let title = extract_title_from_filename(&filename);
        let first_word = extract_first_word(&title);
        if first_word.is_empty() {
            continue;
        }
        word_to_files.entry(first_word.to_lowercase()).or_default().push(child);
    }

    let merged = merge_groups(word_to_files);

    let mut ancestor_words = std::collections::HashSet::new();
    for ancestor in directory.ancestors() {
        let name = file_name(ancestor);
        if name.is_empty() {
            continue;
        }
        let stripped = strip_article(&name);
        let stripped = stripped.trim();
        if let Some(first) = stripped.split_whitespace().next() {
            ancestor_words.insert(first.to_lowercase());
        }
    }

    let mut groups = Vec::new();
    for (prefix, files) in merged {
        if files.len() < min_count {
            continue;
        }
        if ancestor_words.contains(&prefix.to_lowercase()) {
            continue;
        }
        groups.push(PrefixGroup { parent_dir: directory.to_path_buf(), prefix, files });
    }
    groups.sort_by(|a, b| a.prefix.cmp(&b.prefix));
    Ok(groups)
}

/// Merges keys that share a prefix of at least 4 characters (shortest
/// key first), e.g. `"amant"` + `"amants"` + `"amante"` → `"amant"`. The
/// resulting group name keeps the original case of the first file whose
/// key formed the group.
fn merge_groups(word_to_files: BTreeMap<String, Vec<PathBuf>>) -> BTreeMap<String, Vec<PathBuf>> {
    if word_to_files.is_empty() {
        return BTreeMap::new();
    }

    let mut sorted_keys: Vec<String> = word_to_files.keys().cloned().collect();
    sorted_keys.sort_by_key(|k| (k.len(), k.clone()));

    let mut merged: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for key in sorted_keys {
        let found_parent = merged
            .keys()
            .find(|merged_key| merged_key.len() >= 4 && key.starts_with(merged_key.to_lowercase().as_str()))
            .cloned();

        if let Some(parent) = found_parent {
            merged.get_mut(&parent).unwrap().extend(word_to_files[&key].clone());
        } else {
            let files = &word_to_files[&key];
            let original_word = extract_first_word(&extract_title_from_filename(&file_name(&files[0])));
            merged.entry(original_word).or_default().extend(files.clone());
        }
    }

    merged
}

/// Executes a set of detected prefix groups: creates the prefix
/// subdirectory under both `video_dir` (symlinks) and `storage_dir`
/// (real files), moves the real files and re-links the symlinks. Returns
/// the number of files moved.
pub async fn execute(
    fs: &dyn Filesystem,
    groups: &[PrefixGroup],
    video_dir: &Path,
    storage_dir: &Path,
) -> Result<usize> {
    let mut total_moved = 0;

    for group in groups {
        let Ok(rel_path) = group.parent_dir.strip_prefix(video_dir) else { continue };

        let video_prefix_dir = video_dir.join(rel_path).join(&group.prefix);
        let storage_prefix_dir = storage_dir.join(rel_path).join(&group.prefix);
        fs.create_dir_all(&video_prefix_dir).await?;
        fs.create_dir_all(&storage_prefix_dir).await?;

        for video_file in &group.files {
            let filename = file_name(video_file);

            let storage_file = storage_dir.join(rel_path).join(&filename);
            let storage_dest = storage_prefix_dir.join(&filename);
            if fs.exists(&storage_file).await {
                fs.move_file(&storage_file, &storage_dest).await?;
            }

            if fs.is_symlink(video_file).await {
                fs.remove_file(video_file).await?;
            } else if fs.exists(video_file).await {
                fs.move_file(video_file, &video_prefix_dir.join(&filename)).await?;
                total_moved += 1;
                continue;
            }

            let new_link = video_prefix_dir.join(&filename);
            let relative_target = relpath::relative_to(&storage_dest, &video_prefix_dir);
            fs.create_symlink(&relative_target, &new_link).await?;
            total_moved += 1;
        }
    }

    Ok(total_moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_before_year() {
        assert_eq!(extract_title_from_filename("American History X (1998).mkv"), "American History X");
        assert_eq!(extract_title_from_filename("NoYear.mkv"), "NoYear");
    }

    #[test]
    fn extracts_first_word_after_article() {
        assert_eq!(extract_first_word("The American Way"), "American");
        assert_eq!(extract_first_word("Au-delà des étoiles"), "Au-delà");
        assert_eq!(extract_first_word(""), "");
    }

    #[test]
    fn merges_keys_sharing_long_prefix() {
        let mut map = BTreeMap::new();
        map.insert("amant".to_string(), vec![PathBuf::from("Amant (2000).mkv")]);
        map.insert("amants".to_string(), vec![PathBuf::from("Amants (2001).mkv")]);
        map.insert("xy".to_string(), vec![PathBuf::from("Xy (2002).mkv")]);

        let merged = merge_groups(map);
        assert_eq!(merged.len(), 2);
        assert!(merged.contains_key("Amant"));
        assert_eq!(merged["Amant"].len(), 2);
    }
}
