//! `cineorg fix-symlinks` and `cineorg fix-bad-links` — convert
//! relative↔absolute symlinks and unkink misrouted episode links (spec
//! §4.11, §6).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::cli::context::AppContext;
use crate::core::cleanup::fix_links::{self, BadLinkOutcome};
use crate::core::cleanup::subdivision;
use crate::core::fs_port::Filesystem;
use crate::core::text_normalize::sort_key;
use crate::error::Result;

pub async fn run_fix_symlinks(ctx: &AppContext) -> Result<()> {
    let video_dir = &ctx.config.symlink_dir;
    println!("{}", format!("Converting relative symlinks under {} to absolute...", video_dir.display()).bold());

    let report = fix_links::convert_relative_to_absolute(&ctx.fs, video_dir, false).await?;

    println!("  converted:        {}", report.converted.len());
    println!("  already absolute: {}", report.already_absolute);
    println!("  broken (skipped): {}", report.broken.len());
    for link in &report.broken {
        println!("    {} {}", "[BROKEN]".yellow(), link.display());
    }
    for (link, reason) in &report.errors {
        println!("    {} {}: {reason}", "[FAIL]".red(), link.display());
    }

    println!();
    println!("{}", "Checking for misplaced symlinks in mixed directories...".bold());
    let index = build_range_index(&ctx.fs, video_dir).await;
    let relocations = fix_links::find_mixed_directory_relocations(&ctx.fs, video_dir, |dir, title| {
        navigate_to_leaf(&index, dir, title)
    })
    .await?;

    if relocations.is_empty() {
        println!("{}", "  none found.".green());
        return Ok(());
    }

    for plan in &relocations {
        match relocate(&ctx.fs, &plan.current, &plan.correct).await {
            Ok(()) => println!("  {} {} -> {}", "[MOVED]".green(), plan.current.display(), plan.correct.display()),
            Err(e) => println!("  {} {}: {e}", "[FAIL]".red(), plan.current.display()),
        }
    }
    Ok(())
}

async fn relocate(fs: &dyn Filesystem, current: &Path, correct: &Path) -> Result<()> {
    let raw = fs.read_symlink(current).await?;
    let target = if raw.is_absolute() { raw } else { current.parent().map(|p| p.join(&raw)).unwrap_or(raw) };
    if let Some(parent) = correct.parent() {
        fs.create_dir_all(parent).await?;
    }
    fs.remove_file(current).await?;
    let relative = crate::core::relpath::relative_to(&target, correct.parent().unwrap_or(correct));
    fs.create_symlink(&relative, correct).await
}

/// Pre-scans `root` for every directory's immediate `Xx-Yy`/single-letter
/// range subdirectories, so [`navigate_to_leaf`] can walk them
/// synchronously (the Filesystem port is async-only).
async fn build_range_index(fs: &dyn Filesystem, root: &Path) -> HashMap<PathBuf, Vec<PathBuf>> {
    let mut index = HashMap::new();
    collect_range_index(fs, root, &mut index).await;
    index
}

fn collect_range_index<'a>(
    fs: &'a dyn Filesystem,
    dir: &'a Path,
    out: &'a mut HashMap<PathBuf, Vec<PathBuf>>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + 'a>> {
    Box::pin(async move {
        let children = fs.list_children(dir).await.unwrap_or_default();
        let mut range_children = Vec::new();
        for child in &children {
            if fs.is_symlink(child).await {
                continue;
            }
            let name = child.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if subdivision::is_range_dir(name) {
                range_children.push(child.clone());
            }
            collect_range_index(fs, child, out).await;
        }
        if !range_children.is_empty() {
            out.insert(dir.to_path_buf(), range_children);
        }
    })
}

/// Walks down from `dir` through nested `Xx-Yy` ranges toward the leaf
/// that should hold `title`, using a pre-built range index (spec's
/// `_navigate_to_leaf`).
fn navigate_to_leaf(index: &HashMap<PathBuf, Vec<PathBuf>>, dir: &Path, title: &str) -> PathBuf {
    let key = sort_key(title);
    let mut current = dir.to_path_buf();

    loop {
        let Some(ranges) = index.get(&current) else { return current };
        let next = ranges.iter().find(|r| {
            let name = r.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let (start, end) = subdivision::parse_parent_range(name);
            start.as_str() <= key.as_str() && key.as_str() <= end.as_str()
        });
        match next {
            Some(dir_match) if dir_match != &current => current = dir_match.clone(),
            _ => return current,
        }
    }
}

pub async fn run_fix_bad_links(ctx: &AppContext) -> Result<()> {
    let video_dir = &ctx.config.symlink_dir;
    println!("{}", format!("Scanning {} for duplicate episode targets...", video_dir.display()).bold());

    let duplicates = fix_links::find_duplicate_targets(&ctx.fs, video_dir).await?;
    if duplicates.is_empty() {
        println!("{}", "No duplicate target found.".green());
        return Ok(());
    }

    let outcomes = fix_links::plan_bad_link_fixes(&ctx.fs, &duplicates).await?;

    let mut fixed = 0;
    let mut already_correct = 0;
    let mut not_found = 0;
    let mut skipped = 0;

    for outcome in outcomes {
        match outcome {
            BadLinkOutcome::AlreadyCorrect(_) => already_correct += 1,
            BadLinkOutcome::SkippedNoEpisodeToken(link) => {
                skipped += 1;
                println!("  {} {}", "[SKIP]".dimmed(), link.display());
            }
            BadLinkOutcome::NotFound(link) => {
                not_found += 1;
                println!("  {} {}: no matching episode found in storage", "[MISS]".yellow(), link.display());
            }
            BadLinkOutcome::Fix { link, correct_target } => match relink(&ctx.fs, &link, &correct_target).await {
                Ok(()) => {
                    fixed += 1;
                    println!("  {} {} -> {}", "[FIXED]".green(), link.display(), correct_target.display());
                }
                Err(e) => println!("  {} {}: {e}", "[FAIL]".red(), link.display()),
            },
        }
    }

    println!("\nfixed: {fixed}, already correct: {already_correct}, not found: {not_found}, skipped: {skipped}");
    Ok(())
}

async fn relink(fs: &dyn Filesystem, link: &Path, correct_target: &Path) -> Result<()> {
    fs.remove_file(link).await?;
    let relative = crate::core::relpath::relative_to(correct_target, link.parent().unwrap_or(link));
    fs.create_symlink(&relative, link).await
}
