//! `cineorg import [<dir>] [--dry-run] [--from-symlinks]` — bootstraps
//! the catalog from an already-organized tree (spec §4.13).

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::context::AppContext;
use crate::core::batch::ItemOutcome;
use crate::core::importer::{self, ImportDecision};
use crate::error::Result;

fn tally(outcomes: &[ItemOutcome<ImportDecision>]) -> (usize, usize, usize, usize, usize) {
    let mut imported = 0;
    let mut skipped = 0;
    let mut updated = 0;
    let mut reimported = 0;
    let mut failed = 0;
    for outcome in outcomes {
        match outcome {
            ItemOutcome::Ok(ImportDecision::Import) => imported += 1,
            ItemOutcome::Ok(ImportDecision::SkipKnown) => skipped += 1,
            ItemOutcome::Ok(ImportDecision::UpdatePath) => updated += 1,
            ItemOutcome::Ok(ImportDecision::Reimport) => reimported += 1,
            ItemOutcome::Failed { .. } => failed += 1,
            ItemOutcome::Skipped { .. } => skipped += 1,
        }
    }
    (imported, skipped, updated, reimported, failed)
}

pub async fn run(ctx: &AppContext, dir: Option<PathBuf>, dry_run: bool, from_symlinks: bool) -> Result<()> {
    let default_dir = if from_symlinks { &ctx.config.symlink_dir } else { &ctx.config.storage_dir };
    let target = dir.unwrap_or_else(|| default_dir.clone());

    println!("{}", format!("Importing from {}...", target.display()).bold());
    if dry_run {
        println!("  {}", "(dry run — nothing will be written to the catalog)".yellow());
    }

    let outcomes = if dry_run {
        // The Importer has no read-only mode of its own; previewing means
        // walking the same tree and reporting what would happen without
        // touching the repository.
        preview(ctx, &target, from_symlinks).await?
    } else if from_symlinks {
        importer::import_from_symlinks(&ctx.fs, ctx.probe.as_ref(), &ctx.video_file_repo, &ctx.pending_repo, &target)
            .await?
    } else {
        importer::import_from_storage(&ctx.fs, ctx.probe.as_ref(), &ctx.video_file_repo, &ctx.pending_repo, &target)
            .await?
    };

    let (imported, skipped, updated, reimported, failed) = tally(&outcomes);
    println!(
        "  imported: {imported}, already known: {skipped}, path updated: {updated}, reimported: {reimported}, failed: {failed}"
    );
    for outcome in &outcomes {
        if let ItemOutcome::Failed { path, reason } = outcome {
            println!("  {} {}: {reason}", "[FAIL]".red(), path.display());
        }
    }
    Ok(())
}

async fn preview(ctx: &AppContext, target: &std::path::Path, from_symlinks: bool) -> Result<Vec<ItemOutcome<ImportDecision>>> {
    use crate::core::fs_port::Filesystem;
    use crate::core::scanner::VIDEO_EXTENSIONS;

    let mut outcomes = Vec::new();
    if from_symlinks {
        walk_symlink_preview(ctx, target, &mut outcomes).await;
    } else {
        for entry in ctx.fs.list_video_files(target, VIDEO_EXTENSIONS).await? {
            outcomes.push(preview_one(ctx, &entry.path).await);
        }
    }
    Ok(outcomes)
}

/// Mirrors [`importer::walk_symlinks`]'s traversal without ever saving,
/// so `--dry-run --from-symlinks` reports the same decisions the live
/// run would make.
fn walk_symlink_preview<'a>(
    ctx: &'a AppContext,
    dir: &'a std::path::Path,
    out: &'a mut Vec<ItemOutcome<ImportDecision>>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + 'a>> {
    use crate::core::fs_port::Filesystem;

    Box::pin(async move {
        for child in ctx.fs.list_children(dir).await.unwrap_or_default() {
            if ctx.fs.is_symlink(&child).await {
                let raw = ctx.fs.read_symlink(&child).await.unwrap_or_default();
                let target = if raw.is_absolute() { raw } else { child.parent().map(|p| p.join(&raw)).unwrap_or(raw) };
                if !ctx.fs.exists(&target).await {
                    continue;
                }
                out.push(preview_one(ctx, &target).await);
            } else {
                walk_symlink_preview(ctx, &child, out).await;
            }
        }
    })
}

async fn preview_one(ctx: &AppContext, path: &std::path::Path) -> ItemOutcome<ImportDecision> {
    use crate::core::fs_port::Filesystem;
    use crate::core::repository::VideoFileRepository;

    let hash = match ctx.fs.hash_prefix(path).await {
        Ok(h) => h,
        Err(e) => return ItemOutcome::Failed { path: path.to_path_buf(), reason: e.to_string() },
    };
    match ctx.video_file_repo.get_by_hash(&hash).await {
        Ok(Some(existing)) if existing.path == path => return ItemOutcome::Ok(ImportDecision::SkipKnown),
        Ok(Some(_)) => return ItemOutcome::Ok(ImportDecision::UpdatePath),
        Ok(None) => {}
        Err(e) => return ItemOutcome::Failed { path: path.to_path_buf(), reason: e.to_string() },
    }
    match ctx.video_file_repo.get_by_path(path).await {
        Ok(Some(_)) => ItemOutcome::Ok(ImportDecision::Reimport),
        Ok(None) => ItemOutcome::Ok(ImportDecision::Import),
        Err(e) => ItemOutcome::Failed { path: path.to_path_buf(), reason: e.to_string() },
    }
}
