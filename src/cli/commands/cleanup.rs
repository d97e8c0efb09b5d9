//! `cineorg cleanup [--fix] [--max-per-dir N]` — runs (or previews) the
//! Cleanup Engine over the two managed subtrees (spec §4.11, §6).

use colored::Colorize;

use crate::cli::context::AppContext;
use crate::core::cleanup::{self, symlink_repair, CleanupReport, CleanupResult};
use crate::error::Result;

pub async fn run(ctx: &AppContext, fix: bool, max_per_dir: Option<usize>) -> Result<()> {
    let max_per_dir = max_per_dir.unwrap_or(ctx.config.max_items_per_dir);
    let video_dir = &ctx.config.symlink_dir;
    let storage_dir = &ctx.config.storage_dir;

    println!("{}", format!("Analyzing {}...", video_dir.display()).bold());

    let report = analyze(ctx, video_dir, max_per_dir).await?;
    print_report(&report);

    if !fix {
        if report.has_issues() {
            println!("{}", "\nRun with --fix to apply the above.".dimmed());
        }
        return Ok(());
    }

    println!("\n{}", "Applying fixes...".bold());
    let result = execute(ctx, &report, video_dir, storage_dir).await;
    print_result(&result);

    Ok(())
}

async fn analyze(ctx: &AppContext, video_dir: &std::path::Path, max_per_dir: usize) -> Result<CleanupReport> {
    let index = symlink_repair::FileIndex::build(&ctx.fs, &ctx.config.storage_dir).await?;
    let broken_symlinks =
        symlink_repair::scan_broken_symlinks(&ctx.fs, video_dir, &index, symlink_repair::CANDIDATE_MIN_SCORE).await?;

    let (misplaced_symlinks, not_in_db_count) = cleanup::scan_misplaced_symlinks(
        &ctx.fs,
        video_dir,
        &ctx.video_file_repo,
        &ctx.movie_repo,
        &ctx.series_repo,
        &ctx.episode_repo,
    )
    .await?;

    let duplicate_symlinks = cleanup::scan_duplicate_symlinks(&ctx.fs, video_dir).await?;
    let oversized_dirs = cleanup::scan_oversized_dirs(&ctx.fs, video_dir, max_per_dir).await?;
    let empty_dirs = cleanup::scan_empty_dirs(&ctx.fs, video_dir).await?;

    Ok(CleanupReport {
        broken_symlinks,
        misplaced_symlinks,
        duplicate_symlinks,
        oversized_dirs,
        empty_dirs,
        not_in_db_count,
    })
}

async fn execute(
    ctx: &AppContext,
    report: &CleanupReport,
    video_dir: &std::path::Path,
    storage_dir: &std::path::Path,
) -> CleanupResult {
    let _ = storage_dir;
    let mut total = CleanupResult::default();

    let repaired = cleanup::repair_broken_symlinks(&ctx.fs, &report.broken_symlinks, symlink_repair::AUTO_REPAIR_THRESHOLD).await;
    merge(&mut total, repaired);

    let still_broken: Vec<_> = report
        .broken_symlinks
        .iter()
        .filter(|b| !b.best_candidate().is_some_and(|c| c.score >= symlink_repair::AUTO_REPAIR_THRESHOLD))
        .cloned()
        .collect();
    let deleted = cleanup::delete_broken_symlinks(&ctx.fs, &still_broken, symlink_repair::AUTO_REPAIR_THRESHOLD).await;
    merge(&mut total, deleted);

    let moved = cleanup::fix_misplaced_symlinks(&ctx.fs, &report.misplaced_symlinks, &ctx.video_file_repo).await;
    merge(&mut total, moved);

    let deduped = cleanup::fix_duplicate_symlinks(&ctx.fs, &report.duplicate_symlinks).await;
    merge(&mut total, deduped);

    let subdivided = cleanup::subdivide_oversized_dirs(&ctx.fs, &report.oversized_dirs, &ctx.video_file_repo).await;
    merge(&mut total, subdivided);

    // Empty directories left by the moves above only show up after those
    // mutations land, so re-scan rather than reuse the stale analyze pass.
    let empty_dirs = cleanup::scan_empty_dirs(&ctx.fs, video_dir).await.unwrap_or_default();
    let pruned = cleanup::clean_empty_dirs(&ctx.fs, &empty_dirs).await;
    merge(&mut total, pruned);

    total
}

fn merge(total: &mut CleanupResult, part: CleanupResult) {
    total.repaired_symlinks += part.repaired_symlinks;
    total.failed_repairs += part.failed_repairs;
    total.broken_symlinks_deleted += part.broken_symlinks_deleted;
    total.moved_symlinks += part.moved_symlinks;
    total.duplicate_symlinks_removed += part.duplicate_symlinks_removed;
    total.subdivisions_created += part.subdivisions_created;
    total.symlinks_redistributed += part.symlinks_redistributed;
    total.empty_dirs_removed += part.empty_dirs_removed;
    total.errors.extend(part.errors);
}

fn print_report(report: &CleanupReport) {
    if !report.has_issues() {
        println!("{}", "No issues found.".green());
        return;
    }

    println!("broken symlinks:     {}", report.broken_symlinks.len());
    for broken in &report.broken_symlinks {
        let desc = match broken.best_candidate() {
            Some(c) if c.score >= symlink_repair::AUTO_REPAIR_THRESHOLD => {
                format!("auto-repairable -> {} ({:.1})", c.path.display(), c.score)
            }
            Some(c) => format!("candidate (manual review) -> {} ({:.1})", c.path.display(), c.score),
            None => "no candidate".to_string(),
        };
        println!("  {} {}", broken.symlink_path.display(), desc.dimmed());
    }

    println!("misplaced symlinks:  {}", report.misplaced_symlinks.len());
    for m in &report.misplaced_symlinks {
        println!("  {} -> {}", m.symlink_path.display(), m.expected_dir.display());
    }

    println!("duplicate symlinks:  {}", report.duplicate_symlinks.len());
    for d in &report.duplicate_symlinks {
        println!("  keep {} remove {}", d.keep.display(), d.remove.len());
    }

    println!("oversized dirs:      {}", report.oversized_dirs.len());
    for plan in &report.oversized_dirs {
        println!(
            "  {} ({} items, {} ranges)",
            plan.parent_dir.display(),
            plan.current_count,
            plan.ranges.len()
        );
    }

    println!("empty dirs:          {}", report.empty_dirs.len());
    if report.not_in_db_count > 0 {
        println!("{}", format!("({} valid symlinks not found in the catalog)", report.not_in_db_count).dimmed());
    }
}

fn print_result(result: &CleanupResult) {
    println!("  symlinks repaired:        {}", result.repaired_symlinks);
    println!("  broken symlinks deleted:  {}", result.broken_symlinks_deleted);
    println!("  symlinks relocated:       {}", result.moved_symlinks);
    println!("  duplicates removed:       {}", result.duplicate_symlinks_removed);
    println!("  subdivisions created:     {}", result.subdivisions_created);
    println!("  symlinks redistributed:   {}", result.symlinks_redistributed);
    println!("  empty dirs removed:       {}", result.empty_dirs_removed);
    if !result.errors.is_empty() {
        println!("{}", format!("  {} error(s):", result.errors.len()).red());
        for e in &result.errors {
            println!("    {} {e}", "[FAIL]".red());
        }
    }
}
