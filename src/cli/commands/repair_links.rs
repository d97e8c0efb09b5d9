//! `cineorg repair-links [<dir>] [--fix] [--min-score N]` — finds broken
//! symlinks under the symlink tree and repairs them against storage
//! (spec §4.11, §4.15, §6).

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::context::AppContext;
use crate::core::cleanup::symlink_repair;
use crate::error::Result;

pub async fn run(ctx: &AppContext, dir: Option<PathBuf>, fix: bool, min_score: Option<f64>) -> Result<()> {
    let root = dir.unwrap_or_else(|| ctx.config.symlink_dir.clone());
    let min_score = min_score.unwrap_or(ctx.config.repair_min_score);

    println!("{}", format!("Scanning {} for broken symlinks...", root.display()).bold());

    let index = symlink_repair::FileIndex::build(&ctx.fs, &ctx.config.storage_dir).await?;
    let broken = symlink_repair::scan_broken_symlinks(&ctx.fs, &root, &index, symlink_repair::CANDIDATE_MIN_SCORE).await?;

    if broken.is_empty() {
        println!("{}", "No broken symlink found.".green());
        return Ok(());
    }

    println!("{} broken symlink(s):", broken.len());
    for info in &broken {
        match info.best_candidate() {
            Some(c) if c.score >= min_score => {
                println!("  {} -> {} ({:.1}) {}", info.symlink_path.display(), c.path.display(), c.score, "[repairable]".green());
            }
            Some(c) => {
                println!(
                    "  {} -> {} ({:.1}) {}",
                    info.symlink_path.display(),
                    c.path.display(),
                    c.score,
                    "[below threshold, manual review]".yellow()
                );
            }
            None => println!("  {} {}", info.symlink_path.display(), "[no candidate]".red()),
        }
    }

    if !fix {
        println!("{}", "\nRun with --fix to apply repairs at or above the score threshold.".dimmed());
        return Ok(());
    }

    let mut repaired = 0;
    let mut failed = 0;
    for info in &broken {
        let Some(candidate) = info.best_candidate() else { continue };
        if candidate.score < min_score {
            continue;
        }
        match symlink_repair::repair_symlink(&ctx.fs, &info.symlink_path, &candidate.path).await {
            Ok(()) => repaired += 1,
            Err(e) => {
                failed += 1;
                println!("  {} {}: {e}", "[FAIL]".red(), info.symlink_path.display());
            }
        }
    }
    println!("\nrepaired: {repaired}, failed: {failed}");
    Ok(())
}
