//! `cineorg regroup [<dir>] [--fix] [--min-count N]` — detects recurring
//! title prefixes inside leaf directories and regroups them (spec §4.12
//! supplement, §6).

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::context::AppContext;
use crate::core::cleanup::prefix_grouper;
use crate::error::Result;

pub async fn run(ctx: &AppContext, dir: Option<PathBuf>, fix: bool, min_count: Option<usize>) -> Result<()> {
    let root = dir.unwrap_or_else(|| ctx.config.symlink_dir.clone());
    let min_count = min_count.unwrap_or(ctx.config.prefix_group_min_count);

    println!("{}", format!("Scanning {} for recurring prefixes...", root.display()).bold());

    let groups = prefix_grouper::analyze(&ctx.fs, &root, min_count).await?;

    if groups.is_empty() {
        println!("{}", "No recurring prefix found.".green());
        return Ok(());
    }

    for group in &groups {
        println!(
            "  {} -> {}/{} ({} files)",
            group.parent_dir.display(),
            group.parent_dir.display(),
            group.prefix,
            group.files.len()
        );
        for file in &group.files {
            println!("    {}", file.display());
        }
    }

    if !fix {
        println!("{}", "\nRun with --fix to apply the above.".dimmed());
        return Ok(());
    }

    let moved = prefix_grouper::execute(&ctx.fs, &groups, &ctx.config.symlink_dir, &ctx.config.storage_dir).await?;
    println!("\n{} file(s) regrouped.", moved);
    Ok(())
}
