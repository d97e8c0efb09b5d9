//! `cineorg process` — the full workflow (spec §4.14, §6).

use colored::Colorize;

use crate::cli::args::FilterArg;
use crate::cli::context::AppContext;
use crate::cli::terminal::{
    TerminalConflictResolution, TerminalManualValidation, TerminalTransferConfirm, TerminalTransferProgress,
    TerminalUndersized,
};
use crate::core::workflow::{FilterType, Workflow, WorkflowConfig};
use crate::error::Result;

pub async fn run(ctx: &AppContext, filter: FilterArg, dry_run: bool) -> Result<()> {
    let filter_type = match filter {
        FilterArg::All => FilterType::All,
        FilterArg::Movies => FilterType::Movies,
        FilterArg::Series => FilterType::Series,
    };

    println!("{}", "Running cineorg workflow...".bold().cyan());
    if dry_run {
        println!("  {}", "(dry run — no files will be moved)".yellow());
    }

    let manual_validation = TerminalManualValidation {
        movie_catalog: ctx.movie_catalog(),
        series_catalog: ctx.series_catalog(),
    };
    let undersized = TerminalUndersized;
    let transfer_confirm = TerminalTransferConfirm;
    let transfer_progress = TerminalTransferProgress::default();
    let conflict_resolution = TerminalConflictResolution;

    // A Ctrl-C during `process` is honored between steps only (spec §5):
    // the current scan/match/validate/transfer step always finishes, so
    // the run never leaves partial state.
    let cancel = tokio_util::sync::CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    let workflow = Workflow {
        fs: &ctx.fs,
        probe: ctx.probe.as_ref(),
        movie_catalog: ctx.movie_catalog(),
        series_catalog: ctx.series_catalog(),
        video_file_repo: &ctx.video_file_repo,
        pending_repo: &ctx.pending_repo,
        movie_repo: &ctx.movie_repo,
        series_repo: &ctx.series_repo,
        episode_repo: &ctx.episode_repo,
        limiter: &ctx.limiter,
        retry_attempts: ctx.config.catalog_retry_attempts,
        match_threshold: ctx.config.match_score_threshold,
        auto_validate_margin: ctx.config.auto_validate_margin,
        manual_validation: &manual_validation,
        undersized: &undersized,
        transfer_confirm: &transfer_confirm,
        transfer_progress: &transfer_progress,
        conflict_resolution: &conflict_resolution,
        cancel: &cancel,
    };

    let config = WorkflowConfig {
        filter_type,
        dry_run,
        downloads_movies_dir: ctx.config.downloads_movies_dir.clone(),
        downloads_series_dir: ctx.config.downloads_series_dir.clone(),
        storage_dir: ctx.config.storage_dir.clone(),
        symlink_dir: ctx.config.symlink_dir.clone(),
        min_file_size_bytes: ctx.config.min_file_size_bytes,
    };

    let result = workflow.execute(&config).await;

    println!();
    println!("{}", "Summary".bold());
    println!("  orphans purged:      {}", result.state.orphan_count);
    println!("  files scanned:       {}", result.state.scan_count);
    println!("  auto-validated:      {}", result.state.auto_validated_count);
    println!("  manually validated:  {}", result.state.manual_validated_count);
    println!(
        "  transferred:         {} ({} failed)",
        result.state.transfer_summary.succeeded, result.state.transfer_summary.failed
    );

    if !result.success {
        for error in &result.errors {
            println!("{} {error}", "[ERROR]".red());
        }
        return Err(crate::error::Error::other(result.errors.join("; ")));
    }

    Ok(())
}
