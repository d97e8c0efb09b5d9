//! `cineorg validate auto|manual|batch|file <id>` — granular validation
//! control outside a full `process` run (spec §6). Each mode validates
//! against the store directly and then transfers whatever it validated,
//! since a standalone validation left untransferred would otherwise be
//! deleted as an orphan by the next `process` run's purge step (spec
//! §4.14 step 1, Open Question (iii)).

use colored::Colorize;

use crate::cli::context::AppContext;
use crate::cli::terminal::{
    TerminalConflictResolution, TerminalManualValidation, TerminalTransferConfirm, TerminalTransferProgress,
    UnusedManualValidation,
};
use crate::core::batch::BatchSummary;
use crate::core::entities::{PendingValidation, PendingValidationId, ValidationStatus};
use crate::core::validation;
use crate::core::workflow::{
    AlwaysConfirm, FilterType, ManualValidationPort, RejectAllUndersized, Workflow, WorkflowConfig, WorkflowState,
};
use crate::error::{Error, Result};

fn workflow_config(ctx: &AppContext) -> WorkflowConfig {
    WorkflowConfig {
        filter_type: FilterType::All,
        dry_run: false,
        downloads_movies_dir: ctx.config.downloads_movies_dir.clone(),
        downloads_series_dir: ctx.config.downloads_series_dir.clone(),
        storage_dir: ctx.config.storage_dir.clone(),
        symlink_dir: ctx.config.symlink_dir.clone(),
        min_file_size_bytes: ctx.config.min_file_size_bytes,
    }
}

fn build_workflow<'a>(
    ctx: &'a AppContext,
    manual_validation: &'a dyn crate::core::workflow::ManualValidationPort,
    undersized: &'a dyn crate::core::workflow::UndersizedFilesPort,
    transfer_confirm: &'a dyn crate::core::workflow::TransferConfirmPort,
    transfer_progress: &'a dyn crate::core::workflow::TransferProgressPort,
    conflict_resolution: &'a dyn crate::core::workflow::ConflictResolutionPort,
    cancel: &'a tokio_util::sync::CancellationToken,
) -> Workflow<'a> {
    Workflow {
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
        manual_validation,
        undersized,
        transfer_confirm,
        transfer_progress,
        conflict_resolution,
        cancel,
    }
}

async fn fetch(ctx: &AppContext, ids: &[PendingValidationId]) -> Result<Vec<PendingValidation>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(p) = ctx.pending_repo.get_by_id(id).await? {
            out.push(p);
        }
    }
    Ok(out)
}

fn print_transfer_summary(summary: &BatchSummary) {
    println!(
        "  transferred: {} ({} failed, {} skipped)",
        summary.succeeded, summary.failed, summary.skipped
    );
}

pub async fn run_auto(ctx: &AppContext) -> Result<()> {
    let pending = ctx.pending_repo.list_pending().await?;
    let ids: Vec<_> = pending.iter().map(|p| p.id.clone()).collect();
    if ids.is_empty() {
        println!("{}", "Nothing pending.".dimmed());
        return Ok(());
    }

    let manual = UnusedManualValidation;
    let undersized = RejectAllUndersized;
    let confirm = TerminalTransferConfirm;
    let progress = TerminalTransferProgress::default();
    let conflict_resolution = TerminalConflictResolution;
    let cancel = tokio_util::sync::CancellationToken::new();
    let workflow = build_workflow(ctx, &manual, &undersized, &confirm, &progress, &conflict_resolution, &cancel);

    let mut state = WorkflowState::default();
    workflow.auto_validate(&ids, &mut state).await?;
    println!("auto-validated {} item(s)", state.auto_validated_count);

    let validated: Vec<_> = fetch(ctx, &ids)
        .await?
        .into_iter()
        .filter(|p| matches!(p.validation_status, ValidationStatus::Validated))
        .collect();
    let summary = workflow.transfer_validated(&validated, &workflow_config(ctx)).await?;
    print_transfer_summary(&summary);
    Ok(())
}

pub async fn run_manual(ctx: &AppContext) -> Result<()> {
    let pending = ctx.pending_repo.list_pending().await?;
    let ids: Vec<_> = pending.iter().map(|p| p.id.clone()).collect();
    if ids.is_empty() {
        println!("{}", "Nothing pending.".dimmed());
        return Ok(());
    }

    let manual = TerminalManualValidation { movie_catalog: ctx.movie_catalog(), series_catalog: ctx.series_catalog() };
    let undersized = RejectAllUndersized;
    let confirm = AlwaysConfirm;
    let progress = TerminalTransferProgress::default();
    let conflict_resolution = TerminalConflictResolution;
    let cancel = tokio_util::sync::CancellationToken::new();
    let workflow = build_workflow(ctx, &manual, &undersized, &confirm, &progress, &conflict_resolution, &cancel);

    let mut state = WorkflowState::default();
    workflow.manual_validate(&ids, &mut state).await?;
    println!("manually validated {} item(s)", state.manual_validated_count);

    let validated: Vec<_> = fetch(ctx, &ids)
        .await?
        .into_iter()
        .filter(|p| matches!(p.validation_status, ValidationStatus::Validated))
        .collect();

    let summary = workflow.transfer_validated(&validated, &workflow_config(ctx)).await?;
    print_transfer_summary(&summary);
    Ok(())
}

pub async fn run_batch(ctx: &AppContext) -> Result<()> {
    run_auto(ctx).await?;
    run_manual(ctx).await
}

pub async fn run_file(ctx: &AppContext, id: &str) -> Result<()> {
    let target_id = PendingValidationId(id.to_string());
    let Some(mut target) = ctx.pending_repo.get_by_id(&target_id).await? else {
        return Err(Error::PendingValidationNotFound(id.to_string()));
    };

    let manual = TerminalManualValidation { movie_catalog: ctx.movie_catalog(), series_catalog: ctx.series_catalog() };
    let decision = manual.resolve(&target).await;

    let mut siblings = ctx
        .pending_repo
        .list_pending()
        .await?
        .into_iter()
        .filter(|p| p.id != target.id)
        .collect::<Vec<_>>();

    let mut to_transfer = Vec::new();
    match decision {
        crate::core::workflow::ManualDecision::Quit | crate::core::workflow::ManualDecision::Skip => {
            println!("{}", "left pending.".dimmed());
            return Ok(());
        }
        crate::core::workflow::ManualDecision::Reject => {
            target.validation_status = ValidationStatus::Rejected;
            ctx.pending_repo.save(&target).await?;
            println!("{}", "rejected.".red());
            return Ok(());
        }
        crate::core::workflow::ManualDecision::Validate(candidate_id) => {
            let mut sibling_refs: Vec<&mut PendingValidation> = siblings.iter_mut().collect();
            let cascaded = validation::validate_and_cascade(&mut target, &candidate_id, &mut sibling_refs)?;
            ctx.pending_repo.save(&target).await?;
            to_transfer.push(target);
            for sibling in sibling_refs {
                if cascaded.contains(&sibling.id) {
                    ctx.pending_repo.save(sibling).await?;
                    to_transfer.push(sibling.clone());
                }
            }
        }
        crate::core::workflow::ManualDecision::ExternalId { details } => {
            let is_series = crate::core::parser::natural_type(&target.video_file.filename)
                == crate::core::value_objects::MediaKind::Series;
            let synthesized = crate::cli::terminal::synthesize_external(&details, is_series);
            let candidate_id = synthesized.id.clone();
            target.candidates.push(synthesized);

            let mut sibling_refs: Vec<&mut PendingValidation> = siblings.iter_mut().collect();
            let cascaded = validation::validate_and_cascade(&mut target, &candidate_id, &mut sibling_refs)?;
            ctx.pending_repo.save(&target).await?;
            to_transfer.push(target);
            for sibling in sibling_refs {
                if cascaded.contains(&sibling.id) {
                    ctx.pending_repo.save(sibling).await?;
                    to_transfer.push(sibling.clone());
                }
            }
        }
    }

    let undersized = RejectAllUndersized;
    let confirm = TerminalTransferConfirm;
    let progress = TerminalTransferProgress::default();
    let conflict_resolution = TerminalConflictResolution;
    let cancel = tokio_util::sync::CancellationToken::new();
    let workflow = build_workflow(ctx, &manual, &undersized, &confirm, &progress, &conflict_resolution, &cancel);
    let summary = workflow.transfer_validated(&to_transfer, &workflow_config(ctx)).await?;
    print_transfer_summary(&summary);
    Ok(())
}
