//! Workflow Orchestrator (spec §4.14): the single public entry point that
//! sequences the whole pipeline end to end. Ground-truthed on
//! `examples/original_source/src/services/workflow/workflow_service.py`
//! (`WorkflowService.execute`) and its `scan_step.py`/`matching_step.py`/
//! `transfer_step.py` mixins plus `pending_factory.py`'s shared
//! search-and-score helper. The mixin-per-concern shape of the original is
//! collapsed here into private methods on one [`Workflow`] struct, mirroring
//! `WorkflowService`'s own class (it is the one component in this crate that
//! genuinely plays the role of a stateful orchestrating service, unlike the
//! leaf pure-function modules such as `core::scanner` or `core::importer`).
//!
//! Manual validation and the two points where the original prompts a
//! terminal user (undersized-file groups, transfer confirmation) are
//! interactive; here they are small ports ([`ManualValidationPort`],
//! [`UndersizedFilesPort`], [`TransferConfirmPort`]) so `core` stays free of
//! any concrete terminal/UI dependency — the CLI layer supplies the
//! interactive implementation, the same split already drawn between
//! `core::fs_port::Filesystem` and its concrete adapter.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::batch::BatchSummary;
use crate::core::entities::{
    Episode, EpisodeId, Movie, MovieId, PendingValidation, PendingValidationId, Series, SeriesId, ValidationStatus,
    VideoFile, VideoFileId,
};
use crate::core::enricher;
use crate::core::fs_port::Filesystem;
use crate::core::organizer;
use crate::core::parser;
use crate::core::ratelimit::RateLimiter;
use crate::core::renamer;
use crate::core::repository::{
    EpisodeRepository, MovieRepository, PendingValidationRepository, SeriesRepository, VideoFileRepository,
};
use crate::core::scanner::{self, ScanRecord};
use crate::core::transferer;
use crate::core::validation;
use crate::core::value_objects::{MediaDetails, MediaKind};
use crate::error::Result;
use crate::services::catalog::CatalogClient;
use crate::services::ffprobe::MediaProbe;

/// Which subset of the downloads tree a `process` run should act on (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    All,
    Movies,
    Series,
}

impl FilterType {
    fn accepts(self, kind: MediaKind) -> bool {
        match self {
            FilterType::All => true,
            FilterType::Movies => kind == MediaKind::Movie,
            FilterType::Series => kind == MediaKind::Series,
        }
    }
}

pub struct WorkflowConfig {
    pub filter_type: FilterType,
    pub dry_run: bool,
    pub downloads_movies_dir: PathBuf,
    pub downloads_series_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub symlink_dir: PathBuf,
    pub min_file_size_bytes: u64,
}

/// Running totals surfaced at the end of a run (spec §4.14 step 7).
#[derive(Debug, Default)]
pub struct WorkflowState {
    pub orphan_count: usize,
    pub scan_count: usize,
    pub auto_validated_count: usize,
    pub manual_validated_count: usize,
    pub created_video_file_ids: Vec<VideoFileId>,
    pub transfer_summary: BatchSummary,
}

#[derive(Debug)]
pub struct WorkflowResult {
    pub success: bool,
    pub state: WorkflowState,
    pub errors: Vec<String>,
}

/// One validated file ready to move, with its computed destination (spec
/// §4.14 step 6). Mirrors `batch_builder.py`'s `TransferData`.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub pending_id: PendingValidationId,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub symlink_destination: PathBuf,
    pub is_series: bool,
    pub title: String,
    pub year: Option<u16>,
}

/// What the manual validation loop decided for one pending item (spec §4.6).
pub enum ManualDecision {
    /// Validate against one of the item's own existing candidates.
    Validate(String),
    /// Validate against an id typed in directly, resolved via the catalog
    /// (the manual loop's "external id" action).
    ExternalId { details: MediaDetails },
    Reject,
    /// Leave pending, move to the next item.
    Skip,
    /// Stop the manual validation loop entirely.
    Quit,
}

#[async_trait]
pub trait ManualValidationPort: Send + Sync {
    async fn resolve(&self, pending: &PendingValidation) -> ManualDecision;
}

#[async_trait]
pub trait UndersizedFilesPort: Send + Sync {
    /// Asked once per title/series group of sub-threshold files found
    /// during the scan (spec §4.14 step 2).
    async fn include_group(&self, title: &str, is_series: bool, file_count: usize, total_bytes: u64) -> bool;
}

/// Non-interactive default: excludes every sub-threshold group (spec §4.14
/// step 2: "non-interactive mode: exclude").
pub struct RejectAllUndersized;

#[async_trait]
impl UndersizedFilesPort for RejectAllUndersized {
    async fn include_group(&self, _title: &str, _is_series: bool, _file_count: usize, _total_bytes: u64) -> bool {
        false
    }
}

#[async_trait]
pub trait TransferConfirmPort: Send + Sync {
    async fn confirm(&self, plans: &[TransferPlan]) -> bool;
}

/// Always confirms — used by `--dry-run` callers that never reach this
/// port, and by non-interactive automation that has already decided to run.
pub struct AlwaysConfirm;

#[async_trait]
impl TransferConfirmPort for AlwaysConfirm {
    async fn confirm(&self, _plans: &[TransferPlan]) -> bool {
        true
    }
}

/// Reports live per-file transfer progress (spec §4.14 step 6: "execute
/// via Transferer with live per-file progress"). Synchronous since
/// rendering a progress bar never yields.
pub trait TransferProgressPort: Send + Sync {
    fn start(&self, total: usize);
    fn on_success(&self, plan: &TransferPlan);
    fn on_failure(&self, plan: &TransferPlan, error: &str);
    fn finish(&self);
}

/// No-op implementation for callers that don't render progress
/// themselves (e.g. dry-run previews, which never reach the transfer loop).
pub struct NoTransferProgress;

impl TransferProgressPort for NoTransferProgress {
    fn start(&self, _total: usize) {}
    fn on_success(&self, _plan: &TransferPlan) {}
    fn on_failure(&self, _plan: &TransferPlan, _error: &str) {}
    fn finish(&self) {}
}

/// Asked once a conflict is detected at a transfer's destination (spec
/// §4.9: "the caller decides (keep_old, keep_new, keep_both, skip)").
#[async_trait]
pub trait ConflictResolutionPort: Send + Sync {
    async fn resolve(&self, plan: &TransferPlan, conflict: &transferer::ConflictInfo) -> transferer::ConflictResolution;
}

/// Non-interactive default: always skips a conflicting transfer, leaving
/// its `PendingValidation` pending for a later manual decision.
pub struct SkipConflicts;

#[async_trait]
impl ConflictResolutionPort for SkipConflicts {
    async fn resolve(&self, _plan: &TransferPlan, _conflict: &transferer::ConflictInfo) -> transferer::ConflictResolution {
        transferer::ConflictResolution::Skip
    }
}

/// The orchestrating service itself. Holds nothing but borrowed references
/// to the ports it drives; owns no state across calls to [`Self::execute`].
pub struct Workflow<'a> {
    pub fs: &'a dyn Filesystem,
    pub probe: &'a dyn MediaProbe,
    pub movie_catalog: Option<&'a dyn CatalogClient>,
    pub series_catalog: Option<&'a dyn CatalogClient>,
    pub video_file_repo: &'a dyn VideoFileRepository,
    pub pending_repo: &'a dyn PendingValidationRepository,
    pub movie_repo: &'a dyn MovieRepository,
    pub series_repo: &'a dyn SeriesRepository,
    pub episode_repo: &'a dyn EpisodeRepository,
    pub limiter: &'a RateLimiter,
    pub retry_attempts: u32,
    pub match_threshold: f64,
    pub auto_validate_margin: f64,
    pub manual_validation: &'a dyn ManualValidationPort,
    pub undersized: &'a dyn UndersizedFilesPort,
    pub transfer_confirm: &'a dyn TransferConfirmPort,
    pub transfer_progress: &'a dyn TransferProgressPort,
    pub conflict_resolution: &'a dyn ConflictResolutionPort,
    /// Checked between steps only (spec §5: "cancellation between steps is
    /// clean"); the atomic-move-then-symlink window inside the Transferer
    /// is never interrupted by it.
    pub cancel: &'a CancellationToken,
}

impl<'a> Workflow<'a> {
    /// Runs the whole pipeline once (spec §4.14). Never returns an `Err` for
    /// a per-item failure — those are folded into `state.transfer_summary`
    /// and `result.errors` — only a setup-level failure (repository access,
    /// etc.) short-circuits the run early.
    pub async fn execute(&self, config: &WorkflowConfig) -> WorkflowResult {
        let mut state = WorkflowState::default();
        match self.run(config, &mut state).await {
            Ok(()) => WorkflowResult { success: true, state, errors: Vec::new() },
            Err(e) => WorkflowResult { success: false, state, errors: vec![e.to_string()] },
        }
    }

    async fn run(&self, config: &WorkflowConfig, state: &mut WorkflowState) -> Result<()> {
        self.purge_orphans(state).await?;
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        let scan_records = self.scan_downloads(config, state).await?;
        if scan_records.is_empty() || self.cancel.is_cancelled() {
            return Ok(());
        }

        let pending_ids = self.perform_matching(&scan_records, state).await?;
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        self.auto_validate(&pending_ids, state).await?;
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        if !config.dry_run {
            self.manual_validate(&pending_ids, state).await?;
            if self.cancel.is_cancelled() {
                return Ok(());
            }
        }

        self.batch_transfer(config, &pending_ids, state).await?;

        if config.dry_run {
            self.cleanup_dry_run(state).await?;
        }

        Ok(())
    }

    /// Step 1: delete any PendingValidation (and its VideoFile) left behind
    /// by a previous interrupted run — regardless of whether it reached
    /// `Validated`, since it never made it to transfer either way.
    async fn purge_orphans(&self, state: &mut WorkflowState) -> Result<()> {
        let orphans = self.pending_repo.list_all().await?;
        for orphan in &orphans {
            self.pending_repo.delete(&orphan.id).await?;
            self.video_file_repo.delete(&orphan.video_file.id).await?;
            state.orphan_count += 1;
        }
        Ok(())
    }

    /// Step 2: scan both managed download subtrees, apply the filter, and
    /// resolve any sub-threshold groups through [`UndersizedFilesPort`].
    async fn scan_downloads(&self, config: &WorkflowConfig, state: &mut WorkflowState) -> Result<Vec<ScanRecord>> {
        let scan = scanner::scan_downloads(
            self.fs,
            self.probe,
            &config.downloads_movies_dir,
            &config.downloads_series_dir,
            config.min_file_size_bytes,
        )
        .await?;

        let mut records: Vec<ScanRecord> = scan
            .accepted
            .into_iter()
            .filter(|r| config.filter_type.accepts(r.parsed.detected_type))
            .collect();

        if !scan.below_minimum.is_empty() {
            records.extend(self.resolve_undersized(&scan.below_minimum, config).await?);
        }

        state.scan_count = records.len();
        Ok(records)
    }

    /// Groups sub-threshold files by parsed title, asks once per group
    /// whether to include it, and builds full [`ScanRecord`]s for the
    /// accepted ones (spec §4.14 step 2).
    async fn resolve_undersized(&self, paths: &[PathBuf], config: &WorkflowConfig) -> Result<Vec<ScanRecord>> {
        let mut groups: HashMap<String, Vec<&PathBuf>> = HashMap::new();
        for path in paths {
            let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let guess = parser::parse_filename(filename, MediaKind::Unknown);
            groups.entry(guess.title).or_default().push(path);
        }

        let mut out = Vec::new();
        for (title, members) in groups {
            let mut total_bytes = 0u64;
            for path in &members {
                total_bytes += self.fs.size(path).await.unwrap_or(0);
            }
            let is_series = members
                .first()
                .and_then(|p| p.file_name().and_then(|n| n.to_str()))
                .map(|n| parser::natural_type(n) == MediaKind::Series)
                .unwrap_or(false);

            let include = self.undersized.include_group(&title, is_series, members.len(), total_bytes).await;
            if !include {
                continue;
            }

            for path in members {
                let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                let hint = if is_series { MediaKind::Series } else { MediaKind::Movie };
                if !config.filter_type.accepts(hint) {
                    continue;
                }
                let parsed = parser::parse_filename(filename, hint);
                let size_bytes = self.fs.size(path).await.unwrap_or(0);
                let media_info = self.probe.probe(path).await.ok().flatten();
                out.push(ScanRecord {
                    video_file: VideoFile::new(path.clone(), size_bytes),
                    parsed,
                    media_info,
                    source: if is_series { scanner::SourceSubtree::Series } else { scanner::SourceSubtree::Movies },
                    corrected_location: false,
                });
            }
        }
        Ok(out)
    }

    /// Step 3: search + score each record, persist `VideoFile` and
    /// `PendingValidation`, and return the ids created this run in scan
    /// order (spec §4.14 step 3). Precomputes, per (series title, season),
    /// the highest episode number present in this batch — the original's
    /// `max_ep_map` — and feeds it as a fallback episode number to the
    /// episode-count filter when a record's own parsed episode is absent.
    async fn perform_matching(
        &self,
        records: &[ScanRecord],
        state: &mut WorkflowState,
    ) -> Result<Vec<PendingValidationId>> {
        let mut max_ep_map: HashMap<(String, u32), u32> = HashMap::new();
        for record in records {
            if record.parsed.detected_type == MediaKind::Series {
                if let (Some(season), Some(episode)) = (record.parsed.season, record.parsed.episode) {
                    let key = (record.parsed.title.to_lowercase(), season);
                    let entry = max_ep_map.entry(key).or_insert(episode);
                    *entry = (*entry).max(episode);
                }
            }
        }

        let mut pending_ids = Vec::with_capacity(records.len());
        for record in records {
            let max_episode_in_batch = record.parsed.season.and_then(|season| {
                max_ep_map.get(&(record.parsed.title.to_lowercase(), season)).copied()
            });

            let (video_file, pending) = self.create_pending_validation(record, max_episode_in_batch).await?;

            self.video_file_repo.save(&video_file).await?;
            state.created_video_file_ids.push(video_file.id.clone());

            self.pending_repo.save(&pending).await?;
            pending_ids.push(pending.id.clone());
        }
        Ok(pending_ids)
    }

    /// Delegate of `pending_factory.create_pending_validation`: searches the
    /// relevant catalog, scores, and (for movies) re-scores the top
    /// candidates with their real runtime.
    async fn create_pending_validation(
        &self,
        record: &ScanRecord,
        max_episode_in_batch: Option<u32>,
    ) -> Result<(VideoFile, PendingValidation)> {
        let parsed = &record.parsed;
        let candidates = if parsed.detected_type == MediaKind::Movie {
            match self.movie_catalog {
                Some(catalog) => {
                    let duration = record.media_info.as_ref().and_then(|m| m.duration_seconds);
                    enricher::enrich_movie_candidates(
                        catalog,
                        self.limiter,
                        self.retry_attempts,
                        &parsed.title,
                        parsed.year,
                        duration,
                    )
                    .await
                    .unwrap_or_default()
                }
                None => Vec::new(),
            }
        } else {
            match self.series_catalog {
                Some(catalog) => {
                    let episode = parsed.episode.or(max_episode_in_batch);
                    enricher::enrich_series_candidates(
                        catalog,
                        self.limiter,
                        self.retry_attempts,
                        &parsed.title,
                        parsed.year,
                        parsed.season,
                        episode,
                    )
                    .await
                    .unwrap_or_default()
                }
                None => Vec::new(),
            }
        };

        let mut video_file = record.video_file.clone();
        video_file.media_info = record.media_info.clone();
        video_file.content_hash = self.fs.hash_prefix(&video_file.path).await.ok();

        let mut pending = PendingValidation::new(video_file.clone());
        pending.candidates = candidates;

        Ok((video_file, pending))
    }

    /// Step 4: auto-validate every freshly-created pending item whose
    /// candidates clear the auto-validation bar (spec §4.6). Exposed so the
    /// standalone `validate auto` CLI verb can drive the same rule over
    /// whatever is currently pending, not only a batch this run just scanned
    /// (spec §6, Open Question (iii): identical behavior either way).
    pub async fn auto_validate(&self, pending_ids: &[PendingValidationId], state: &mut WorkflowState) -> Result<()> {
        for id in pending_ids {
            let Some(mut pending) = self.pending_repo.get_by_id(id).await? else { continue };
            if pending.candidates.is_empty() {
                continue;
            }

            let is_series = pending.candidates.first().map(|c| c.source == "series").unwrap_or(false);
            let decision = if is_series {
                validation::decide_auto_validate_series(&pending.candidates, self.match_threshold, self.auto_validate_margin)
            } else {
                validation::decide_auto_validate(&pending.candidates, self.match_threshold, self.auto_validate_margin)
            };

            let Some(candidate_id) = decision.map(str::to_string) else { continue };
            pending.validate(&candidate_id, true)?;
            self.pending_repo.save(&pending).await?;
            state.auto_validated_count += 1;
        }
        Ok(())
    }

    /// Step 5: interactive manual validation with sibling cascade (spec
    /// §4.6, §4.14 step 5). Driven entirely by [`ManualValidationPort`] so
    /// this stays testable without a terminal. Exposed for the standalone
    /// `validate manual` CLI verb (spec §6).
    pub async fn manual_validate(&self, pending_ids: &[PendingValidationId], state: &mut WorkflowState) -> Result<()> {
        let mut remaining = Vec::new();
        for id in pending_ids {
            if let Some(pending) = self.pending_repo.get_by_id(id).await? {
                if matches!(pending.validation_status, ValidationStatus::Pending)
                    && !pending.auto_validated
                {
                    remaining.push(pending);
                }
            }
        }

        let mut processed: std::collections::HashSet<PendingValidationId> = std::collections::HashSet::new();

        let mut index = 0;
        while index < remaining.len() {
            let id = remaining[index].id.clone();
            if processed.contains(&id) {
                index += 1;
                continue;
            }

            let decision = self.manual_validation.resolve(&remaining[index]).await;
            match decision {
                ManualDecision::Quit => break,
                ManualDecision::Skip => {}
                ManualDecision::Reject => {
                    let mut pending = remaining[index].clone();
                    pending.validation_status = ValidationStatus::Rejected;
                    self.pending_repo.save(&pending).await?;
                }
                ManualDecision::Validate(candidate_id) => {
                    self.apply_manual_choice(&id, &candidate_id, &mut remaining, &mut processed, state).await?;
                }
                ManualDecision::ExternalId { details } => {
                    let source = if remaining[index]
                        .candidates
                        .first()
                        .map(|c| c.source == "series")
                        .unwrap_or(false)
                    {
                        "series"
                    } else {
                        "movies"
                    };
                    let synthesized = validation::candidate_from_external_id(&details, source);
                    let candidate_id = synthesized.id.clone();

                    let mut pending = remaining[index].clone();
                    pending.candidates.push(synthesized);
                    self.pending_repo.save(&pending).await?;
                    remaining[index] = pending;

                    self.apply_manual_choice(&id, &candidate_id, &mut remaining, &mut processed, state).await?;
                }
            }
            processed.insert(id);
            index += 1;
        }
        Ok(())
    }

    /// Validates `id` against `candidate_id` and cascades to siblings
    /// sharing that candidate (spec §4.6) — mirrors
    /// `_auto_validate_series_episodes`, generalized to run for any source,
    /// not only TVDB, since the cascade rule itself is source-agnostic.
    async fn apply_manual_choice(
        &self,
        id: &PendingValidationId,
        candidate_id: &str,
        remaining: &mut [PendingValidation],
        processed: &mut std::collections::HashSet<PendingValidationId>,
        state: &mut WorkflowState,
    ) -> Result<()> {
        let target_index = remaining.iter().position(|p| &p.id == id).expect("id came from remaining");

        let (head, tail) = remaining.split_at_mut(target_index);
        let (target_slice, tail) = tail.split_first_mut().expect("target_index is valid");
        let mut sibling_refs: Vec<&mut PendingValidation> =
            head.iter_mut().chain(tail.iter_mut()).collect();

        let cascaded = validation::validate_and_cascade(target_slice, candidate_id, &mut sibling_refs)?;

        self.pending_repo.save(target_slice).await?;
        state.manual_validated_count += 1;

        for sibling in sibling_refs.iter() {
            if cascaded.contains(&sibling.id) {
                self.pending_repo.save(sibling).await?;
                processed.insert(sibling.id.clone());
                state.manual_validated_count += 1;
            }
        }
        Ok(())
    }

    /// Step 6: build the transfer batch from every item validated this run
    /// (auto or manual), then execute it (or, in dry-run, merely report it
    /// — the CLI layer is responsible for rendering the tree).
    async fn batch_transfer(
        &self,
        config: &WorkflowConfig,
        pending_ids: &[PendingValidationId],
        state: &mut WorkflowState,
    ) -> Result<()> {
        let mut validated = Vec::new();
        for id in pending_ids {
            if let Some(pending) = self.pending_repo.get_by_id(id).await? {
                if matches!(pending.validation_status, ValidationStatus::Validated) {
                    validated.push(pending);
                }
            }
        }
        if validated.is_empty() {
            return Ok(());
        }

        let summary = self.transfer_validated(&validated, config).await?;
        state.transfer_summary.succeeded += summary.succeeded;
        state.transfer_summary.skipped += summary.skipped;
        state.transfer_summary.failed += summary.failed;
        Ok(())
    }

    /// Builds and executes the transfer batch for an arbitrary set of
    /// already-`Validated` pending items. Used internally by
    /// [`Self::batch_transfer`] and directly by the standalone `validate`
    /// CLI verbs, which validate outside of a full [`Self::execute`] run and
    /// so must also drive their own transfer (spec §6, Open Question (iii)).
    pub async fn transfer_validated(
        &self,
        validated: &[PendingValidation],
        config: &WorkflowConfig,
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        if validated.is_empty() {
            return Ok(summary);
        }

        let plans = self.build_transfers(validated, config).await?;

        if config.dry_run {
            return Ok(summary);
        }

        if !self.transfer_confirm.confirm(&plans).await {
            return Ok(summary);
        }

        self.transfer_progress.start(plans.len());
        for plan in &plans {
            let outcome = self.transfer_one(plan).await;

            match outcome {
                Ok(Some(result)) => {
                    if let Some(mut pending) = self.pending_repo.get_by_id(&plan.pending_id).await? {
                        pending.video_file.path = result.final_path;
                        pending.video_file.symlink_path = Some(result.symlink_path);
                        self.video_file_repo.save(&pending.video_file).await?;
                    }
                    summary.succeeded += 1;
                    self.transfer_progress.on_success(plan);
                }
                Ok(None) => {
                    // Conflict resolved as keep_old/skip/keep_both(and the
                    // alt destination itself collided): PendingValidation
                    // stays as-is for a later run to pick up.
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %plan.source.display(), error = %e, "transfer failed");
                    summary.failed += 1;
                    self.transfer_progress.on_failure(plan, &e.to_string());
                }
            }
        }
        self.transfer_progress.finish();
        Ok(summary)
    }

    /// Detects a conflict at `plan`'s destination first (spec §4.9 step 1);
    /// if none, transfers directly. If one exists, asks
    /// [`ConflictResolutionPort`] and applies its decision. `Ok(None)` means
    /// `keep_old`/`skip` (or a `keep_both` collision loop, vanishingly
    /// unlikely) — no filesystem mutation happened.
    async fn transfer_one(&self, plan: &TransferPlan) -> Result<Option<transferer::TransferOutcome>> {
        match transferer::detect_conflict(self.fs, &plan.source, &plan.destination).await? {
            None => transferer::transfer_file(self.fs, &plan.source, &plan.destination, &plan.symlink_destination)
                .await
                .map(Some),
            Some(conflict) => {
                let resolution = self.conflict_resolution.resolve(plan, &conflict).await;
                transferer::transfer_with_resolution(
                    self.fs,
                    &plan.source,
                    &plan.destination,
                    &plan.symlink_destination,
                    resolution,
                )
                .await
            }
        }
    }

    /// Builds one [`TransferPlan`] per validated item, creating and saving
    /// the `Movie`/`Series`+`Episode` entities along the way (spec §4.14
    /// step 6, grounded on `batch_builder.py`'s `build_transfers_batch`).
    async fn build_transfers(&self, validated: &[PendingValidation], config: &WorkflowConfig) -> Result<Vec<TransferPlan>> {
        let mut plans = Vec::with_capacity(validated.len());

        for pending in validated {
            let Some(candidate_id) = pending.selected_candidate_id.as_deref() else { continue };
            let Some(candidate) = pending.candidates.iter().find(|c| c.id == candidate_id) else { continue };
            let is_series = candidate.source == "series";

            let plan = if is_series {
                self.build_series_transfer(pending, candidate, config).await?
            } else {
                self.build_movie_transfer(pending, candidate, config).await?
            };
            if let Some(plan) = plan {
                plans.push(plan);
            }
        }
        Ok(plans)
    }

    async fn build_movie_transfer(
        &self,
        pending: &PendingValidation,
        candidate: &crate::core::value_objects::SearchHit,
        config: &WorkflowConfig,
    ) -> Result<Option<TransferPlan>> {
        let details = match self.movie_catalog {
            Some(catalog) => catalog.get_details(&candidate.id).await.ok(),
            None => None,
        };

        let title = details.as_ref().map(|d| d.title.clone()).unwrap_or_else(|| candidate.title.clone());
        let year = details.as_ref().and_then(|d| d.year).or(candidate.year);
        let genres = details.as_ref().map(|d| d.genres.clone()).unwrap_or_default();

        let media_info = pending.video_file.media_info.clone().unwrap_or_default();
        let ext = pending
            .video_file
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| ".mkv".to_string());

        let filename = renamer::generate_movie_filename(
            &title,
            year,
            &media_info.audio_languages,
            media_info.video_codec.as_deref(),
            media_info.resolution_label.as_deref(),
            &ext,
        );

        let destination = organizer::movie_destination_dir(&config.storage_dir, &genres, &title).join(&filename);
        let symlink_destination =
            organizer::movie_symlink_dir(&config.symlink_dir, &genres, &title).join(&filename);

        let movie = Movie {
            id: MovieId::new(),
            video_file_id: pending.video_file.id.clone(),
            title: title.clone(),
            original_title: details.as_ref().and_then(|d| d.original_title.clone()),
            year,
            genres,
            duration_seconds: details.as_ref().and_then(|d| d.duration_seconds),
            overview: details.as_ref().and_then(|d| d.overview.clone()),
            poster_ref: None,
            vote_average: details.as_ref().and_then(|d| d.vote_average),
            vote_count: details.as_ref().and_then(|d| d.vote_count),
            imdb_id: None,
            imdb_rating: None,
            imdb_vote_count: None,
            director: details.as_ref().and_then(|d| d.director.clone()),
            cast: details.as_ref().map(|d| d.cast.clone()).unwrap_or_default(),
            video_codec: media_info.video_codec.clone(),
            resolution_label: media_info.resolution_label.clone(),
            audio_languages: media_info.audio_languages.clone(),
            size_bytes: pending.video_file.size_bytes,
        };
        self.movie_repo.save(&movie).await?;

        Ok(Some(TransferPlan {
            pending_id: pending.id.clone(),
            source: pending.video_file.path.clone(),
            destination,
            symlink_destination,
            is_series: false,
            title,
            year,
        }))
    }

    async fn build_series_transfer(
        &self,
        pending: &PendingValidation,
        candidate: &crate::core::value_objects::SearchHit,
        config: &WorkflowConfig,
    ) -> Result<Option<TransferPlan>> {
        let parsed = parser::parse_filename(&pending.video_file.filename, MediaKind::Series);
        let (Some(season), Some(episode)) = (parsed.season, parsed.episode) else {
            return Ok(None);
        };

        let details = match self.series_catalog {
            Some(catalog) => catalog.get_details(&candidate.id).await.ok(),
            None => None,
        };
        let title = details.as_ref().map(|d| d.title.clone()).unwrap_or_else(|| candidate.title.clone());
        let year = details.as_ref().and_then(|d| d.year).or(candidate.year);
        let genres = details.as_ref().map(|d| d.genres.clone()).unwrap_or_default();

        let series = match self.series_repo.get_by_title_year(&title, year).await? {
            Some(existing) => existing,
            None => Series {
                id: SeriesId::new(),
                title: title.clone(),
                original_title: details.as_ref().and_then(|d| d.original_title.clone()),
                year,
                genres,
                overview: details.as_ref().and_then(|d| d.overview.clone()),
                poster_ref: None,
                vote_average: details.as_ref().and_then(|d| d.vote_average),
                vote_count: details.as_ref().and_then(|d| d.vote_count),
                imdb_id: None,
                imdb_rating: None,
                imdb_vote_count: None,
            },
        };
        self.series_repo.save(&series).await?;

        let media_info = pending.video_file.media_info.clone().unwrap_or_default();
        let ext = pending
            .video_file
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| ".mkv".to_string());

        let filename = renamer::generate_episode_filename(
            &title,
            year,
            season,
            episode,
            parsed.episode_title.as_deref(),
            &media_info.audio_languages,
            media_info.video_codec.as_deref(),
            media_info.resolution_label.as_deref(),
            &ext,
        );

        let destination =
            organizer::series_destination_dir(&config.storage_dir, &title, year, season).join(&filename);
        let symlink_destination =
            organizer::series_symlink_dir(&config.symlink_dir, &title, year, season).join(&filename);

        let episode_entity = match self.episode_repo.get_by_series_season_episode(&series.id, season, episode).await? {
            Some(existing) => existing,
            None => Episode {
                id: EpisodeId::new(),
                video_file_id: pending.video_file.id.clone(),
                series_id: series.id.clone(),
                season_number: season,
                episode_number: episode,
                title: parsed.episode_title.clone(),
                video_codec: media_info.video_codec.clone(),
                resolution_label: media_info.resolution_label.clone(),
                audio_languages: media_info.audio_languages.clone(),
                size_bytes: pending.video_file.size_bytes,
            },
        };
        self.episode_repo.save(&episode_entity).await?;

        Ok(Some(TransferPlan {
            pending_id: pending.id.clone(),
            source: pending.video_file.path.clone(),
            destination,
            symlink_destination,
            is_series: true,
            title,
            year,
        }))
    }

    /// Step 8: undo everything this run created, when it was a dry-run
    /// (spec §4.14 step 8: "a dry-run is a no-op").
    async fn cleanup_dry_run(&self, state: &mut WorkflowState) -> Result<()> {
        for video_file_id in &state.created_video_file_ids {
            if let Some(pending) = self.pending_repo.get_by_video_file_id(video_file_id).await? {
                self.pending_repo.delete(&pending.id).await?;
            }
            self.video_file_repo.delete(video_file_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_type_accepts_matching_kind_only() {
        assert!(FilterType::Movies.accepts(MediaKind::Movie));
        assert!(!FilterType::Movies.accepts(MediaKind::Series));
        assert!(FilterType::All.accepts(MediaKind::Series));
    }
}
