//! Interactive terminal adapters for the Workflow's UI ports (spec §4.6,
//! §4.14 steps 2 and 6). Mirrors the split the teacher draws between
//! `cli::commands` (presentation) and `core` (logic): nothing here holds
//! business rules, it only renders state and turns a line of stdin into a
//! `core::workflow` decision type.

use std::io::{self, Write};

use async_trait::async_trait;
use colored::Colorize;

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::entities::PendingValidation;
use crate::core::matcher;
use crate::core::transferer::{ConflictInfo, ConflictResolution};
use crate::core::validation;
use crate::core::value_objects::SearchHit;
use crate::core::workflow::{
    ConflictResolutionPort, ManualDecision, ManualValidationPort, TransferConfirmPort, TransferPlan,
    TransferProgressPort, UndersizedFilesPort,
};
use crate::services::catalog::CatalogClient;

fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
    line.trim().to_string()
}

fn print_candidates(candidates: &[SearchHit]) {
    for (i, hit) in candidates.iter().enumerate() {
        let year = hit.year.map(|y| y.to_string()).unwrap_or_else(|| "????".to_string());
        println!(
            "  {} {} ({}) [{}]  score {:.1}",
            format!("{})", i + 1).cyan(),
            hit.title.bold(),
            year,
            hit.source,
            hit.score
        );
    }
}

fn pending_is_series(pending: &PendingValidation) -> bool {
    pending.candidates.first().map(|c| c.source == "series").unwrap_or_else(|| {
        crate::core::parser::natural_type(&pending.video_file.filename) == crate::core::value_objects::MediaKind::Series
    })
}

/// Reads one terminal command for the manual validation loop (spec §4.6's
/// "manual loop contract": rank, skip, trash, external-id, free-text
/// search, quit).
pub struct TerminalManualValidation<'a> {
    pub movie_catalog: Option<&'a dyn CatalogClient>,
    pub series_catalog: Option<&'a dyn CatalogClient>,
}

#[async_trait]
impl<'a> ManualValidationPort for TerminalManualValidation<'a> {
    async fn resolve(&self, pending: &PendingValidation) -> ManualDecision {
        let is_series = pending_is_series(pending);
        let catalog = if is_series { self.series_catalog } else { self.movie_catalog };
        let mut candidates = pending.candidates.clone();

        loop {
            println!();
            println!("{} {}", "Pending:".bold(), pending.video_file.filename);
            if candidates.is_empty() {
                println!("  {}", "(no candidates)".dimmed());
            } else {
                print_candidates(&candidates);
            }
            let input = read_line(
                "choose [1-N] | s)kip | t)rash | x <id> external-id | f <query> search | q)uit > ",
            );

            match input.as_str() {
                "q" | "Q" => return ManualDecision::Quit,
                "s" | "S" | "" => return ManualDecision::Skip,
                "t" | "T" => return ManualDecision::Reject,
                other if other.starts_with("x ") || other.starts_with("X ") => {
                    let id = other[2..].trim();
                    let Some(catalog) = catalog else {
                        println!("{}", "no catalog configured for this media type".red());
                        continue;
                    };
                    match catalog.get_details(id).await {
                        Ok(details) => return ManualDecision::ExternalId { details },
                        Err(e) => {
                            println!("{} {e}", "lookup failed:".red());
                        }
                    }
                }
                other if other.starts_with("f ") || other.starts_with("F ") => {
                    let query = other[2..].trim();
                    let Some(catalog) = catalog else {
                        println!("{}", "no catalog configured for this media type".red());
                        continue;
                    };
                    match catalog.search(query, None).await {
                        Ok(hits) => {
                            candidates = if is_series {
                                let mut scored = hits;
                                for hit in &mut scored {
                                    hit.score = matcher::calculate_series_score(query, &hit.title);
                                }
                                scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
                                scored
                            } else {
                                matcher::score_movie_results(hits, query, None, None)
                            };
                        }
                        Err(e) => println!("{} {e}", "search failed:".red()),
                    }
                }
                other => match other.parse::<usize>() {
                    Ok(rank) if rank >= 1 && rank <= candidates.len() => {
                        return ManualDecision::Validate(candidates[rank - 1].id.clone())
                    }
                    _ => println!("{}", "unrecognized choice".yellow()),
                },
            }
        }
    }
}

/// Synthesizes a candidate from a manually-entered external id the same
/// way the Workflow does internally (spec §4.6), for the standalone
/// `validate file` verb which resolves a single item outside a full run.
pub fn candidate_source(is_series: bool) -> &'static str {
    if is_series {
        "series"
    } else {
        "movies"
    }
}

pub fn synthesize_external(details: &crate::core::value_objects::MediaDetails, is_series: bool) -> SearchHit {
    validation::candidate_from_external_id(details, candidate_source(is_series))
}

/// Placeholder for [`ManualValidationPort`] slots that a given call path
/// never actually invokes (e.g. `Workflow::auto_validate`, which never
/// reaches out to this port) — a `Workflow` still needs one wired in since
/// the field is mandatory.
pub struct UnusedManualValidation;

#[async_trait]
impl ManualValidationPort for UnusedManualValidation {
    async fn resolve(&self, _pending: &PendingValidation) -> ManualDecision {
        ManualDecision::Quit
    }
}

/// Asks once per sub-threshold title/series group whether to include it
/// anyway (spec §4.14 step 2).
pub struct TerminalUndersized;

#[async_trait]
impl UndersizedFilesPort for TerminalUndersized {
    async fn include_group(&self, title: &str, is_series: bool, file_count: usize, total_bytes: u64) -> bool {
        let kind = if is_series { "series" } else { "movie" };
        let mb = total_bytes as f64 / (1024.0 * 1024.0);
        let answer = read_line(&format!(
            "{} '{}' ({kind}, {file_count} file(s), {mb:.0} MiB) is under the size threshold — include anyway? [y/N] > ",
            "Undersized:".yellow(),
            title
        ));
        matches!(answer.as_str(), "y" | "Y" | "yes")
    }
}

/// Shows the full transfer batch and asks for confirmation before moving
/// anything (spec §4.14 step 6).
pub struct TerminalTransferConfirm;

#[async_trait]
impl TransferConfirmPort for TerminalTransferConfirm {
    async fn confirm(&self, plans: &[TransferPlan]) -> bool {
        if plans.is_empty() {
            return true;
        }
        println!();
        println!("{}", format!("{} file(s) ready to transfer:", plans.len()).bold());
        for plan in plans {
            println!("  {} -> {}", plan.source.display(), plan.destination.display());
        }
        let answer = read_line("proceed with transfer? [y/N] > ");
        matches!(answer.as_str(), "y" | "Y" | "yes")
    }
}

/// Renders a live progress bar over the transfer batch (spec §4.14 step 6:
/// "execute via Transferer with live per-file progress").
pub struct TerminalTransferProgress {
    bar: std::sync::Mutex<Option<ProgressBar>>,
}

impl Default for TerminalTransferProgress {
    fn default() -> Self {
        Self { bar: std::sync::Mutex::new(None) }
    }
}

impl TransferProgressPort for TerminalTransferProgress {
    fn start(&self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
            pb.set_style(style);
        }
        *self.bar.lock().unwrap() = Some(pb);
    }

    fn on_success(&self, plan: &TransferPlan) {
        if let Some(pb) = self.bar.lock().unwrap().as_ref() {
            pb.set_message(plan.title.clone());
            pb.inc(1);
        }
    }

    fn on_failure(&self, plan: &TransferPlan, error: &str) {
        if let Some(pb) = self.bar.lock().unwrap().as_ref() {
            pb.println(format!("{} {}: {error}", "[FAILED]".red(), plan.source.display()));
            pb.inc(1);
        }
    }

    fn finish(&self) {
        if let Some(pb) = self.bar.lock().unwrap().take() {
            pb.finish_and_clear();
        }
    }
}

/// Asks what to do about a detected transfer conflict (spec §4.9: "the
/// caller decides (keep_old, keep_new, keep_both, skip)").
pub struct TerminalConflictResolution;

#[async_trait]
impl ConflictResolutionPort for TerminalConflictResolution {
    async fn resolve(&self, plan: &TransferPlan, conflict: &ConflictInfo) -> ConflictResolution {
        println!();
        println!(
            "{} {:?} at {}",
            "Conflict:".red().bold(),
            conflict.conflict_type,
            conflict.existing_path.display()
        );
        println!("  incoming: {}", plan.source.display());
        let answer = read_line("keep o)ld | keep n)ew | keep b)oth | s)kip > ");
        match answer.as_str() {
            "o" | "O" => ConflictResolution::KeepOld,
            "n" | "N" => ConflictResolution::KeepNew,
            "b" | "B" => ConflictResolution::KeepBoth,
            _ => ConflictResolution::Skip,
        }
    }
}
