//! Per-item batch outcomes (spec §7, §9: "no exception is allowed to escape
//! a batch"). Generalizes the teacher's `models::plan::PlanItemStatus` /
//! `UnknownItem` pattern into one outcome type shared by every
//! batch-producing component (Scanner, Importer, Transferer, Cleanup
//! executors) instead of a bespoke enum per module.

use std::path::PathBuf;

/// The result of processing one item within a batch. Failures never
/// propagate as exceptions inside a batch — they are captured here so the
/// batch always completes and always produces a summary.
#[derive(Debug, Clone)]
pub enum ItemOutcome<T> {
    Ok(T),
    /// Not an error: the item was intentionally passed over (e.g. a
    /// catalog returning no candidates, a file already known by hash).
    Skipped { path: PathBuf, reason: String },
    /// A per-item failure; debug context goes to structured logging, this
    /// carries only the stable identifier + short reason (spec §7).
    Failed { path: PathBuf, reason: String },
}

impl<T> ItemOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ItemOutcome::Ok(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ItemOutcome::Ok(v) => Some(v),
            _ => None,
        }
    }
}

/// Aggregate counters for a finished batch, printed by the CLI layer.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record<T>(&mut self, outcome: &ItemOutcome<T>) {
        match outcome {
            ItemOutcome::Ok(_) => self.succeeded += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}
