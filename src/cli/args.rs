//! Command line argument definitions (spec §6).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cineorg - organize a local movie/TV media library.
#[derive(Parser, Debug)]
#[command(name = "cineorg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip preflight checks.
    #[arg(long, global = true)]
    pub skip_preflight: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    All,
    Movies,
    Series,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full workflow: purge orphans, scan, match, auto-validate,
    /// manual-validate, transfer.
    Process {
        #[arg(long, value_enum, default_value = "all")]
        filter: FilterArg,

        /// Preview the run without moving any files.
        #[arg(long)]
        dry_run: bool,
    },

    /// List pending (unvalidated) items.
    Pending {
        /// Include rejected and already-validated items too.
        #[arg(long)]
        all: bool,
    },

    /// Drive validation decisions without running the full workflow.
    Validate {
        #[command(subcommand)]
        mode: ValidateMode,
    },

    /// Bootstrap the catalog from an already-organized tree.
    Import {
        /// Directory to scan; defaults to the configured storage (or
        /// symlink, with `--from-symlinks`) root.
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,

        /// Scan the symlink tree and resolve targets, instead of the
        /// physical storage tree.
        #[arg(long)]
        from_symlinks: bool,
    },

    /// Refill empty candidate lists for pending items already on record.
    Enrich,

    /// Run (or preview) the Cleanup Engine.
    Cleanup {
        /// Apply fixes instead of only reporting them.
        #[arg(long)]
        fix: bool,

        #[arg(long, value_name = "N")]
        max_per_dir: Option<usize>,
    },

    /// Detect and merge recurring title prefixes in a directory.
    Regroup {
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        #[arg(long)]
        fix: bool,

        #[arg(long, value_name = "N")]
        min_count: Option<usize>,
    },

    /// Find and repair broken symlinks against the storage tree.
    RepairLinks {
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        #[arg(long)]
        fix: bool,

        #[arg(long, value_name = "SCORE")]
        min_score: Option<f64>,
    },

    /// Convert relative symlink targets to absolute (or vice versa) under
    /// the symlink tree.
    FixSymlinks,

    /// Resolve misrouted episodes and coalesce duplicate symlink targets.
    FixBadLinks,
}

#[derive(Subcommand, Debug)]
pub enum ValidateMode {
    /// Apply the auto-validation rule to every currently pending item.
    Auto,
    /// Drive the interactive manual validation loop over every pending
    /// item not already auto-validated.
    Manual,
    /// Run auto, then manual, then transfer everything validated along
    /// the way.
    Batch,
    /// Validate (or re-validate) a single pending item by id, prompting
    /// interactively for the candidate choice.
    File {
        #[arg(value_name = "ID")]
        id: String,
    },
}
