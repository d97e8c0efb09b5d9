//! cineorg CLI entry point (spec §6).

use clap::Parser;
use colored::Colorize;

use cineorg::cli::args::{Cli, Commands, ValidateMode};
use cineorg::cli::commands;
use cineorg::cli::context::AppContext;
use cineorg::config::Config;
use cineorg::preflight;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {e}", "[ERROR]".red());
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> cineorg::Result<()> {
    let config = Config::load()?;

    if !cli.skip_preflight {
        let results = preflight::run_preflight_checks(&config);
        preflight::print_results(&results);
        println!();
    }

    let ctx = AppContext::build(config)?;

    match cli.command {
        Commands::Process { filter, dry_run } => commands::process::run(&ctx, filter, dry_run).await,
        Commands::Pending { all } => commands::pending::run(&ctx, all).await,
        Commands::Validate { mode } => match mode {
            ValidateMode::Auto => commands::validate::run_auto(&ctx).await,
            ValidateMode::Manual => commands::validate::run_manual(&ctx).await,
            ValidateMode::Batch => commands::validate::run_batch(&ctx).await,
            ValidateMode::File { id } => commands::validate::run_file(&ctx, &id).await,
        },
        Commands::Import { dir, dry_run, from_symlinks } => commands::import::run(&ctx, dir, dry_run, from_symlinks).await,
        Commands::Enrich => commands::enrich::run(&ctx).await,
        Commands::Cleanup { fix, max_per_dir } => commands::cleanup::run(&ctx, fix, max_per_dir).await,
        Commands::Regroup { dir, fix, min_count } => commands::regroup::run(&ctx, dir, fix, min_count).await,
        Commands::RepairLinks { dir, fix, min_score } => commands::repair_links::run(&ctx, dir, fix, min_score).await,
        Commands::FixSymlinks => commands::fix_links::run_fix_symlinks(&ctx).await,
        Commands::FixBadLinks => commands::fix_links::run_fix_bad_links(&ctx).await,
    }
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose { EnvFilter::new("cineorg=debug") } else { EnvFilter::new("cineorg=info") };

    tracing_subscriber::registry().with(fmt::layer().with_target(false).without_time()).with(filter).init();
}
