//! `cineorg pending` — list pending (or, with `--all`, every) validation
//! item (spec §6).

use colored::Colorize;

use crate::cli::context::AppContext;
use crate::core::entities::ValidationStatus;
use crate::error::Result;

fn status_label(status: ValidationStatus) -> colored::ColoredString {
    match status {
        ValidationStatus::Pending => "pending".yellow(),
        ValidationStatus::Validated => "validated".green(),
        ValidationStatus::Rejected => "rejected".red(),
    }
}

pub async fn run(ctx: &AppContext, all: bool) -> Result<()> {
    let items = if all { ctx.pending_repo.list_all().await? } else { ctx.pending_repo.list_pending().await? };

    if items.is_empty() {
        println!("{}", "Nothing pending.".dimmed());
        return Ok(());
    }

    println!("{}", format!("{} item(s)", items.len()).bold());
    for item in &items {
        let top = item.candidates.first();
        let top_desc = top
            .map(|c| format!("{} ({}) score {:.1}", c.title, c.year.map(|y| y.to_string()).unwrap_or_else(|| "????".into()), c.score))
            .unwrap_or_else(|| "no candidates".to_string());
        println!(
            "  {} [{}] {} -- {}",
            item.id.0,
            status_label(item.validation_status),
            item.video_file.filename,
            top_desc
        );
    }
    Ok(())
}
