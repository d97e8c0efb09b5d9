//! `cineorg enrich` — refills empty candidate lists for pending items
//! already on record (spec §4.4), e.g. after configuring a catalog key
//! that was absent during the original scan.

use colored::Colorize;

use crate::cli::context::AppContext;
use crate::core::enricher::{self, EnrichmentSummary};
use crate::core::parser;
use crate::core::value_objects::MediaKind;
use crate::error::Result;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let pending = ctx.pending_repo.list_pending().await?;
    let empty: Vec<_> = pending.into_iter().filter(|p| p.candidates.is_empty()).collect();

    if empty.is_empty() {
        println!("{}", "No pending item is missing candidates.".dimmed());
        return Ok(());
    }

    let mut summary = EnrichmentSummary::default();

    for mut item in empty {
        let hint = if parser::natural_type(&item.video_file.filename) == MediaKind::Series {
            MediaKind::Series
        } else {
            MediaKind::Movie
        };
        let parsed = parser::parse_filename(&item.video_file.filename, hint);

        let candidates = if parsed.detected_type == MediaKind::Movie {
            match ctx.movie_catalog() {
                Some(catalog) => {
                    let duration = item.video_file.media_info.as_ref().and_then(|m| m.duration_seconds);
                    enricher::enrich_movie_candidates(
                        catalog,
                        &ctx.limiter,
                        ctx.config.catalog_retry_attempts,
                        &parsed.title,
                        parsed.year,
                        duration,
                    )
                    .await
                }
                None => {
                    summary.skipped += 1;
                    continue;
                }
            }
        } else {
            match ctx.series_catalog() {
                Some(catalog) => {
                    enricher::enrich_series_candidates(
                        catalog,
                        &ctx.limiter,
                        ctx.config.catalog_retry_attempts,
                        &parsed.title,
                        parsed.year,
                        parsed.season,
                        parsed.episode,
                    )
                    .await
                }
                None => {
                    summary.skipped += 1;
                    continue;
                }
            }
        };

        match candidates {
            Ok(candidates) => {
                item.candidates = candidates;
                ctx.pending_repo.save(&item).await?;
                summary.enriched += 1;
            }
            Err(e) => {
                println!("{} {}: {e}", "[FAIL]".red(), item.video_file.filename);
                summary.failed += 1;
            }
        }
    }

    println!(
        "enriched: {} ({} failed, {} skipped — no catalog configured)",
        summary.enriched, summary.failed, summary.skipped
    );
    Ok(())
}
