//! Enrichment: calling out to a catalog for candidates and scoring them
//! (spec §4.4/§4.5 applied to the async I/O boundary). Ground-truthed on
//! `examples/original_source/src/services/enricher.py`
//! (`EnricherService.list_pending_enrichment`/`_enrich_single`/
//! `enrich_batch`, `RATE_LIMIT_DELAY = 0.25s`, `MAX_RETRIES = 3`) and
//! `examples/original_source/src/services/workflow/pending_factory.py`'s
//! movie-duration re-score step: the first pass scores search results
//! without duration (API search responses don't carry it), then the
//! top-3 scored candidates are re-fetched via `get_details` for their
//! real runtime and re-scored with [`crate::core::matcher::calculate_movie_score`],
//! merged back with the remainder and re-sorted.

use crate::core::matcher::{self, calculate_movie_score};
use crate::core::ratelimit::RateLimiter;
use crate::core::retry::with_linear_backoff;
use crate::core::value_objects::SearchHit;
use crate::error::Result;
use crate::services::catalog::CatalogClient;

/// How many top movie candidates get the duration-enriched re-score pass.
const DURATION_ENRICH_TOP_N: usize = 3;

/// Searches `catalog` for a movie query, rate-limited and retried on
/// transient failure, then re-scores the top candidates with their real
/// runtime (spec §4.4 resolution note).
pub async fn enrich_movie_candidates(
    catalog: &dyn CatalogClient,
    limiter: &RateLimiter,
    retry_attempts: u32,
    query_title: &str,
    query_year: Option<u16>,
    query_duration: Option<u64>,
) -> Result<Vec<SearchHit>> {
    limiter.wait().await;
    let hits = with_linear_backoff(retry_attempts, std::time::Duration::from_millis(250), || {
        catalog.search(query_title, query_year)
    })
    .await?;

    let mut scored = matcher::score_movie_results(hits, query_title, query_year, query_duration);
    if scored.is_empty() {
        return Ok(scored);
    }

    let enrich_count = scored.len().min(DURATION_ENRICH_TOP_N);
    for hit in &mut scored[..enrich_count] {
        limiter.wait().await;
        let details = match catalog.get_details(&hit.id).await {
            Ok(details) => details,
            Err(_) => continue,
        };
        hit.score = calculate_movie_score(
            query_title,
            query_year,
            query_duration,
            &details.title,
            details.year,
            details.duration_seconds,
            details.original_title.as_deref(),
        );
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    Ok(scored)
}

/// Searches `catalog` for a series query, rate-limited and retried, then
/// applies the episode-count elimination filter (spec §4.4).
pub async fn enrich_series_candidates(
    catalog: &dyn CatalogClient,
    limiter: &RateLimiter,
    retry_attempts: u32,
    query_title: &str,
    query_year: Option<u16>,
    season: Option<u32>,
    episode: Option<u32>,
) -> Result<Vec<SearchHit>> {
    limiter.wait().await;
    let hits = with_linear_backoff(retry_attempts, std::time::Duration::from_millis(250), || {
        catalog.search(query_title, query_year)
    })
    .await?;

    Ok(matcher::score_series_results(hits, query_title, season, episode, catalog).await)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnrichmentSummary {
    pub enriched: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl EnrichmentSummary {
    pub fn total(&self) -> usize {
        self.enriched + self.failed + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value_objects::MediaDetails;
    use async_trait::async_trait;

    struct FakeCatalog {
        hits: Vec<SearchHit>,
        details_duration: u64,
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        fn source_tag(&self) -> &'static str {
            "movies"
        }
        async fn search(&self, _title: &str, _year: Option<u16>) -> Result<Vec<SearchHit>> {
            Ok(self.hits.clone())
        }
        async fn get_details(&self, id: &str) -> Result<MediaDetails> {
            Ok(MediaDetails {
                id: id.to_string(),
                title: "Inception".to_string(),
                original_title: None,
                year: Some(2010),
                genres: Vec::new(),
                duration_seconds: Some(self.details_duration),
                overview: None,
                director: None,
                cast: Vec::new(),
                vote_average: None,
                vote_count: None,
            })
        }
        async fn get_episode_count(&self, _series_id: &str, _season: u32) -> Result<Option<u32>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn movie_enrichment_reorders_with_real_duration() {
        let catalog = FakeCatalog {
            hits: vec![
                SearchHit {
                    id: "1".into(),
                    title: "Inception".into(),
                    original_title: None,
                    year: Some(2010),
                    source: "movies".into(),
                    score: 0.0,
                },
                SearchHit {
                    id: "2".into(),
                    title: "Inception Sequel".into(),
                    original_title: None,
                    year: Some(2010),
                    source: "movies".into(),
                    score: 0.0,
                },
            ],
            details_duration: 8880,
        };
        let limiter = RateLimiter::new(0);

        let scored = enrich_movie_candidates(&catalog, &limiter, 3, "Inception", Some(2010), Some(8880))
            .await
            .unwrap();

        assert_eq!(scored[0].id, "1");
        assert!(scored[0].score > scored[1].score);
    }
}
