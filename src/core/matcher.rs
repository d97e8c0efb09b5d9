//! Deterministic scoring of catalog hits against parsed file metadata
//! (spec §4.4). Ground-truthed on `original_source`'s
//! `src/services/matcher.py`, which scores titles with
//! `rapidfuzz.fuzz.token_sort_ratio`. This crate has no `rapidfuzz`
//! equivalent in the pack's dependency stack, so `token_sort_ratio` is
//! reimplemented locally on top of `strsim` (already used by
//! `drmckay-homeflix`'s `ConfidenceService` for string-distance signals).

use strsim::normalized_levenshtein;

use crate::core::text_normalize::normalize_for_compare;
use crate::core::value_objects::SearchHit;
use crate::services::catalog::CatalogClient;

/// Score threshold for automatic validation (spec §4.4, §4.6).
pub const MATCH_THRESHOLD: f64 = 85.0;

/// Order-independent title similarity, 0-100: casefold/accent-normalize,
/// tokenize on whitespace, sort tokens, rejoin, then score with a
/// normalized edit distance. Mirrors `token_sort_ratio`'s word-order
/// independence without depending on `rapidfuzz`.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sorted_a = sorted_tokens(a);
    let sorted_b = sorted_tokens(b);
    if sorted_a.is_empty() && sorted_b.is_empty() {
        return 100.0;
    }
    normalized_levenshtein(&sorted_a, &sorted_b) * 100.0
}

fn sorted_tokens(input: &str) -> String {
    let normalized = normalize_for_compare(input);
    let mut tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn title_score(query_title: &str, candidate_title: &str, candidate_original_title: Option<&str>) -> f64 {
    let mut score = token_sort_ratio(query_title, candidate_title);
    if let Some(original) = candidate_original_title {
        score = score.max(token_sort_ratio(query_title, original));
    }
    score
}

/// Year match score (spec §4.4): `|Δ| ≤ 1 → 100`, else `100 − 25·(|Δ|−1)`,
/// floored at 0; missing either year yields 0.
pub fn year_score(query_year: Option<u16>, candidate_year: Option<u16>) -> f64 {
    match (query_year, candidate_year) {
        (Some(q), Some(c)) => {
            let diff = (q as i32 - c as i32).unsigned_abs();
            if diff <= 1 {
                100.0
            } else {
                (100.0 - 25.0 * (diff as f64 - 1.0)).max(0.0)
            }
        }
        _ => 0.0,
    }
}

/// Duration match score (spec §4.4): percentage deviation within 10% →
/// 100, each additional 10% deviation costs 50, floored at 0; missing
/// either duration yields 0.
pub fn duration_score(query_duration: Option<u64>, candidate_duration: Option<u64>) -> f64 {
    match (query_duration, candidate_duration) {
        (Some(q), Some(c)) if q > 0 => {
            let pct = ((c as f64 - q as f64).abs() / q as f64) * 100.0;
            if pct <= 10.0 {
                100.0
            } else {
                (100.0 - 50.0 * ((pct - 10.0) / 10.0)).max(0.0)
            }
        }
        _ => 0.0,
    }
}

/// Movie match score (spec §4.4): with duration on both sides,
/// `0.50·title + 0.25·year + 0.25·duration`; otherwise
/// `0.67·title + 0.33·year`. The zero-on-missing-axis behavior while still
/// weighting that axis is intentional (Open Question (ii), kept as
/// specified — see DESIGN.md).
#[allow(clippy::too_many_arguments)]
pub fn calculate_movie_score(
    query_title: &str,
    query_year: Option<u16>,
    query_duration: Option<u64>,
    candidate_title: &str,
    candidate_year: Option<u16>,
    candidate_duration: Option<u64>,
    candidate_original_title: Option<&str>,
) -> f64 {
    let title = title_score(query_title, candidate_title, candidate_original_title);
    let year = year_score(query_year, candidate_year);

    let duration_available =
        query_duration.is_some_and(|d| d > 0) && candidate_duration.is_some_and(|d| d > 0);

    let total = if duration_available {
        let duration = duration_score(query_duration, candidate_duration);
        title * 0.50 + year * 0.25 + duration * 0.25
    } else {
        title * 0.67 + year * 0.33
    };

    (total * 100.0).round() / 100.0
}

/// Series match score (spec §4.4): title similarity only, scaled to 100.
pub fn calculate_series_score(query_title: &str, candidate_title: &str) -> f64 {
    let score = token_sort_ratio(query_title, candidate_title);
    (score * 100.0).round() / 100.0
}

/// Score and sort a batch of movie hits (spec §4.4). Stable sort,
/// descending by score.
pub fn score_movie_results(
    mut hits: Vec<SearchHit>,
    query_title: &str,
    query_year: Option<u16>,
    query_duration: Option<u64>,
) -> Vec<SearchHit> {
    for hit in &mut hits {
        hit.score = calculate_movie_score(
            query_title,
            query_year,
            query_duration,
            &hit.title,
            hit.year,
            None,
            hit.original_title.as_deref(),
        );
    }
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits
}

/// Score a batch of series hits, then apply the episode-count elimination
/// filter (spec §4.4): when the query carries a concrete season+episode,
/// ask the catalog for `get_episode_count(series_id, season)` and drop
/// any candidate reporting a known count strictly below the query
/// episode number. Unknown counts or failed calls keep the candidate
/// (precautionary principle); if every candidate would be eliminated, the
/// original scored list is kept unchanged and a warning logged.
pub async fn score_series_results(
    mut hits: Vec<SearchHit>,
    query_title: &str,
    season: Option<u32>,
    episode: Option<u32>,
    catalog: &dyn CatalogClient,
) -> Vec<SearchHit> {
    for hit in &mut hits {
        hit.score = calculate_series_score(query_title, &hit.title);
    }
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let (Some(season), Some(episode)) = (season, episode) else {
        return hits;
    };

    let mut filtered = Vec::with_capacity(hits.len());
    for hit in &hits {
        match catalog.get_episode_count(&hit.id, season).await {
            Ok(Some(count)) if (count as u32) < episode => continue,
            _ => filtered.push(hit.clone()),
        }
    }

    if filtered.is_empty() {
        tracing::warn!(
            query_title,
            season,
            episode,
            "episode-count filter eliminated every candidate; keeping original list"
        );
        hits
    } else {
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_scores_are_order_independent() {
        let a = token_sort_ratio("Matrix The", "The Matrix");
        assert!(a > 99.0, "expected near-100 score, got {a}");
    }

    #[test]
    fn year_score_table() {
        assert_eq!(year_score(Some(2010), Some(2010)), 100.0);
        assert_eq!(year_score(Some(2010), Some(2011)), 100.0);
        assert_eq!(year_score(Some(2010), Some(2013)), 50.0);
        assert_eq!(year_score(Some(2010), None), 0.0);
    }

    #[test]
    fn duration_score_table() {
        assert_eq!(duration_score(Some(6000), Some(6000)), 100.0);
        assert_eq!(duration_score(Some(6000), Some(6300)), 100.0);
        assert_eq!(duration_score(Some(6000), Some(7500)), 0.0);
    }

    #[test]
    fn movie_score_without_duration_uses_fallback_weights() {
        let score = calculate_movie_score("Inception", Some(2010), None, "Inception", Some(2010), None, None);
        assert_eq!(score, 100.0);
    }

    #[test]
    fn movie_score_prefers_original_title_when_better() {
        let score = calculate_movie_score(
            "Le Fabuleux Destin d'Amelie Poulain",
            Some(2001),
            None,
            "Amelie",
            Some(2001),
            None,
            Some("Le Fabuleux Destin d'Amelie Poulain"),
        );
        assert!(score > 90.0);
    }

    /// Spec §8 scenario 3 (ambiguous sibling series): a catalog reporting
    /// fewer episodes in a season than the query's episode number must be
    /// eliminated, while a catalog that reports enough (or no) data is kept.
    struct FakeCatalog {
        counts: std::collections::HashMap<&'static str, Option<u32>>,
    }

    #[async_trait::async_trait]
    impl CatalogClient for FakeCatalog {
        fn source_tag(&self) -> &'static str {
            "series"
        }

        async fn search(&self, _title: &str, _year: Option<u16>) -> crate::Result<Vec<SearchHit>> {
            Ok(vec![])
        }

        async fn get_details(&self, _id: &str) -> crate::Result<crate::core::value_objects::MediaDetails> {
            unreachable!("not exercised by this test")
        }

        async fn get_episode_count(&self, series_id: &str, _season: u32) -> crate::Result<Option<u32>> {
            Ok(*self.counts.get(series_id).unwrap_or(&None))
        }
    }

    fn hit(id: &str, title: &str) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            title: title.to_string(),
            original_title: None,
            year: None,
            source: "series".to_string(),
            score: 0.0,
        }
    }

    #[tokio::test]
    async fn episode_count_filter_eliminates_season_with_too_few_episodes() {
        let catalog = FakeCatalog {
            counts: [("crossed-28-eps", Some(28)), ("star-crossed-13-eps", Some(13))].into(),
        };

        // Crossed.S01E05.mkv: season 1 episode 5, both candidates have enough episodes.
        let results_ep5 =
            score_series_results(vec![hit("crossed-28-eps", "Crossed"), hit("star-crossed-13-eps", "Star-Crossed")], "Crossed", Some(1), Some(5), &catalog)
                .await;
        assert_eq!(results_ep5.len(), 2);

        // Star-Crossed.S01E20.mkv: season 1 episode 20 eliminates the 13-episode candidate.
        let results_ep20 = score_series_results(
            vec![hit("crossed-28-eps", "Crossed"), hit("star-crossed-13-eps", "Star-Crossed")],
            "Star-Crossed",
            Some(1),
            Some(20),
            &catalog,
        )
        .await;
        assert_eq!(results_ep20.len(), 1);
        assert_eq!(results_ep20[0].id, "crossed-28-eps");
    }

    #[tokio::test]
    async fn episode_count_filter_keeps_all_when_every_candidate_would_be_eliminated() {
        let catalog = FakeCatalog { counts: [("only-2-eps", Some(2))].into() };
        let results = score_series_results(vec![hit("only-2-eps", "Some Show")], "Some Show", Some(1), Some(9), &catalog).await;
        assert_eq!(results.len(), 1, "original list kept unchanged when filter would empty it");
    }

    #[tokio::test]
    async fn episode_count_filter_keeps_unknown_counts() {
        let catalog = FakeCatalog { counts: std::collections::HashMap::new() };
        let results = score_series_results(vec![hit("unknown-eps", "Some Show")], "Some Show", Some(1), Some(20), &catalog).await;
        assert_eq!(results.len(), 1);
    }
}
