//! A concrete [`CatalogClient`] talking to a TMDB-shaped REST API.
//! Ground-truthed on the teacher's `services::tmdb::TmdbClient`
//! (`search_movie`, `get_movie_details`, `search_tv`, `get_season_details`),
//! adapted to return the crate's `SearchHit`/`MediaDetails` value objects
//! instead of raw TMDB wire types, and split into a movie-mode and
//! series-mode client (spec §9: multiple catalogs wired per media type).

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TmdbCatalogConfig;
use crate::core::value_objects::{MediaDetails, SearchHit};
use crate::error::{Error, Result};
use crate::services::catalog::CatalogClient;

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmdbMode {
    Movie,
    Tv,
}

pub struct TmdbCatalog {
    config: TmdbCatalogConfig,
    client: reqwest::Client,
    mode: TmdbMode,
}

impl TmdbCatalog {
    pub fn new(config: TmdbCatalogConfig, mode: TmdbMode) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            mode,
        }
    }

    fn search_path(&self) -> &'static str {
        match self.mode {
            TmdbMode::Movie => "search/movie",
            TmdbMode::Tv => "search/tv",
        }
    }

    fn details_path(&self, id: &str) -> String {
        match self.mode {
            TmdbMode::Movie => format!("movie/{id}"),
            TmdbMode::Tv => format!("tv/{id}"),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{TMDB_BASE_URL}/{path}");
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", self.config.api_key.clone()),
            ("language", self.config.language.clone()),
        ];
        params.extend(query.iter().cloned());

        let resp = self.client.get(&url).query(&params).send().await?;
        if !resp.status().is_success() {
            return Err(Error::CatalogSearchError(format!(
                "TMDB request to {path} failed with status {}",
                resp.status()
            )));
        }
        Ok(resp.json::<T>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: u64,
    #[serde(alias = "name")]
    title: String,
    #[serde(alias = "original_name")]
    original_title: Option<String>,
    #[serde(alias = "first_air_date")]
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(alias = "name")]
    title: String,
    #[serde(alias = "original_name")]
    original_title: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    first_air_date: Option<String>,
    overview: Option<String>,
    runtime: Option<u32>,
    genres: Option<Vec<GenreEntry>>,
    vote_average: Option<f32>,
    vote_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenreEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SeasonDetailsResponse {
    episodes: Vec<serde_json::Value>,
}

fn extract_year(date: &Option<String>) -> Option<u16> {
    date.as_ref().and_then(|d| d.get(0..4)).and_then(|y| y.parse().ok())
}

#[async_trait]
impl CatalogClient for TmdbCatalog {
    fn source_tag(&self) -> &'static str {
        match self.mode {
            TmdbMode::Movie => "movies",
            TmdbMode::Tv => "series",
        }
    }

    async fn search(&self, title: &str, year: Option<u16>) -> Result<Vec<SearchHit>> {
        let mut query = vec![("query", title.to_string())];
        if let Some(y) = year {
            let key = match self.mode {
                TmdbMode::Movie => "year",
                TmdbMode::Tv => "first_air_date_year",
            };
            query.push((key, y.to_string()));
        }

        let response: SearchResponse = self.get_json(self.search_path(), &query).await?;

        Ok(response
            .results
            .into_iter()
            .map(|item| SearchHit {
                id: item.id.to_string(),
                title: item.title,
                original_title: item.original_title,
                year: extract_year(&item.release_date),
                source: self.source_tag().to_string(),
                score: 0.0,
            })
            .collect())
    }

    async fn get_details(&self, id: &str) -> Result<MediaDetails> {
        let details: DetailsResponse = self.get_json(&self.details_path(id), &[]).await?;
        let year = extract_year(&details.release_date).or_else(|| extract_year(&details.first_air_date));

        Ok(MediaDetails {
            id: id.to_string(),
            title: details.title,
            original_title: details.original_title,
            year,
            genres: details
                .genres
                .unwrap_or_default()
                .into_iter()
                .map(|g| g.name)
                .collect(),
            duration_seconds: details.runtime.map(|m| m as u64 * 60),
            overview: details.overview,
            director: None,
            cast: Vec::new(),
            vote_average: details.vote_average,
            vote_count: details.vote_count,
        })
    }

    async fn get_episode_count(&self, series_id: &str, season: u32) -> Result<Option<u32>> {
        if self.mode != TmdbMode::Tv {
            return Ok(None);
        }
        let path = format!("tv/{series_id}/season/{season}");
        match self.get_json::<SeasonDetailsResponse>(&path, &[]).await {
            Ok(details) => Ok(Some(details.episodes.len() as u32)),
            Err(_) => Ok(None),
        }
    }
}
