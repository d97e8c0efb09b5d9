//! A concrete [`CatalogClient`] talking to a TVDB-shaped REST API for
//! series lookups. Ground-truthed on this crate's own [`crate::services::tmdb`]
//! (same request/retry/query shape, same [`SearchHit`]/[`MediaDetails`]
//! mapping), adapted to TVDB's bearer-token login flow and
//! `episodes/query?airedSeason=` endpoint (spec §4.5's episode-count
//! elimination filter).

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TvdbCatalogConfig;
use crate::core::value_objects::{MediaDetails, SearchHit};
use crate::error::{Error, Result};
use crate::services::catalog::CatalogClient;

const TVDB_BASE_URL: &str = "https://api4.thetvdb.com/v4";

pub struct TvdbCatalog {
    config: TvdbCatalogConfig,
    client: reqwest::Client,
    token: Mutex<Option<String>>,
}

impl TvdbCatalog {
    pub fn new(config: TvdbCatalogConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    async fn login(&self) -> Result<String> {
        if let Some(tok) = self.token.lock().unwrap().clone() {
            return Ok(tok);
        }
        #[derive(serde::Serialize)]
        struct LoginRequest<'a> {
            apikey: &'a str,
        }
        #[derive(Deserialize)]
        struct LoginResponse {
            data: LoginData,
        }
        #[derive(Deserialize)]
        struct LoginData {
            token: String,
        }

        let resp = self
            .client
            .post(format!("{TVDB_BASE_URL}/login"))
            .json(&LoginRequest { apikey: &self.config.api_key })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::CatalogSearchError(format!(
                "TVDB login failed with status {}",
                resp.status()
            )));
        }
        let body: LoginResponse = resp.json().await?;
        *self.token.lock().unwrap() = Some(body.data.token.clone());
        Ok(body.data.token)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let token = self.login().await?;
        let url = format!("{TVDB_BASE_URL}/{path}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::CatalogSearchError(format!(
                "TVDB request to {path} failed with status {}",
                resp.status()
            )));
        }
        Ok(resp.json::<T>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    tvdb_id: String,
    name: String,
    #[serde(default)]
    translations: Option<serde_json::Value>,
    year: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeriesDetailsResponse {
    data: SeriesDetailsData,
}

#[derive(Debug, Deserialize)]
struct SeriesDetailsData {
    name: String,
    #[serde(rename = "originalCountry")]
    #[allow(dead_code)]
    original_country: Option<String>,
    overview: Option<String>,
    #[serde(rename = "firstAired")]
    first_aired: Option<String>,
    #[serde(default)]
    genres: Vec<GenreEntry>,
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GenreEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct EpisodesResponse {
    data: EpisodesData,
}

#[derive(Debug, Deserialize)]
struct EpisodesData {
    episodes: Vec<serde_json::Value>,
}

fn extract_year(year: &Option<String>) -> Option<u16> {
    year.as_ref().and_then(|y| y.get(0..4)).and_then(|y| y.parse().ok())
}

#[async_trait]
impl CatalogClient for TvdbCatalog {
    fn source_tag(&self) -> &'static str {
        "series"
    }

    async fn search(&self, title: &str, year: Option<u16>) -> Result<Vec<SearchHit>> {
        let mut query = vec![("query", title.to_string()), ("type", "series".to_string())];
        if let Some(y) = year {
            query.push(("year", y.to_string()));
        }

        let response: SearchResponse = self.get_json("search", &query).await?;

        Ok(response
            .data
            .into_iter()
            .map(|item| SearchHit {
                id: item.tvdb_id,
                title: item.name,
                original_title: None,
                year: extract_year(&item.year),
                source: self.source_tag().to_string(),
                score: 0.0,
            })
            .collect())
    }

    async fn get_details(&self, id: &str) -> Result<MediaDetails> {
        let details: SeriesDetailsResponse = self.get_json(&format!("series/{id}/extended"), &[]).await?;
        let data = details.data;
        Ok(MediaDetails {
            id: id.to_string(),
            title: data.name,
            original_title: None,
            year: extract_year(&data.first_aired),
            genres: data.genres.into_iter().map(|g| g.name).collect(),
            duration_seconds: None,
            overview: data.overview,
            director: None,
            cast: Vec::new(),
            vote_average: data.score,
            vote_count: None,
        })
    }

    async fn get_episode_count(&self, series_id: &str, season: u32) -> Result<Option<u32>> {
        let path = format!("series/{series_id}/episodes/default");
        match self
            .get_json::<EpisodesResponse>(&path, &[("airedSeason", season.to_string())])
            .await
        {
            Ok(resp) => Ok(Some(resp.data.episodes.len() as u32)),
            Err(_) => Ok(None),
        }
    }
}
