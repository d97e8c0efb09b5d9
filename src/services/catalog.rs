//! The Catalog Client Port (spec §2, §9 "dynamic dispatch / plugin-like
//! catalog sources"): `search`, `get_details`, `get_episode_count`, plus a
//! source tag. A concrete implementation (`services::tmdb::TmdbCatalog`) is
//! chosen per media type at wiring time.

use async_trait::async_trait;

use crate::core::value_objects::{MediaDetails, SearchHit};
use crate::error::Result;

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// `"movies"` or `"series"` — stamped onto every [`SearchHit`] this
    /// client returns.
    fn source_tag(&self) -> &'static str;

    async fn search(&self, title: &str, year: Option<u16>) -> Result<Vec<SearchHit>>;

    async fn get_details(&self, id: &str) -> Result<MediaDetails>;

    /// Episode count for a given series/season, when known. `Ok(None)`
    /// means the catalog has no data for that season (kept, not
    /// eliminated, by the Matcher's episode-count filter — spec §4.4).
    async fn get_episode_count(&self, series_id: &str, season: u32) -> Result<Option<u32>>;
}
