//! Persistence ports (spec §9): the core depends on these traits, never
//! on `rusqlite` directly, mirroring the teacher's own split between
//! `core` logic and the concrete store it drives through `models::*`.
//! Concrete implementations live in `infra::db`.

use async_trait::async_trait;

use crate::core::entities::{
    Episode, EpisodeId, Movie, MovieId, PendingValidation, PendingValidationId, Series, SeriesId, VideoFile,
    VideoFileId,
};
use crate::core::ratings::RatingSnapshot;
use crate::error::Result;

#[async_trait]
pub trait VideoFileRepository: Send + Sync {
    async fn save(&self, video_file: &VideoFile) -> Result<()>;
    async fn get_by_id(&self, id: &VideoFileId) -> Result<Option<VideoFile>>;
    async fn get_by_hash(&self, content_hash: &str) -> Result<Option<VideoFile>>;
    async fn get_by_path(&self, path: &std::path::Path) -> Result<Option<VideoFile>>;
    async fn get_by_symlink_path(&self, symlink_path: &std::path::Path) -> Result<Option<VideoFile>>;
    async fn list_all(&self) -> Result<Vec<VideoFile>>;

    /// Used by the Cleanup Engine after moving/re-linking a file in place
    /// (misplaced-symlink fix, subdivision, prefix regroup) so the record
    /// keeps pointing at the live symlink (spec §4.11, §4.12).
    async fn update_symlink_path(&self, old: &std::path::Path, new: &std::path::Path) -> Result<()>;

    /// Used by the Workflow Orchestrator's orphan purge and dry-run cleanup
    /// (spec §4.14 steps 1 and 8).
    async fn delete(&self, id: &VideoFileId) -> Result<()>;
}

#[async_trait]
pub trait PendingValidationRepository: Send + Sync {
    async fn save(&self, pending: &PendingValidation) -> Result<()>;
    async fn get_by_id(&self, id: &PendingValidationId) -> Result<Option<PendingValidation>>;
    async fn get_by_video_file_id(&self, video_file_id: &VideoFileId) -> Result<Option<PendingValidation>>;
    async fn list_pending(&self) -> Result<Vec<PendingValidation>>;
    /// Every pending validation regardless of status — validated-but-not-yet-
    /// transferred records from a crashed run are orphans too (spec §4.14
    /// step 1).
    async fn list_all(&self) -> Result<Vec<PendingValidation>>;
    async fn delete(&self, id: &PendingValidationId) -> Result<()>;
}

#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn save(&self, movie: &Movie) -> Result<()>;
    async fn get_by_id(&self, id: &MovieId) -> Result<Option<Movie>>;
    async fn get_by_video_file_id(&self, video_file_id: &VideoFileId) -> Result<Option<Movie>>;
    async fn list_without_ratings(&self, limit: usize) -> Result<Vec<Movie>>;
    async fn list_all(&self) -> Result<Vec<Movie>>;
}

#[async_trait]
pub trait SeriesRepository: Send + Sync {
    async fn save(&self, series: &Series) -> Result<()>;
    async fn get_by_id(&self, id: &SeriesId) -> Result<Option<Series>>;
    async fn get_by_title_year(&self, title: &str, year: Option<u16>) -> Result<Option<Series>>;
    async fn list_all(&self) -> Result<Vec<Series>>;
}

#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    async fn save(&self, episode: &Episode) -> Result<()>;
    async fn get_by_id(&self, id: &EpisodeId) -> Result<Option<Episode>>;
    async fn get_by_video_file_id(&self, video_file_id: &VideoFileId) -> Result<Option<Episode>>;
    async fn list_by_series(&self, series_id: &SeriesId) -> Result<Vec<Episode>>;
    async fn get_by_series_season_episode(
        &self,
        series_id: &SeriesId,
        season: u32,
        episode: u32,
    ) -> Result<Option<Episode>>;
}

/// Cache of looked-up IMDb ratings, keyed by imdb id (spec §10.5).
#[async_trait]
pub trait RatingsRepository: Send + Sync {
    async fn get(&self, imdb_id: &str) -> Result<Option<RatingSnapshot>>;
    async fn put(&self, imdb_id: &str, snapshot: RatingSnapshot) -> Result<()>;
}
