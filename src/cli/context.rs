//! Wires configuration into concrete adapters: the single place every
//! command builds its filesystem, database, catalog and probe
//! dependencies from (spec §9's ports, given real implementations).

use crate::config::Config;
use crate::core::ratelimit::RateLimiter;
use crate::error::Result;
use crate::infra::db::{
    SqliteEpisodeRepository, SqliteMovieRepository, SqlitePendingValidationRepository, SqliteRatingsRepository,
    SqliteSeriesRepository, SqliteStore, SqliteVideoFileRepository,
};
use crate::infra::fs::StdFilesystem;
use crate::services::catalog::CatalogClient;
use crate::services::ffprobe::{FfprobeMediaProbe, MediaProbe, NullMediaProbe};
use crate::services::tmdb::{TmdbCatalog, TmdbMode};
use crate::services::tvdb::TvdbCatalog;

/// Every dependency a command needs, built once from [`Config`].
pub struct AppContext {
    pub config: Config,
    pub fs: StdFilesystem,
    pub probe: Box<dyn MediaProbe>,
    pub movie_catalog: Option<Box<dyn CatalogClient>>,
    pub series_catalog: Option<Box<dyn CatalogClient>>,
    pub video_file_repo: SqliteVideoFileRepository,
    pub pending_repo: SqlitePendingValidationRepository,
    pub movie_repo: SqliteMovieRepository,
    pub series_repo: SqliteSeriesRepository,
    pub episode_repo: SqliteEpisodeRepository,
    pub ratings_repo: SqliteRatingsRepository,
    pub limiter: RateLimiter,
}

impl AppContext {
    pub fn build(config: Config) -> Result<Self> {
        let store = SqliteStore::open(&config.database_path)?;

        let probe: Box<dyn MediaProbe> = if FfprobeMediaProbe::is_installed() {
            Box::new(FfprobeMediaProbe::new())
        } else {
            tracing::warn!("ffprobe not found on PATH; technical metadata will be unavailable");
            Box::new(NullMediaProbe)
        };

        let movie_catalog: Option<Box<dyn CatalogClient>> = config
            .tmdb
            .clone()
            .map(|cfg| Box::new(TmdbCatalog::new(cfg, TmdbMode::Movie)) as Box<dyn CatalogClient>);

        // Series lookups prefer a TVDB-shaped catalog; fall back to TMDB's
        // TV-mode endpoints when only a TMDB key is configured (spec §9:
        // "multiple catalogs wired per media type", not mandated per-type).
        let series_catalog: Option<Box<dyn CatalogClient>> = match (&config.tvdb, &config.tmdb) {
            (Some(cfg), _) => Some(Box::new(TvdbCatalog::new(cfg.clone()))),
            (None, Some(cfg)) => Some(Box::new(TmdbCatalog::new(cfg.clone(), TmdbMode::Tv))),
            (None, None) => None,
        };

        let limiter = RateLimiter::new(config.catalog_rate_limit_ms);

        Ok(Self {
            fs: StdFilesystem::new(),
            probe,
            movie_catalog,
            series_catalog,
            video_file_repo: SqliteVideoFileRepository::new(store.clone()),
            pending_repo: SqlitePendingValidationRepository::new(store.clone()),
            movie_repo: SqliteMovieRepository::new(store.clone()),
            series_repo: SqliteSeriesRepository::new(store.clone()),
            episode_repo: SqliteEpisodeRepository::new(store.clone()),
            ratings_repo: SqliteRatingsRepository::new(store),
            limiter,
            config,
        })
    }

    pub fn movie_catalog(&self) -> Option<&dyn CatalogClient> {
        self.movie_catalog.as_deref()
    }

    pub fn series_catalog(&self) -> Option<&dyn CatalogClient> {
        self.series_catalog.as_deref()
    }
}
