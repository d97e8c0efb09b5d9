//! Configuration-as-ambient-state.
//!
//! Paths, thresholds and catalog keys are read once into an immutable
//! `Config` value that is passed explicitly into every component. No
//! component reads the environment directly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Application configuration, loaded once at startup and threaded through
/// every component's constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub downloads_movies_dir: PathBuf,
    pub downloads_series_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub symlink_dir: PathBuf,
    pub database_path: PathBuf,

    /// Minimum file size, in bytes, for the Scanner to accept a video file.
    pub min_file_size_bytes: u64,
    /// Oversized-directory threshold for the Cleanup Engine's subdivision pass.
    pub max_items_per_dir: usize,
    /// Matcher auto-validation score threshold (spec default 85).
    pub match_score_threshold: f64,
    /// Margin by which the top candidate must lead the runner-up to be
    /// considered "clearly ahead" during auto-validation (Open Question (i),
    /// resolved to 5.0 — see DESIGN.md).
    pub auto_validate_margin: f64,
    /// Minimum delay between consecutive catalog calls, in milliseconds.
    pub catalog_rate_limit_ms: u64,
    /// Number of retry attempts on transient catalog failures.
    pub catalog_retry_attempts: u32,
    /// Prefix-grouper minimum occurrence count (spec default 3).
    pub prefix_group_min_count: usize,
    /// Symlink-repair auto-repair score threshold (spec default 90).
    pub repair_min_score: f64,

    pub tmdb: Option<TmdbCatalogConfig>,
    pub tvdb: Option<TvdbCatalogConfig>,

    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbCatalogConfig {
    pub api_key: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvdbCatalogConfig {
    pub api_key: String,
}

/// Raw shape loaded via `envy::prefixed("CINEORG_")`; optional catalog keys
/// collapse to `None` when absent rather than failing startup (spec §6).
#[derive(Debug, Clone, Default, Deserialize)]
struct EnvConfig {
    downloads_movies_dir: Option<PathBuf>,
    downloads_series_dir: Option<PathBuf>,
    storage_dir: Option<PathBuf>,
    symlink_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    min_file_size_bytes: Option<u64>,
    max_items_per_dir: Option<usize>,
    match_score_threshold: Option<f64>,
    auto_validate_margin: Option<f64>,
    catalog_rate_limit_ms: Option<u64>,
    catalog_retry_attempts: Option<u32>,
    prefix_group_min_count: Option<usize>,
    repair_min_score: Option<f64>,
    tmdb_api_key: Option<String>,
    tmdb_language: Option<String>,
    tvdb_api_key: Option<String>,
    log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let root = PathBuf::from("cineorg-data");
        Self {
            downloads_movies_dir: root.join("downloads/Films"),
            downloads_series_dir: root.join("downloads/Series"),
            storage_dir: root.join("storage"),
            symlink_dir: root.join("video"),
            database_path: root.join("cineorg.db"),
            min_file_size_bytes: 50 * 1024 * 1024,
            max_items_per_dir: 50,
            match_score_threshold: 85.0,
            auto_validate_margin: 5.0,
            catalog_rate_limit_ms: 250,
            catalog_retry_attempts: 3,
            prefix_group_min_count: 3,
            repair_min_score: 90.0,
            tmdb: None,
            tvdb: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, overlaid with an optional TOML file,
    /// overlaid with `CINEORG_`-prefixed environment variables (env wins
    /// last, per spec §6).
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Some(path) = toml_config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                config = toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("invalid config file {path:?}: {e}")))?;
            }
        }

        let env: EnvConfig = envy::prefixed("CINEORG_")
            .from_env()
            .map_err(|e| Error::Config(format!("invalid environment configuration: {e}")))?;
        config.apply_env(env);

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, env: EnvConfig) {
        macro_rules! overlay {
            ($field:ident) => {
                if let Some(v) = env.$field {
                    self.$field = v;
                }
            };
        }
        overlay!(downloads_movies_dir);
        overlay!(downloads_series_dir);
        overlay!(storage_dir);
        overlay!(symlink_dir);
        overlay!(database_path);
        overlay!(min_file_size_bytes);
        overlay!(max_items_per_dir);
        overlay!(match_score_threshold);
        overlay!(auto_validate_margin);
        overlay!(catalog_rate_limit_ms);
        overlay!(catalog_retry_attempts);
        overlay!(prefix_group_min_count);
        overlay!(repair_min_score);
        overlay!(log_level);

        if let Some(api_key) = env.tmdb_api_key {
            self.tmdb = Some(TmdbCatalogConfig {
                api_key,
                language: env.tmdb_language.unwrap_or_else(|| "en-US".to_string()),
            });
        }
        if let Some(api_key) = env.tvdb_api_key {
            self.tvdb = Some(TvdbCatalogConfig { api_key });
        }
    }

    /// Fatal-on-startup validation (spec §7: "invalid config (path missing)").
    /// Missing catalog keys are NOT fatal — they just disable that catalog.
    pub fn validate(&self) -> Result<()> {
        for dir in [&self.downloads_movies_dir, &self.downloads_series_dir] {
            if !dir.exists() {
                return Err(Error::ManagedDirectoryMissing(dir.clone()));
            }
        }
        Ok(())
    }
}

fn toml_config_path() -> Option<PathBuf> {
    std::env::var_os("CINEORG_CONFIG_FILE")
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|d| d.join("cineorg").join("config.toml")))
}

/// Resolve the storage-relative `Films` and `Séries` roots from config.
pub fn managed_roots(config: &Config) -> [&Path; 2] {
    [config.storage_dir.as_path(), config.symlink_dir.as_path()]
}
