//! SQLite-backed persistence (spec §9). Ground-truthed on
//! `examples/original_source/src/infrastructure/persistence/repositories/
//! video_file_repository.py` and `pending_validation_repository.py`
//! (SQLModel-over-SQLite, flat columns for `MediaInfo`, JSON columns for
//! candidate lists) translated to `rusqlite` — the teacher's own
//! dependency for this concern (Cargo.toml already carries
//! `rusqlite = { features = ["bundled"] }`). `rusqlite::Connection` is
//! blocking, so every query runs inside `tokio::task::spawn_blocking`,
//! the same boundary the teacher draws in `infra::fs::StdFilesystem`
//! around `std::fs`/hashing work.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::entities::{
    Episode, EpisodeId, Movie, MovieId, PendingValidation, PendingValidationId, Series, SeriesId, ValidationStatus,
    VideoFile, VideoFileId,
};
use crate::core::ratings::RatingSnapshot;
use crate::core::repository::{
    EpisodeRepository, MovieRepository, PendingValidationRepository, RatingsRepository, SeriesRepository,
    VideoFileRepository,
};
use crate::core::value_objects::{MediaInfo, SearchHit};
use crate::error::{Error, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS video_files (
    id              TEXT PRIMARY KEY,
    path            TEXT NOT NULL UNIQUE,
    symlink_path    TEXT,
    filename        TEXT NOT NULL,
    size_bytes      INTEGER NOT NULL,
    content_hash    TEXT,
    media_info_json TEXT
);

CREATE INDEX IF NOT EXISTS idx_video_files_hash ON video_files(content_hash);
CREATE INDEX IF NOT EXISTS idx_video_files_symlink ON video_files(symlink_path);

CREATE TABLE IF NOT EXISTS pending_validations (
    id                     TEXT PRIMARY KEY,
    video_file_id          TEXT NOT NULL REFERENCES video_files(id),
    candidates_json        TEXT NOT NULL,
    validation_status      TEXT NOT NULL,
    selected_candidate_id  TEXT,
    auto_validated         INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pending_status ON pending_validations(validation_status);
CREATE INDEX IF NOT EXISTS idx_pending_video_file ON pending_validations(video_file_id);

CREATE TABLE IF NOT EXISTS movies (
    id                  TEXT PRIMARY KEY,
    video_file_id       TEXT NOT NULL REFERENCES video_files(id),
    title               TEXT NOT NULL,
    original_title      TEXT,
    year                INTEGER,
    genres_json         TEXT NOT NULL,
    duration_seconds    INTEGER,
    overview            TEXT,
    poster_ref          TEXT,
    vote_average        REAL,
    vote_count          INTEGER,
    imdb_id             TEXT,
    imdb_rating         REAL,
    imdb_vote_count     INTEGER,
    director            TEXT,
    cast_json           TEXT NOT NULL,
    video_codec         TEXT,
    resolution_label    TEXT,
    audio_languages_json TEXT NOT NULL,
    size_bytes          INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_movies_video_file ON movies(video_file_id);
CREATE INDEX IF NOT EXISTS idx_movies_imdb ON movies(imdb_id);

CREATE TABLE IF NOT EXISTS series (
    id              TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    original_title  TEXT,
    year            INTEGER,
    genres_json     TEXT NOT NULL,
    overview        TEXT,
    poster_ref      TEXT,
    vote_average    REAL,
    vote_count      INTEGER,
    imdb_id         TEXT,
    imdb_rating     REAL,
    imdb_vote_count INTEGER
);

CREATE INDEX IF NOT EXISTS idx_series_title_year ON series(title, year);

CREATE TABLE IF NOT EXISTS episodes (
    id                  TEXT PRIMARY KEY,
    video_file_id       TEXT NOT NULL REFERENCES video_files(id),
    series_id           TEXT NOT NULL REFERENCES series(id),
    season_number       INTEGER NOT NULL,
    episode_number      INTEGER NOT NULL,
    title               TEXT,
    video_codec         TEXT,
    resolution_label    TEXT,
    audio_languages_json TEXT NOT NULL,
    size_bytes          INTEGER NOT NULL,
    UNIQUE(series_id, season_number, episode_number)
);

CREATE INDEX IF NOT EXISTS idx_episodes_series ON episodes(series_id);
CREATE INDEX IF NOT EXISTS idx_episodes_video_file ON episodes(video_file_id);

CREATE TABLE IF NOT EXISTS imdb_ratings (
    imdb_id     TEXT PRIMARY KEY,
    rating      REAL NOT NULL,
    vote_count  INTEGER NOT NULL
);
"#;

/// Opens and migrates a SQLite database, handing out cheap clones that
/// share one connection behind a mutex (spec §9: a single local-process
/// store, no concurrent-writer story needed).
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("sqlite mutex poisoned");
            f(&conn)
        })
        .await
        .map_err(|e| Error::other(format!("sqlite task panicked: {e}")))?
    }
}

fn media_info_to_json(info: Option<&MediaInfo>) -> Result<Option<String>> {
    match info {
        Some(info) => Ok(Some(serde_json::to_string(info)?)),
        None => Ok(None),
    }
}

fn json_to_media_info(json: Option<String>) -> Result<Option<MediaInfo>> {
    match json {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

fn candidates_to_json(candidates: &[SearchHit]) -> Result<String> {
    Ok(serde_json::to_string(candidates)?)
}

fn json_to_candidates(json: &str) -> Result<Vec<SearchHit>> {
    Ok(serde_json::from_str(json)?)
}

fn strings_to_json(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

fn json_to_strings(json: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(json)?)
}

fn status_to_str(status: ValidationStatus) -> &'static str {
    match status {
        ValidationStatus::Pending => "pending",
        ValidationStatus::Validated => "validated",
        ValidationStatus::Rejected => "rejected",
    }
}

fn status_from_str(s: &str) -> Result<ValidationStatus> {
    match s {
        "pending" => Ok(ValidationStatus::Pending),
        "validated" => Ok(ValidationStatus::Validated),
        "rejected" => Ok(ValidationStatus::Rejected),
        other => Err(Error::Database(format!("unknown validation_status {other:?}"))),
    }
}

fn video_file_from_row(row: &Row) -> rusqlite::Result<(VideoFile, Option<String>)> {
    let id: String = row.get("id")?;
    let path: String = row.get("path")?;
    let symlink_path: Option<String> = row.get("symlink_path")?;
    let filename: String = row.get("filename")?;
    let size_bytes: i64 = row.get("size_bytes")?;
    let content_hash: Option<String> = row.get("content_hash")?;
    let media_info_json: Option<String> = row.get("media_info_json")?;

    Ok((
        VideoFile {
            id: VideoFileId(id),
            path: path.into(),
            symlink_path: symlink_path.map(Into::into),
            filename,
            size_bytes: size_bytes as u64,
            content_hash,
            media_info: None,
        },
        media_info_json,
    ))
}

fn finish_video_file(pair: (VideoFile, Option<String>)) -> Result<VideoFile> {
    let (mut video_file, json) = pair;
    video_file.media_info = json_to_media_info(json)?;
    Ok(video_file)
}

pub struct SqliteVideoFileRepository {
    store: SqliteStore,
}

impl SqliteVideoFileRepository {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl VideoFileRepository for SqliteVideoFileRepository {
    async fn save(&self, video_file: &VideoFile) -> Result<()> {
        let video_file = video_file.clone();
        self.store
            .with_conn(move |conn| {
                let media_info_json = media_info_to_json(video_file.media_info.as_ref())?;
                conn.execute(
                    "INSERT INTO video_files (id, path, symlink_path, filename, size_bytes, content_hash, media_info_json)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(id) DO UPDATE SET
                        path = excluded.path,
                        symlink_path = excluded.symlink_path,
                        filename = excluded.filename,
                        size_bytes = excluded.size_bytes,
                        content_hash = excluded.content_hash,
                        media_info_json = excluded.media_info_json",
                    params![
                        video_file.id.0,
                        video_file.path.to_string_lossy(),
                        video_file.symlink_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                        video_file.filename,
                        video_file.size_bytes as i64,
                        video_file.content_hash,
                        media_info_json,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn get_by_id(&self, id: &VideoFileId) -> Result<Option<VideoFile>> {
        let id = id.0.clone();
        self.store
            .with_conn(move |conn| {
                let pair = conn
                    .query_row("SELECT * FROM video_files WHERE id = ?1", params![id], |row| {
                        video_file_from_row(row)
                    })
                    .optional()?;
                pair.map(finish_video_file).transpose()
            })
            .await
    }

    async fn get_by_hash(&self, content_hash: &str) -> Result<Option<VideoFile>> {
        let content_hash = content_hash.to_string();
        self.store
            .with_conn(move |conn| {
                let pair = conn
                    .query_row(
                        "SELECT * FROM video_files WHERE content_hash = ?1",
                        params![content_hash],
                        |row| video_file_from_row(row),
                    )
                    .optional()?;
                pair.map(finish_video_file).transpose()
            })
            .await
    }

    async fn get_by_path(&self, path: &Path) -> Result<Option<VideoFile>> {
        let path = path.to_string_lossy().into_owned();
        self.store
            .with_conn(move |conn| {
                let pair = conn
                    .query_row("SELECT * FROM video_files WHERE path = ?1", params![path], |row| {
                        video_file_from_row(row)
                    })
                    .optional()?;
                pair.map(finish_video_file).transpose()
            })
            .await
    }

    async fn get_by_symlink_path(&self, symlink_path: &Path) -> Result<Option<VideoFile>> {
        let symlink_path = symlink_path.to_string_lossy().into_owned();
        self.store
            .with_conn(move |conn| {
                let pair = conn
                    .query_row(
                        "SELECT * FROM video_files WHERE symlink_path = ?1",
                        params![symlink_path],
                        |row| video_file_from_row(row),
                    )
                    .optional()?;
                pair.map(finish_video_file).transpose()
            })
            .await
    }

    async fn list_all(&self) -> Result<Vec<VideoFile>> {
        self.store
            .with_conn(move |conn| {
                let mut stmt = conn.prepare("SELECT * FROM video_files")?;
                let rows = stmt.query_map([], video_file_from_row)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(finish_video_file(row?)?);
                }
                Ok(out)
            })
            .await
    }

    async fn update_symlink_path(&self, old: &Path, new: &Path) -> Result<()> {
        let old = old.to_string_lossy().into_owned();
        let new = new.to_string_lossy().into_owned();
        self.store
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE video_files SET symlink_path = ?1 WHERE symlink_path = ?2",
                    params![new, old],
                )?;
                Ok(())
            })
            .await
    }

    async fn delete(&self, id: &VideoFileId) -> Result<()> {
        let id = id.0.clone();
        self.store
            .with_conn(move |conn| {
                conn.execute("DELETE FROM video_files WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
    }
}

pub struct SqlitePendingValidationRepository {
    store: SqliteStore,
}

impl SqlitePendingValidationRepository {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

fn pending_from_row(row: &Row) -> rusqlite::Result<(PendingValidationId, String, String, String, Option<String>, bool)> {
    Ok((
        PendingValidationId(row.get("id")?),
        row.get("video_file_id")?,
        row.get("candidates_json")?,
        row.get("validation_status")?,
        row.get("selected_candidate_id")?,
        row.get::<_, i64>("auto_validated")? != 0,
    ))
}

#[async_trait]
impl PendingValidationRepository for SqlitePendingValidationRepository {
    async fn save(&self, pending: &PendingValidation) -> Result<()> {
        let pending = pending.clone();
        self.store
            .with_conn(move |conn| {
                let candidates_json = candidates_to_json(&pending.candidates)?;
                let video_file_json = media_info_to_json(pending.video_file.media_info.as_ref())?;

                conn.execute(
                    "INSERT INTO video_files (id, path, symlink_path, filename, size_bytes, content_hash, media_info_json)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(id) DO UPDATE SET
                        path = excluded.path,
                        symlink_path = excluded.symlink_path,
                        filename = excluded.filename,
                        size_bytes = excluded.size_bytes,
                        content_hash = excluded.content_hash,
                        media_info_json = excluded.media_info_json",
                    params![
                        pending.video_file.id.0,
                        pending.video_file.path.to_string_lossy(),
                        pending.video_file.symlink_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                        pending.video_file.filename,
                        pending.video_file.size_bytes as i64,
                        pending.video_file.content_hash,
                        video_file_json,
                    ],
                )?;

                conn.execute(
                    "INSERT INTO pending_validations (id, video_file_id, candidates_json, validation_status, selected_candidate_id, auto_validated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                        video_file_id = excluded.video_file_id,
                        candidates_json = excluded.candidates_json,
                        validation_status = excluded.validation_status,
                        selected_candidate_id = excluded.selected_candidate_id,
                        auto_validated = excluded.auto_validated",
                    params![
                        pending.id.0,
                        pending.video_file.id.0,
                        candidates_json,
                        status_to_str(pending.validation_status),
                        pending.selected_candidate_id,
                        pending.auto_validated as i64,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn get_by_id(&self, id: &PendingValidationId) -> Result<Option<PendingValidation>> {
        let id = id.0.clone();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT * FROM pending_validations WHERE id = ?1",
                        params![id],
                        pending_from_row,
                    )
                    .optional()?;
                let Some((pid, video_file_id, candidates_json, status, selected, auto)) = row else {
                    return Ok(None);
                };
                let video_file = load_video_file(conn, &video_file_id)?;
                Ok(Some(PendingValidation {
                    id: pid,
                    video_file,
                    candidates: json_to_candidates(&candidates_json)?,
                    validation_status: status_from_str(&status)?,
                    selected_candidate_id: selected,
                    auto_validated: auto,
                }))
            })
            .await
    }

    async fn get_by_video_file_id(&self, video_file_id: &VideoFileId) -> Result<Option<PendingValidation>> {
        let video_file_id = video_file_id.0.clone();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT * FROM pending_validations WHERE video_file_id = ?1",
                        params![video_file_id],
                        pending_from_row,
                    )
                    .optional()?;
                let Some((pid, vf_id, candidates_json, status, selected, auto)) = row else {
                    return Ok(None);
                };
                let video_file = load_video_file(conn, &vf_id)?;
                Ok(Some(PendingValidation {
                    id: pid,
                    video_file,
                    candidates: json_to_candidates(&candidates_json)?,
                    validation_status: status_from_str(&status)?,
                    selected_candidate_id: selected,
                    auto_validated: auto,
                }))
            })
            .await
    }

    async fn list_pending(&self) -> Result<Vec<PendingValidation>> {
        self.store
            .with_conn(move |conn| {
                list_pending_where(conn, "validation_status = 'pending'")
            })
            .await
    }

    async fn list_all(&self) -> Result<Vec<PendingValidation>> {
        self.store.with_conn(move |conn| list_pending_where(conn, "1 = 1")).await
    }

    async fn delete(&self, id: &PendingValidationId) -> Result<()> {
        let id = id.0.clone();
        self.store
            .with_conn(move |conn| {
                conn.execute("DELETE FROM pending_validations WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
    }
}

fn load_video_file(conn: &Connection, video_file_id: &str) -> Result<VideoFile> {
    let pair = conn
        .query_row("SELECT * FROM video_files WHERE id = ?1", params![video_file_id], |row| {
            video_file_from_row(row)
        })
        .optional()?;
    match pair {
        Some(pair) => finish_video_file(pair),
        None => Err(Error::Database(format!("video_file {video_file_id} missing for pending validation"))),
    }
}

fn list_pending_where(conn: &Connection, predicate: &str) -> Result<Vec<PendingValidation>> {
    let sql = format!("SELECT * FROM pending_validations WHERE {predicate}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], pending_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        let (pid, video_file_id, candidates_json, status, selected, auto) = row?;
        let video_file = load_video_file(conn, &video_file_id)?;
        out.push(PendingValidation {
            id: pid,
            video_file,
            candidates: json_to_candidates(&candidates_json)?,
            validation_status: status_from_str(&status)?,
            selected_candidate_id: selected,
            auto_validated: auto,
        });
    }
    Ok(out)
}

pub struct SqliteMovieRepository {
    store: SqliteStore,
}

impl SqliteMovieRepository {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

fn movie_from_row(row: &Row) -> rusqlite::Result<(Movie, String, String, String)> {
    let genres_json: String = row.get("genres_json")?;
    let cast_json: String = row.get("cast_json")?;
    let audio_languages_json: String = row.get("audio_languages_json")?;
    let size_bytes: i64 = row.get("size_bytes")?;

    Ok((
        Movie {
            id: MovieId(row.get("id")?),
            video_file_id: VideoFileId(row.get("video_file_id")?),
            title: row.get("title")?,
            original_title: row.get("original_title")?,
            year: row.get::<_, Option<i64>>("year")?.map(|y| y as u16),
            genres: Vec::new(),
            duration_seconds: row.get::<_, Option<i64>>("duration_seconds")?.map(|d| d as u64),
            overview: row.get("overview")?,
            poster_ref: row.get("poster_ref")?,
            vote_average: row.get("vote_average")?,
            vote_count: row.get::<_, Option<i64>>("vote_count")?.map(|v| v as u32),
            imdb_id: row.get("imdb_id")?,
            imdb_rating: row.get("imdb_rating")?,
            imdb_vote_count: row.get::<_, Option<i64>>("imdb_vote_count")?.map(|v| v as u32),
            director: row.get("director")?,
            cast: Vec::new(),
            video_codec: row.get("video_codec")?,
            resolution_label: row.get("resolution_label")?,
            audio_languages: Vec::new(),
            size_bytes: size_bytes as u64,
        },
        genres_json,
        cast_json,
        audio_languages_json,
    ))
}

fn finish_movie(row: (Movie, String, String, String)) -> Result<Movie> {
    let (mut movie, genres_json, cast_json, audio_languages_json) = row;
    movie.genres = json_to_strings(&genres_json)?;
    movie.cast = json_to_strings(&cast_json)?;
    movie.audio_languages = json_to_strings(&audio_languages_json)?;
    Ok(movie)
}

#[async_trait]
impl MovieRepository for SqliteMovieRepository {
    async fn save(&self, movie: &Movie) -> Result<()> {
        let movie = movie.clone();
        self.store
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO movies (
                        id, video_file_id, title, original_title, year, genres_json,
                        duration_seconds, overview, poster_ref, vote_average, vote_count,
                        imdb_id, imdb_rating, imdb_vote_count, director, cast_json,
                        video_codec, resolution_label, audio_languages_json, size_bytes
                     ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)
                     ON CONFLICT(id) DO UPDATE SET
                        video_file_id = excluded.video_file_id,
                        title = excluded.title,
                        original_title = excluded.original_title,
                        year = excluded.year,
                        genres_json = excluded.genres_json,
                        duration_seconds = excluded.duration_seconds,
                        overview = excluded.overview,
                        poster_ref = excluded.poster_ref,
                        vote_average = excluded.vote_average,
                        vote_count = excluded.vote_count,
                        imdb_id = excluded.imdb_id,
                        imdb_rating = excluded.imdb_rating,
                        imdb_vote_count = excluded.imdb_vote_count,
                        director = excluded.director,
                        cast_json = excluded.cast_json,
                        video_codec = excluded.video_codec,
                        resolution_label = excluded.resolution_label,
                        audio_languages_json = excluded.audio_languages_json,
                        size_bytes = excluded.size_bytes",
                    params![
                        movie.id.0,
                        movie.video_file_id.0,
                        movie.title,
                        movie.original_title,
                        movie.year.map(|y| y as i64),
                        strings_to_json(&movie.genres)?,
                        movie.duration_seconds.map(|d| d as i64),
                        movie.overview,
                        movie.poster_ref,
                        movie.vote_average,
                        movie.vote_count.map(|v| v as i64),
                        movie.imdb_id,
                        movie.imdb_rating,
                        movie.imdb_vote_count.map(|v| v as i64),
                        movie.director,
                        strings_to_json(&movie.cast)?,
                        movie.video_codec,
                        movie.resolution_label,
                        strings_to_json(&movie.audio_languages)?,
                        movie.size_bytes as i64,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn get_by_id(&self, id: &MovieId) -> Result<Option<Movie>> {
        let id = id.0.clone();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row("SELECT * FROM movies WHERE id = ?1", params![id], movie_from_row)
                    .optional()?;
                row.map(finish_movie).transpose()
            })
            .await
    }

    async fn get_by_video_file_id(&self, video_file_id: &VideoFileId) -> Result<Option<Movie>> {
        let video_file_id = video_file_id.0.clone();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT * FROM movies WHERE video_file_id = ?1",
                        params![video_file_id],
                        movie_from_row,
                    )
                    .optional()?;
                row.map(finish_movie).transpose()
            })
            .await
    }

    async fn list_without_ratings(&self, limit: usize) -> Result<Vec<Movie>> {
        self.store
            .with_conn(move |conn| {
                let sql = "SELECT * FROM movies WHERE imdb_id IS NOT NULL AND imdb_rating IS NULL LIMIT ?1";
                let mut stmt = conn.prepare(sql)?;
                let rows = stmt.query_map(params![limit as i64], movie_from_row)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(finish_movie(row?)?);
                }
                Ok(out)
            })
            .await
    }

    async fn list_all(&self) -> Result<Vec<Movie>> {
        self.store
            .with_conn(move |conn| {
                let mut stmt = conn.prepare("SELECT * FROM movies")?;
                let rows = stmt.query_map([], movie_from_row)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(finish_movie(row?)?);
                }
                Ok(out)
            })
            .await
    }
}

pub struct SqliteSeriesRepository {
    store: SqliteStore,
}

impl SqliteSeriesRepository {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

fn series_from_row(row: &Row) -> rusqlite::Result<(Series, String)> {
    let genres_json: String = row.get("genres_json")?;
    Ok((
        Series {
            id: SeriesId(row.get("id")?),
            title: row.get("title")?,
            original_title: row.get("original_title")?,
            year: row.get::<_, Option<i64>>("year")?.map(|y| y as u16),
            genres: Vec::new(),
            overview: row.get("overview")?,
            poster_ref: row.get("poster_ref")?,
            vote_average: row.get("vote_average")?,
            vote_count: row.get::<_, Option<i64>>("vote_count")?.map(|v| v as u32),
            imdb_id: row.get("imdb_id")?,
            imdb_rating: row.get("imdb_rating")?,
            imdb_vote_count: row.get::<_, Option<i64>>("imdb_vote_count")?.map(|v| v as u32),
        },
        genres_json,
    ))
}

fn finish_series(row: (Series, String)) -> Result<Series> {
    let (mut series, genres_json) = row;
    series.genres = json_to_strings(&genres_json)?;
    Ok(series)
}

#[async_trait]
impl SeriesRepository for SqliteSeriesRepository {
    async fn save(&self, series: &Series) -> Result<()> {
        let series = series.clone();
        self.store
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO series (
                        id, title, original_title, year, genres_json, overview, poster_ref,
                        vote_average, vote_count, imdb_id, imdb_rating, imdb_vote_count
                     ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
                     ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        original_title = excluded.original_title,
                        year = excluded.year,
                        genres_json = excluded.genres_json,
                        overview = excluded.overview,
                        poster_ref = excluded.poster_ref,
                        vote_average = excluded.vote_average,
                        vote_count = excluded.vote_count,
                        imdb_id = excluded.imdb_id,
                        imdb_rating = excluded.imdb_rating,
                        imdb_vote_count = excluded.imdb_vote_count",
                    params![
                        series.id.0,
                        series.title,
                        series.original_title,
                        series.year.map(|y| y as i64),
                        strings_to_json(&series.genres)?,
                        series.overview,
                        series.poster_ref,
                        series.vote_average,
                        series.vote_count.map(|v| v as i64),
                        series.imdb_id,
                        series.imdb_rating,
                        series.imdb_vote_count.map(|v| v as i64),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn get_by_id(&self, id: &SeriesId) -> Result<Option<Series>> {
        let id = id.0.clone();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row("SELECT * FROM series WHERE id = ?1", params![id], series_from_row)
                    .optional()?;
                row.map(finish_series).transpose()
            })
            .await
    }

    async fn get_by_title_year(&self, title: &str, year: Option<u16>) -> Result<Option<Series>> {
        let title = title.to_string();
        self.store
            .with_conn(move |conn| {
                let row = match year {
                    Some(y) => conn
                        .query_row(
                            "SELECT * FROM series WHERE title = ?1 AND year = ?2",
                            params![title, y as i64],
                            series_from_row,
                        )
                        .optional()?,
                    None => conn
                        .query_row(
                            "SELECT * FROM series WHERE title = ?1 AND year IS NULL",
                            params![title],
                            series_from_row,
                        )
                        .optional()?,
                };
                row.map(finish_series).transpose()
            })
            .await
    }

    async fn list_all(&self) -> Result<Vec<Series>> {
        self.store
            .with_conn(move |conn| {
                let mut stmt = conn.prepare("SELECT * FROM series")?;
                let rows = stmt.query_map([], series_from_row)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(finish_series(row?)?);
                }
                Ok(out)
            })
            .await
    }
}

pub struct SqliteEpisodeRepository {
    store: SqliteStore,
}

impl SqliteEpisodeRepository {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

fn episode_from_row(row: &Row) -> rusqlite::Result<(Episode, String)> {
    let audio_languages_json: String = row.get("audio_languages_json")?;
    let size_bytes: i64 = row.get("size_bytes")?;
    Ok((
        Episode {
            id: EpisodeId(row.get("id")?),
            video_file_id: VideoFileId(row.get("video_file_id")?),
            series_id: SeriesId(row.get("series_id")?),
            season_number: row.get::<_, i64>("season_number")? as u32,
            episode_number: row.get::<_, i64>("episode_number")? as u32,
            title: row.get("title")?,
            video_codec: row.get("video_codec")?,
            resolution_label: row.get("resolution_label")?,
            audio_languages: Vec::new(),
            size_bytes: size_bytes as u64,
        },
        audio_languages_json,
    ))
}

fn finish_episode(row: (Episode, String)) -> Result<Episode> {
    let (mut episode, audio_languages_json) = row;
    episode.audio_languages = json_to_strings(&audio_languages_json)?;
    Ok(episode)
}

#[async_trait]
impl EpisodeRepository for SqliteEpisodeRepository {
    async fn save(&self, episode: &Episode) -> Result<()> {
        let episode = episode.clone();
        self.store
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO episodes (
                        id, video_file_id, series_id, season_number, episode_number,
                        title, video_codec, resolution_label, audio_languages_json, size_bytes
                     ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
                     ON CONFLICT(id) DO UPDATE SET
                        video_file_id = excluded.video_file_id,
                        series_id = excluded.series_id,
                        season_number = excluded.season_number,
                        episode_number = excluded.episode_number,
                        title = excluded.title,
                        video_codec = excluded.video_codec,
                        resolution_label = excluded.resolution_label,
                        audio_languages_json = excluded.audio_languages_json,
                        size_bytes = excluded.size_bytes",
                    params![
                        episode.id.0,
                        episode.video_file_id.0,
                        episode.series_id.0,
                        episode.season_number as i64,
                        episode.episode_number as i64,
                        episode.title,
                        episode.video_codec,
                        episode.resolution_label,
                        strings_to_json(&episode.audio_languages)?,
                        episode.size_bytes as i64,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn get_by_id(&self, id: &EpisodeId) -> Result<Option<Episode>> {
        let id = id.0.clone();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row("SELECT * FROM episodes WHERE id = ?1", params![id], episode_from_row)
                    .optional()?;
                row.map(finish_episode).transpose()
            })
            .await
    }

    async fn get_by_video_file_id(&self, video_file_id: &VideoFileId) -> Result<Option<Episode>> {
        let video_file_id = video_file_id.0.clone();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT * FROM episodes WHERE video_file_id = ?1",
                        params![video_file_id],
                        episode_from_row,
                    )
                    .optional()?;
                row.map(finish_episode).transpose()
            })
            .await
    }

    async fn list_by_series(&self, series_id: &SeriesId) -> Result<Vec<Episode>> {
        let series_id = series_id.0.clone();
        self.store
            .with_conn(move |conn| {
                let mut stmt = conn.prepare("SELECT * FROM episodes WHERE series_id = ?1")?;
                let rows = stmt.query_map(params![series_id], episode_from_row)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(finish_episode(row?)?);
                }
                Ok(out)
            })
            .await
    }

    async fn get_by_series_season_episode(
        &self,
        series_id: &SeriesId,
        season: u32,
        episode: u32,
    ) -> Result<Option<Episode>> {
        let series_id = series_id.0.clone();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT * FROM episodes WHERE series_id = ?1 AND season_number = ?2 AND episode_number = ?3",
                        params![series_id, season as i64, episode as i64],
                        episode_from_row,
                    )
                    .optional()?;
                row.map(finish_episode).transpose()
            })
            .await
    }
}

pub struct SqliteRatingsRepository {
    store: SqliteStore,
}

impl SqliteRatingsRepository {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RatingsRepository for SqliteRatingsRepository {
    async fn get(&self, imdb_id: &str) -> Result<Option<RatingSnapshot>> {
        let imdb_id = imdb_id.to_string();
        self.store
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT rating, vote_count FROM imdb_ratings WHERE imdb_id = ?1",
                        params![imdb_id],
                        |row| {
                            let rating: f64 = row.get(0)?;
                            let vote_count: i64 = row.get(1)?;
                            Ok(RatingSnapshot { rating: rating as f32, vote_count: vote_count as u32 })
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await
    }

    async fn put(&self, imdb_id: &str, snapshot: RatingSnapshot) -> Result<()> {
        let imdb_id = imdb_id.to_string();
        self.store
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO imdb_ratings (imdb_id, rating, vote_count) VALUES (?1, ?2, ?3)
                     ON CONFLICT(imdb_id) DO UPDATE SET rating = excluded.rating, vote_count = excluded.vote_count",
                    params![imdb_id, snapshot.rating as f64, snapshot.vote_count as i64],
                )?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entities::ValidationStatus;

    fn test_video_file() -> VideoFile {
        VideoFile::new("/downloads/Movies/Inception.2010.mkv".into(), 1_000_000)
    }

    #[tokio::test]
    async fn video_file_round_trips_through_sqlite() {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = SqliteVideoFileRepository::new(store);

        let mut video_file = test_video_file();
        video_file.content_hash = Some("abc123".to_string());
        repo.save(&video_file).await.unwrap();

        let loaded = repo.get_by_id(&video_file.id).await.unwrap().unwrap();
        assert_eq!(loaded.path, video_file.path);
        assert_eq!(loaded.content_hash.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn pending_validation_persists_candidates_and_status() {
        let store = SqliteStore::open_in_memory().unwrap();
        let video_repo = SqliteVideoFileRepository::new(store.clone());
        let pending_repo = SqlitePendingValidationRepository::new(store);

        let video_file = test_video_file();
        video_repo.save(&video_file).await.unwrap();

        let mut pending = PendingValidation::new(video_file.clone());
        pending.candidates = vec![SearchHit {
            id: "123".to_string(),
            title: "Inception".to_string(),
            original_title: None,
            year: Some(2010),
            source: "movies".to_string(),
            score: 91.0,
        }];
        pending.validate("123", true).unwrap();
        pending_repo.save(&pending).await.unwrap();

        let loaded = pending_repo.get_by_id(&pending.id).await.unwrap().unwrap();
        assert_eq!(loaded.validation_status, ValidationStatus::Validated);
        assert_eq!(loaded.candidates.len(), 1);
        assert_eq!(loaded.video_file.path, video_file.path);
    }

    #[tokio::test]
    async fn list_all_pending_includes_validated_orphans() {
        let store = SqliteStore::open_in_memory().unwrap();
        let video_repo = SqliteVideoFileRepository::new(store.clone());
        let pending_repo = SqlitePendingValidationRepository::new(store);

        let video_file = test_video_file();
        video_repo.save(&video_file).await.unwrap();
        let mut pending = PendingValidation::new(video_file);
        pending.candidates = vec![SearchHit {
            id: "1".to_string(),
            title: "X".to_string(),
            original_title: None,
            year: None,
            source: "movies".to_string(),
            score: 100.0,
        }];
        pending.validate("1", true).unwrap();
        pending_repo.save(&pending).await.unwrap();

        assert!(pending_repo.list_pending().await.unwrap().is_empty());
        assert_eq!(pending_repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ratings_cache_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = SqliteRatingsRepository::new(store);

        assert!(repo.get("tt1375666").await.unwrap().is_none());

        let snapshot = RatingSnapshot { rating: 8.8, vote_count: 2_300_000 };
        repo.put("tt1375666", snapshot).await.unwrap();

        let loaded = repo.get("tt1375666").await.unwrap().unwrap();
        assert_eq!(loaded.rating, 8.8);
        assert_eq!(loaded.vote_count, 2_300_000);
    }
}
