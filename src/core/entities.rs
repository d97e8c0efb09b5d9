//! Persisted entities (spec §3). IDs are UUID-v4 strings wrapped in newtypes
//! so a `VideoFileId` and a `PendingValidationId` are never interchangeable
//! by accident — the teacher's `models::plan::PlanItem` uses bare `String`
//! ids; this crate tightens that because spec §9 explicitly calls out the
//! PendingValidation/VideoFile relationship as id-based, not owning.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::value_objects::{MediaInfo, SearchHit};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(VideoFileId);
id_newtype!(PendingValidationId);
id_newtype!(MovieId);
id_newtype!(SeriesId);
id_newtype!(EpisodeId);

/// A concrete file on disk, once organized (spec §3 `VideoFile`).
///
/// Invariant: `content_hash`, once computed, is stable for a given byte
/// sequence; at most one `VideoFile` exists per `content_hash`; if
/// `symlink_path` is set it resolves to `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoFile {
    pub id: VideoFileId,
    pub path: PathBuf,
    pub symlink_path: Option<PathBuf>,
    pub filename: String,
    pub size_bytes: u64,
    pub content_hash: Option<String>,
    pub media_info: Option<MediaInfo>,
}

impl VideoFile {
    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id: VideoFileId::new(),
            path,
            symlink_path: None,
            filename,
            size_bytes,
            content_hash: None,
            media_info: None,
        }
    }
}

/// A validated movie (spec §3 `Movie`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub video_file_id: VideoFileId,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
    pub genres: Vec<String>,
    pub duration_seconds: Option<u64>,
    pub overview: Option<String>,
    pub poster_ref: Option<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub imdb_id: Option<String>,
    pub imdb_rating: Option<f32>,
    pub imdb_vote_count: Option<u32>,
    pub director: Option<String>,
    pub cast: Vec<String>,
    pub video_codec: Option<String>,
    pub resolution_label: Option<String>,
    pub audio_languages: Vec<String>,
    pub size_bytes: u64,
}

/// A validated series (spec §3 `Series`) — mirrors `Movie` without
/// episode-specific fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: SeriesId,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
    pub genres: Vec<String>,
    pub overview: Option<String>,
    pub poster_ref: Option<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub imdb_id: Option<String>,
    pub imdb_rating: Option<f32>,
    pub imdb_vote_count: Option<u32>,
}

/// A validated episode (spec §3 `Episode`).
///
/// Invariant: `(series_id, season_number, episode_number)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub video_file_id: VideoFileId,
    pub series_id: SeriesId,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: Option<String>,
    pub video_codec: Option<String>,
    pub resolution_label: Option<String>,
    pub audio_languages: Vec<String>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Pending,
    Validated,
    Rejected,
}

/// The hardest entity in the data model (spec §3 `PendingValidation`).
///
/// Invariants: at most one `PendingValidation` per `VideoFile`; when
/// `validation_status == Validated`, `selected_candidate_id` is `Some` and
/// refers to an entry that existed in `candidates` at validation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingValidation {
    pub id: PendingValidationId,
    pub video_file: VideoFile,
    /// Score-descending.
    pub candidates: Vec<SearchHit>,
    pub validation_status: ValidationStatus,
    pub selected_candidate_id: Option<String>,
    pub auto_validated: bool,
}

impl PendingValidation {
    pub fn new(video_file: VideoFile) -> Self {
        Self {
            id: PendingValidationId::new(),
            video_file,
            candidates: Vec::new(),
            validation_status: ValidationStatus::Pending,
            selected_candidate_id: None,
            auto_validated: false,
        }
    }

    /// Transition to `Validated`, checking the id-was-a-candidate invariant.
    pub fn validate(&mut self, candidate_id: &str, auto: bool) -> crate::error::Result<()> {
        if !self.candidates.iter().any(|c| c.id == candidate_id) {
            return Err(crate::error::Error::CandidateNotFound(candidate_id.to_string()));
        }
        self.validation_status = ValidationStatus::Validated;
        self.selected_candidate_id = Some(candidate_id.to_string());
        self.auto_validated = auto;
        Ok(())
    }

    /// Inverse of [`Self::validate`] — used by the cascade's "send back" path.
    pub fn send_back(&mut self) {
        self.validation_status = ValidationStatus::Pending;
        self.selected_candidate_id = None;
        self.auto_validated = false;
    }
}

/// A computed split of an overfull directory (spec §3 `SubdivisionPlan`,
/// §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubdivisionPlan {
    pub parent_dir: PathBuf,
    pub current_count: usize,
    pub max_allowed: usize,
    /// Ordered `(start_key, end_key)` ranges, two uppercase letters each.
    pub ranges: Vec<(String, String)>,
    pub items_to_move: Vec<(PathBuf, PathBuf)>,
    /// Items whose destination lies in a sibling directory.
    pub out_of_range_items: Vec<(PathBuf, PathBuf)>,
}
