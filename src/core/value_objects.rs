//! Value types shared across the pipeline: parsed filenames, technical
//! metadata, and catalog search results. Mirrors the split the teacher draws
//! between `models::media` (technical metadata) and `models::plan`
//! (parsed/target info), generalized to the spec's data model (§3).

use serde::{Deserialize, Serialize};

/// Whether a video belongs to the movies or series subtree. Spec §3
/// `ParsedFilename.detected_type` also allows `unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
    Unknown,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
            MediaKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A hint fed to the Filename Parser from the scanner's source subtree; when
/// not `Unknown` it overrides whatever the parser would otherwise guess
/// (spec §4.1: "the source directory is authoritative").
pub type TypeHint = MediaKind;

/// Resolution label bucketed by hard thresholds on width/height (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionLabel {
    #[serde(rename = "4K")]
    UltraHd,
    #[serde(rename = "1080p")]
    FullHd,
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "SD")]
    Sd,
}

impl std::fmt::Display for ResolutionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResolutionLabel::UltraHd => "4K",
            ResolutionLabel::FullHd => "1080p",
            ResolutionLabel::Hd => "720p",
            ResolutionLabel::Sd => "SD",
        };
        write!(f, "{s}")
    }
}

impl ResolutionLabel {
    /// Bucket a width/height pair per the table in spec §4.2.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width >= 3800 {
            ResolutionLabel::UltraHd
        } else if width >= 1900 || height >= 1000 {
            ResolutionLabel::FullHd
        } else if width >= 1260 || height >= 720 {
            ResolutionLabel::Hd
        } else {
            ResolutionLabel::Sd
        }
    }
}

/// Technical metadata for a video file, produced by the Media Info Extractor
/// (spec §3 `MediaInfo`, §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub resolution_label: Option<String>,
    /// Primary video codec, normalized to a canonical token (e.g. `x265`).
    pub video_codec: Option<String>,
    /// Ordered list of audio codec tokens.
    pub audio_codecs: Vec<String>,
    /// Channel layout label of the primary audio stream (e.g. `"5.1"`),
    /// mapped from its channel count (spec §4.2).
    pub audio_channel_layout: Option<String>,
    /// ISO-639-1 lowercase audio language codes; set semantics, order preserved.
    pub audio_languages: Vec<String>,
    /// Duration in whole seconds (extractor converts ms sources to seconds).
    pub duration_seconds: Option<u64>,
}

impl MediaInfo {
    /// Push a language if not already present, preserving insertion order
    /// (spec §3: "set semantics apply to audio_languages ... order is preserved").
    pub fn push_language(&mut self, lang: String) {
        if !self.audio_languages.contains(&lang) {
            self.audio_languages.push(lang);
        }
    }
}

/// Output of the Filename Parser (spec §3 `ParsedFilename`, §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFilename {
    pub title: String,
    pub year: Option<u16>,
    pub detected_type: MediaKind,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Last episode number for multi-episode files (`S01E01E02`).
    pub episode_end: Option<u32>,
    pub episode_title: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub resolution: Option<String>,
    pub source: Option<String>,
    pub release_group: Option<String>,
    /// Uppercase two-letter ISO-639-1 language token, when present.
    pub language: Option<String>,
}

impl ParsedFilename {
    /// A minimal `ParsedFilename` with only the title populated — the
    /// parser's fallback when no other token matches (spec §4.1: "title
    /// always populated, fallback: filename without extension").
    pub fn title_only(title: String, detected_type: MediaKind) -> Self {
        Self {
            title,
            year: None,
            detected_type,
            season: None,
            episode: None,
            episode_end: None,
            episode_title: None,
            video_codec: None,
            audio_codec: None,
            resolution: None,
            source: None,
            release_group: None,
            language: None,
        }
    }
}

/// A catalog hit, scored 0-100 by the Matcher (spec §3 `SearchHit`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
    /// `"movies"` or `"series"` — the catalog source tag.
    pub source: String,
    pub score: f64,
}

/// Full catalog details for a validated candidate (spec §3 `MediaDetails`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDetails {
    pub id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
    /// Ordered, deduplicated.
    pub genres: Vec<String>,
    pub duration_seconds: Option<u64>,
    pub overview: Option<String>,
    pub director: Option<String>,
    /// Ordered cast list.
    pub cast: Vec<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
}
