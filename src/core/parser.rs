//! Deterministic filename parser (spec §4.1). The teacher's own
//! `core::parser` calls an LLM (Ollama) for this, which is unsuitable for a
//! pure, offline, testable parser. This crate instead grounds the parser on
//! `examples/drmckay-homeflix/media-identifier`'s regex/`lazy_static`
//! pattern-table approach (`patterns.rs`): a priority-ordered set of regexes
//! for season/episode, year, resolution, source, codec and language tokens.

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::value_objects::{MediaKind, ParsedFilename};

lazy_static! {
    static ref SEASON_EPISODE: Regex =
        Regex::new(r"(?i)\bS(\d{1,2})E(\d{1,3})(?:E(\d{1,3}))?\b").unwrap();
    static ref SEASON_EPISODE_ALT: Regex = Regex::new(r"(?i)\b(\d{1,2})x(\d{1,3})\b").unwrap();
    static ref SEASON_ONLY: Regex = Regex::new(r"(?i)\bSeason\.?(\d{1,2})\b").unwrap();
    static ref YEAR: Regex = Regex::new(r"\b(19[4-9]\d|20[0-3]\d)\b").unwrap();
    static ref RESOLUTION: Vec<(&'static str, Regex)> = vec![
        ("4K", Regex::new(r"(?i)\b(2160p|4K|UHD)\b").unwrap()),
        ("1080p", Regex::new(r"(?i)\b1080[pi]\b").unwrap()),
        ("720p", Regex::new(r"(?i)\b720p\b").unwrap()),
        ("480p", Regex::new(r"(?i)\b480p\b").unwrap()),
    ];
    static ref SOURCE: Vec<(&'static str, Regex)> = vec![
        ("BluRay", Regex::new(r"(?i)\b(BluRay|Blu-Ray|BDRip|BRRip|BD)\b").unwrap()),
        ("WEB-DL", Regex::new(r"(?i)\bWEB-?DL\b").unwrap()),
        ("WEBRip", Regex::new(r"(?i)\bWEBRip\b").unwrap()),
        ("HDTV", Regex::new(r"(?i)\bHDTV\b").unwrap()),
        ("DVDRip", Regex::new(r"(?i)\b(DVDRip|DVD)\b").unwrap()),
    ];
    static ref CODEC: Vec<(&'static str, Regex)> = vec![
        ("x265", Regex::new(r"(?i)\b(HEVC|[Hx]\.?265)\b").unwrap()),
        ("x264", Regex::new(r"(?i)\b[Hx]\.?264\b").unwrap()),
        ("AV1", Regex::new(r"(?i)\bAV1\b").unwrap()),
        ("XviD", Regex::new(r"(?i)\bXviD\b").unwrap()),
    ];
    static ref AUDIO_CODEC: Vec<(&'static str, Regex)> = vec![
        ("DTS-HD", Regex::new(r"(?i)\bDTS-?HD\b").unwrap()),
        ("DTS", Regex::new(r"(?i)\bDTS\b").unwrap()),
        ("TrueHD", Regex::new(r"(?i)\bTrueHD\b").unwrap()),
        ("AC3", Regex::new(r"(?i)\b(AC-?3)\b").unwrap()),
        ("AAC", Regex::new(r"(?i)\bAAC\b").unwrap()),
        ("FLAC", Regex::new(r"(?i)\bFLAC\b").unwrap()),
    ];
    static ref LANGUAGE: Vec<(&'static str, Regex)> = vec![
        ("EN", Regex::new(r"(?i)\b(ENG|English)\b").unwrap()),
        ("FR", Regex::new(r"(?i)\b(FRE|FRA|French|VF|VFF|VFQ)\b").unwrap()),
        ("DE", Regex::new(r"(?i)\b(GER|German)\b").unwrap()),
        ("ES", Regex::new(r"(?i)\b(SPA|ESP|Spanish)\b").unwrap()),
        ("IT", Regex::new(r"(?i)\b(ITA|Italian)\b").unwrap()),
        ("JA", Regex::new(r"(?i)\b(JPN|JAP|Japanese)\b").unwrap()),
    ];
    static ref RELEASE_GROUP: Regex = Regex::new(r"-([A-Za-z0-9]+)(?:\.[a-z]{2,4})?$").unwrap();
    static ref SEPARATOR: Regex = Regex::new(r"[._]+").unwrap();
}

/// What the filename's own tokens suggest, ignoring any source-directory
/// hint — used by the Scanner to flag `corrected_location` (spec §4.3).
pub fn natural_type(filename: &str) -> MediaKind {
    if SEASON_EPISODE.is_match(filename)
        || SEASON_EPISODE_ALT.is_match(filename)
        || SEASON_ONLY.is_match(filename)
    {
        MediaKind::Series
    } else {
        MediaKind::Movie
    }
}

/// Parse a filename into title/year/season/episode/technical tokens (spec
/// §4.1). `hint`, when not `Unknown`, overrides the parser's own guess of
/// `detected_type` — the source directory is authoritative.
pub fn parse_filename(filename: &str, hint: MediaKind) -> ParsedFilename {
    let stem = strip_extension(filename);

    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut season = None;
    let mut episode = None;
    let mut episode_end = None;

    if let Some(cap) = SEASON_EPISODE.captures(&stem) {
        let m = cap.get(0).unwrap();
        spans.push((m.start(), m.end()));
        season = cap.get(1).and_then(|s| s.as_str().parse().ok());
        episode = cap.get(2).and_then(|s| s.as_str().parse().ok());
        episode_end = cap.get(3).and_then(|s| s.as_str().parse().ok());
    } else if let Some(cap) = SEASON_EPISODE_ALT.captures(&stem) {
        let m = cap.get(0).unwrap();
        spans.push((m.start(), m.end()));
        season = cap.get(1).and_then(|s| s.as_str().parse().ok());
        episode = cap.get(2).and_then(|s| s.as_str().parse().ok());
    } else if let Some(cap) = SEASON_ONLY.captures(&stem) {
        let m = cap.get(0).unwrap();
        spans.push((m.start(), m.end()));
        season = cap.get(1).and_then(|s| s.as_str().parse().ok());
    }

    let mut year = None;
    for cap in YEAR.captures_iter(&stem) {
        let m = cap.get(0).unwrap();
        // A year embedded inside the SxxExx span is not a year token.
        if spans.iter().any(|(s, e)| m.start() >= *s && m.end() <= *e) {
            continue;
        }
        year = m.as_str().parse().ok();
        spans.push((m.start(), m.end()));
        break;
    }

    let resolution = first_match(&stem, &RESOLUTION, &mut spans);
    let source = first_match(&stem, &SOURCE, &mut spans);
    let video_codec = first_match(&stem, &CODEC, &mut spans);
    let audio_codec = first_match(&stem, &AUDIO_CODEC, &mut spans);
    let language = first_match(&stem, &LANGUAGE, &mut spans);

    let release_group = RELEASE_GROUP.captures(&stem).and_then(|cap| {
        let g = cap.get(1)?.as_str();
        (!is_noise_group(g)).then(|| g.to_string())
    });
    if let (Some(cap), Some(_)) = (RELEASE_GROUP.captures(&stem), release_group.as_ref()) {
        let m = cap.get(0).unwrap();
        spans.push((m.start(), m.end()));
    }

    let title = extract_title(&stem, &spans);

    let detected_type = if hint != MediaKind::Unknown {
        hint
    } else if season.is_some() {
        MediaKind::Series
    } else {
        MediaKind::Movie
    };

    ParsedFilename {
        title,
        year,
        detected_type,
        season,
        episode,
        episode_end,
        episode_title: None,
        video_codec,
        audio_codec,
        resolution,
        source,
        release_group,
        language,
    }
}

fn first_match(input: &str, table: &[(&'static str, Regex)], spans: &mut Vec<(usize, usize)>) -> Option<String> {
    for (normalized, regex) in table {
        if let Some(m) = regex.find(input) {
            spans.push((m.start(), m.end()));
            return Some((*normalized).to_string());
        }
    }
    None
}

fn is_noise_group(group: &str) -> bool {
    matches!(
        group.to_uppercase().as_str(),
        "MKV" | "AVI" | "MP4" | "SRT" | "NFO" | "SUB" | "SUBS"
    )
}

/// Everything before the earliest matched token span is the title; cleanup
/// separators and trailing punctuation (spec §4.1: title falls back to the
/// filename without extension when nothing else matches).
fn extract_title(stem: &str, spans: &[(usize, usize)]) -> String {
    let cut = spans.iter().map(|(s, _)| *s).min().unwrap_or(stem.len());
    let raw_title = &stem[..cut];
    let spaced = SEPARATOR.replace_all(raw_title, " ");
    let trimmed = spaced.trim().trim_end_matches('-').trim();
    if trimmed.is_empty() {
        SEPARATOR.replace_all(stem, " ").trim().to_string()
    } else {
        trimmed.to_string()
    }
}

fn strip_extension(filename: &str) -> String {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename[..idx].to_string(),
        _ => filename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_happy_movie_scenario() {
        let parsed = parse_filename("Inception.2010.1080p.BluRay.x264.mkv", MediaKind::Movie);
        assert_eq!(parsed.title, "Inception");
        assert_eq!(parsed.year, Some(2010));
        assert_eq!(parsed.resolution.as_deref(), Some("1080p"));
        assert_eq!(parsed.video_codec.as_deref(), Some("x264"));
        assert_eq!(parsed.detected_type, MediaKind::Movie);
    }

    #[test]
    fn parses_double_episode_scenario() {
        let parsed = parse_filename("Game.of.Thrones.S03E09E10.1080p.mkv", MediaKind::Series);
        assert_eq!(parsed.title, "Game of Thrones");
        assert_eq!(parsed.season, Some(3));
        assert_eq!(parsed.episode, Some(9));
        assert_eq!(parsed.episode_end, Some(10));
    }

    #[test]
    fn hint_overrides_natural_type() {
        let parsed = parse_filename("Mystery.Movie.2020.mkv", MediaKind::Series);
        assert_eq!(parsed.detected_type, MediaKind::Series);
    }

    #[test]
    fn natural_type_detects_series_markers() {
        assert_eq!(natural_type("Show.S01E02.mkv"), MediaKind::Series);
        assert_eq!(natural_type("Movie.2020.mkv"), MediaKind::Movie);
    }

    #[test]
    fn title_falls_back_to_filename_without_extension() {
        let parsed = parse_filename("justatitle.mkv", MediaKind::Unknown);
        assert_eq!(parsed.title, "justatitle");
    }
}
