//! Pure canonical-filename generation (spec §4.8). Ground-truthed on
//! `original_source`'s `src/services/renamer.py`
//! (`sanitize_for_filesystem`, `format_language_code`, `_build_tech_suffix`,
//! `generate_movie_filename`, `generate_series_filename`). The Python
//! original delegates illegal-character stripping to `pathvalidate`; no
//! crate in this stack provides that, so it is reimplemented inline here
//! (SPEC_FULL.md §4.8 resolution notes).

use unicode_normalization::UnicodeNormalization;

use crate::core::text_normalize::expand_ligatures;

/// Maximum length of the filename stem (spec §4.8).
pub const MAX_FILENAME_LENGTH: usize = 200;

const SPECIAL_CHARS_TO_DASH: &[char] = &[':', '/', '\\', '*', '"', '<', '>', '|'];
const ELLIPSIS_PLACEHOLDER: &str = "\u{0001}";

/// Characters illegal (or awkward) across common filesystems beyond the
/// ones mapped to `-`/`…` above; stripped outright.
const ILLEGAL_CHARS: &[char] = &['\0', '\n', '\r', '\t'];

/// NFKC-normalize, expand ligatures, replace `: / \ * " < > |` with `-`,
/// replace `?` with a single ellipsis code point, strip remaining illegal
/// characters, then truncate the stem to [`MAX_FILENAME_LENGTH`]
/// characters. Idempotent: applying this twice equals applying it once.
pub fn sanitize_for_filesystem(input: &str) -> String {
    let nfkc: String = input.nfkc().collect();
    let ligatured = expand_ligatures(&nfkc);

    let mut mapped = String::with_capacity(ligatured.len());
    for ch in ligatured.chars() {
        if SPECIAL_CHARS_TO_DASH.contains(&ch) {
            mapped.push('-');
        } else if ch == '?' {
            mapped.push_str(ELLIPSIS_PLACEHOLDER);
        } else if ILLEGAL_CHARS.contains(&ch) {
            // drop
        } else {
            mapped.push(ch);
        }
    }

    let restored = mapped.replace(ELLIPSIS_PLACEHOLDER, "…");

    let truncated: String = restored.chars().take(MAX_FILENAME_LENGTH).collect();
    truncated.trim_end().to_string()
}

/// Format a set of ISO-639-1 audio language codes per spec §4.8: empty →
/// empty string, exactly one → its uppercase code, two or more → `MULTi`.
pub fn format_language_code(languages: &[String]) -> String {
    match languages.len() {
        0 => String::new(),
        1 => languages[0].to_uppercase(),
        _ => "MULTi".to_string(),
    }
}

/// Join non-empty technical tokens with single spaces, dropping any that
/// are empty so missing fields never leave a double space behind (spec
/// §4.8: "missing fields and their separators drop cleanly").
fn tech_suffix(language: &str, codec: Option<&str>, resolution: Option<&str>) -> String {
    [Some(language).filter(|s| !s.is_empty()), codec, resolution]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Movie filename: `{title} ({year}) {LANG} {CODEC} {RES}{ext}` (spec §4.8).
pub fn generate_movie_filename(
    title: &str,
    year: Option<u16>,
    languages: &[String],
    codec: Option<&str>,
    resolution: Option<&str>,
    ext: &str,
) -> String {
    let lang = format_language_code(languages);
    let mut parts = vec![title.to_string()];
    if let Some(y) = year {
        parts.push(format!("({y})"));
    }
    let suffix = tech_suffix(&lang, codec, resolution);
    if !suffix.is_empty() {
        parts.push(suffix);
    }
    let stem = parts.join(" ");
    let sanitized = sanitize_for_filesystem(&stem);
    format!("{sanitized}{ext}")
}

/// Series episode filename:
/// `{title} ({year}) - S{NN}E{NN} - {episode_title} - {LANG} {CODEC} {RES}{ext}`
/// (spec §4.8).
#[allow(clippy::too_many_arguments)]
pub fn generate_episode_filename(
    title: &str,
    year: Option<u16>,
    season: u32,
    episode: u32,
    episode_title: Option<&str>,
    languages: &[String],
    codec: Option<&str>,
    resolution: Option<&str>,
    ext: &str,
) -> String {
    let lang = format_language_code(languages);
    let mut parts = vec![title.to_string()];
    if let Some(y) = year {
        parts.push(format!("({y})"));
    }

    let mut stem = parts.join(" ");
    stem.push_str(&format!(" - S{season:02}E{episode:02}"));

    if let Some(et) = episode_title.filter(|s| !s.is_empty()) {
        stem.push_str(&format!(" - {et}"));
    }

    let suffix = tech_suffix(&lang, codec, resolution);
    if !suffix.is_empty() {
        stem.push_str(&format!(" - {suffix}"));
    }

    let sanitized = sanitize_for_filesystem(&stem);
    format!("{sanitized}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_is_idempotent() {
        let input = "Amélie: Le Fabuleux Destin? <Part 1>";
        let once = sanitize_for_filesystem(input);
        let twice = sanitize_for_filesystem(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn sanitize_replaces_special_chars_and_question_mark() {
        let sanitized = sanitize_for_filesystem("What? A Movie: Part One");
        assert!(sanitized.contains('…'));
        assert!(!sanitized.contains(':'));
    }

    #[test]
    fn language_code_formatting() {
        assert_eq!(format_language_code(&[]), "");
        assert_eq!(format_language_code(&["en".to_string()]), "EN");
        assert_eq!(
            format_language_code(&["en".to_string(), "fr".to_string()]),
            "MULTi"
        );
    }

    #[test]
    fn movie_filename_matches_happy_path_scenario() {
        let name = generate_movie_filename(
            "Inception",
            Some(2010),
            &["en".to_string()],
            Some("x264"),
            Some("1080p"),
            ".mkv",
        );
        assert_eq!(name, "Inception (2010) EN x264 1080p.mkv");
    }

    #[test]
    fn episode_filename_drops_missing_fields_cleanly() {
        let name = generate_episode_filename(
            "Game of Thrones",
            Some(2011),
            3,
            9,
            None,
            &["en".to_string(), "fr".to_string()],
            Some("x265"),
            Some("1080p"),
            ".mkv",
        );
        assert_eq!(name, "Game of Thrones (2011) - S03E09 - MULTi x265 1080p.mkv");
        assert!(!name.contains("  "));
    }
}
