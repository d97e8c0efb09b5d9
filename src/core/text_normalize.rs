//! Text normalization shared by the Organizer, Renamer, Matcher and
//! Subdivision Algorithm: accent stripping, ligature expansion, article
//! stripping, casefolding. Ground-truthed on `original_source`'s
//! `src/utils/helpers.py` (`normalize_accents`, `strip_article`,
//! `_expand_ligatures`) and `src/services/renamer.py` (`_normalize_ligatures`).

use unicode_normalization::UnicodeNormalization;

/// Articles stripped from a title before computing a sort letter/key
/// (spec §4.7), case-insensitive, apostrophe form stripped tight (`l'`).
pub const IGNORED_ARTICLES: &[&str] = &[
    "le", "la", "les", "l'", "un", "une", "des", "the", "a", "an", "der", "die", "das", "ein",
    "eine", "el", "los", "las",
];

/// Ligature expansions applied before filesystem sanitization and before
/// title-similarity scoring (spec §4.8).
const LIGATURES: &[(char, &str)] = &[
    ('œ', "oe"),
    ('Œ', "OE"),
    ('æ', "ae"),
    ('Æ', "AE"),
    ('ﬁ', "fi"),
    ('ﬂ', "fl"),
];

/// Expand known ligatures into their multi-character equivalents.
pub fn expand_ligatures(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if let Some((_, repl)) = LIGATURES.iter().find(|(l, _)| *l == ch) {
            out.push_str(repl);
        } else {
            out.push(ch);
        }
    }
    out
}

/// NFD-decompose and drop combining marks (category `Mn`), collapsing
/// accented letters to their bare ASCII form (`é` → `e`).
pub fn strip_accents(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
    )
}

/// Strip a single leading article token from a title, if present, returning
/// the remainder trimmed of leading whitespace. Comparison is
/// case-insensitive and accent-normalized; an apostrophe-form article
/// (`l'Odyssée`) is stripped without a following space.
pub fn strip_article(title: &str) -> String {
    let trimmed = title.trim_start();
    let folded = strip_accents(trimmed).to_lowercase();

    for article in IGNORED_ARTICLES {
        if let Some(stripped) = article.strip_suffix('\'') {
            let prefix = format!("{stripped}'");
            if folded.starts_with(&prefix) {
                return trimmed[prefix.len()..].to_string();
            }
        } else {
            let prefix_with_space = format!("{article} ");
            if folded.starts_with(&prefix_with_space) {
                return trimmed[prefix_with_space.len()..].trim_start().to_string();
            }
        }
    }
    trimmed.to_string()
}

/// The uppercase first alphabetic character of a title after article
/// stripping and accent normalization; `#` when there is no alphabetic
/// character (spec §4.7 / GLOSSARY "Sort letter").
pub fn sort_letter(title: &str) -> char {
    let stripped = strip_article(title);
    let folded = strip_accents(&stripped);
    folded
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('#')
}

/// A two-character uppercase sort key used by the Subdivision Algorithm
/// (GLOSSARY "Sort key", spec §4.12 step 1): strip article, accent-strip,
/// keep letters only, uppercase, take the first two, pad with `A`.
pub fn sort_key(title: &str) -> String {
    let stripped = strip_article(title);
    let folded = strip_accents(&stripped);
    let letters: String = folded
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .take(2)
        .collect();

    match letters.len() {
        0 => "AA".to_string(),
        1 => format!("{letters}A"),
        _ => letters,
    }
}

/// Casefold + collapse whitespace + expand ligatures, used before any
/// title-similarity comparison (Matcher) and filename sanitization
/// (Renamer). Mirrors the teacher's `normalize_title` in
/// `generators/folder.rs`, extended with ligature expansion per spec §4.8.
pub fn normalize_for_compare(input: &str) -> String {
    let expanded = expand_ligatures(input);
    let folded = strip_accents(&expanded).to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_article() {
        assert_eq!(strip_article("The Matrix"), "Matrix");
        assert_eq!(strip_article("L'Odyssée"), "Odyssée");
        assert_eq!(strip_article("Les Misérables"), "Misérables");
        assert_eq!(strip_article("Inception"), "Inception");
    }

    #[test]
    fn sort_letter_normalizes_accents_and_articles() {
        assert_eq!(sort_letter("Les Évadés"), 'E');
        assert_eq!(sort_letter("The Matrix"), 'M');
        assert_eq!(sort_letter("12 Monkeys"), '#');
    }

    #[test]
    fn sort_key_pads_short_titles() {
        assert_eq!(sort_key("A"), "AA");
        assert_eq!(sort_key("The X"), "XA");
        assert_eq!(sort_key("Crossed"), "CR");
    }

    #[test]
    fn ligature_expansion() {
        assert_eq!(expand_ligatures("Cœur"), "Coeur");
    }
}
