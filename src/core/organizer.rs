//! Pure destination-path computation (spec §4.7). Ground-truthed on
//! `original_source`'s `src/services/organizer.py` and
//! `src/utils/constants.py` (`GENRE_HIERARCHY`, `IGNORED_ARTICLES`).
//! English labels (Comédie, Mystère, Divers) are used verbatim as spec.md
//! itself uses them — see SPEC_FULL.md §4.7 resolution notes.

use std::path::PathBuf;

use crate::core::text_normalize::sort_letter;

/// Ordered genre priority list; the first entry present in a movie's genre
/// list wins (spec §4.7).
pub const GENRE_HIERARCHY: &[&str] = &[
    "Animation",
    "Science-Fiction",
    "Fantastique",
    "Horreur",
    "Action",
    "Aventure",
    "Comédie",
    "Drame",
    "Thriller",
    "Crime",
    "Mystère",
    "Romance",
    "Guerre",
    "Histoire",
    "Musique",
    "Documentaire",
    "Famille",
    "Western",
    "Téléfilm",
];

/// Fallback genre folder for movies with no recognized genre.
pub const FALLBACK_GENRE: &str = "Divers";

/// Pick the highest-priority genre present in `genres`, or [`FALLBACK_GENRE`].
pub fn priority_genre(genres: &[String]) -> &str {
    for candidate in GENRE_HIERARCHY {
        if genres.iter().any(|g| g == candidate) {
            return candidate;
        }
    }
    FALLBACK_GENRE
}

/// Movie destination directory: `{storage}/Films/{priority_genre}/{sort_letter}`.
pub fn movie_destination_dir(storage_root: &std::path::Path, genres: &[String], title: &str) -> PathBuf {
    storage_root
        .join("Films")
        .join(priority_genre(genres))
        .join(sort_letter(title).to_string())
}

/// Series destination directory:
/// `{storage}/Séries/{sort_letter}/{title} ({year})/Saison {NN}`. Year is
/// omitted from the folder name when unknown.
pub fn series_destination_dir(
    storage_root: &std::path::Path,
    title: &str,
    year: Option<u16>,
    season_number: u32,
) -> PathBuf {
    let title_folder = match year {
        Some(y) => format!("{title} ({y})"),
        None => title.to_string(),
    };
    storage_root
        .join("Séries")
        .join(sort_letter(title).to_string())
        .join(title_folder)
        .join(format!("Saison {season_number:02}"))
}

/// Symlink-tree mirror of [`movie_destination_dir`]. Exposed separately so
/// the mirror may diverge from storage (spec §4.7: "the Transferer accepts
/// a custom symlink destination").
pub fn movie_symlink_dir(symlink_root: &std::path::Path, genres: &[String], title: &str) -> PathBuf {
    movie_destination_dir(symlink_root, genres, title)
}

/// Symlink-tree mirror of [`series_destination_dir`].
pub fn series_symlink_dir(
    symlink_root: &std::path::Path,
    title: &str,
    year: Option<u16>,
    season_number: u32,
) -> PathBuf {
    series_destination_dir(symlink_root, title, year, season_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn movie_destination_uses_first_matching_genre() {
        let genres = vec!["Drame".to_string(), "Science-Fiction".to_string()];
        let dest = movie_destination_dir(Path::new("/storage"), &genres, "Inception");
        assert_eq!(dest, PathBuf::from("/storage/Films/Science-Fiction/I"));
    }

    #[test]
    fn movie_destination_falls_back_to_divers() {
        let dest = movie_destination_dir(Path::new("/storage"), &[], "Unknown Movie");
        assert_eq!(dest, PathBuf::from("/storage/Films/Divers/U"));
    }

    #[test]
    fn series_destination_includes_zero_padded_season() {
        let dest = series_destination_dir(Path::new("/storage"), "Game of Thrones", Some(2011), 3);
        assert_eq!(
            dest,
            PathBuf::from("/storage/Séries/G/Game of Thrones (2011)/Saison 03")
        );
    }

    #[test]
    fn series_destination_omits_year_when_unknown() {
        let dest = series_destination_dir(Path::new("/storage"), "Mystery Show", None, 1);
        assert_eq!(dest, PathBuf::from("/storage/Séries/M/Mystery Show/Saison 01"));
    }

    #[test]
    fn determinism_same_inputs_same_path() {
        let genres = vec!["Action".to_string()];
        let a = movie_destination_dir(Path::new("/storage"), &genres, "Mad Max");
        let b = movie_destination_dir(Path::new("/storage"), &genres, "Mad Max");
        assert_eq!(a, b);
    }
}
