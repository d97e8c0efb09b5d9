//! Enumerates the downloads subtrees (spec §4.3). Ground-truthed on the
//! teacher's `core::scanner` (`VIDEO_EXTENSIONS`, `is_sample_path`,
//! `scan_directory` shape) and `original_source`'s
//! `src/utils/constants.py` (`VIDEO_EXTENSIONS`, `IGNORED_PATTERNS`) /
//! `src/services/scanner.py` (`ScanResult`, per-subtree type hinting).

use std::path::{Path, PathBuf};

use crate::core::entities::VideoFile;
use crate::core::fs_port::Filesystem;
use crate::core::parser;
use crate::core::value_objects::{MediaInfo, MediaKind, ParsedFilename};
use crate::error::Result;
use crate::services::ffprobe::MediaProbe;

/// Recognized video container extensions (no leading dot), lowercase.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts", "vob",
];

/// Substrings that disqualify an otherwise-eligible file name (spec §4.3),
/// matched case-insensitively against the whole filename.
pub const IGNORED_SUBSTRINGS: &[&str] = &["sample", "trailer", "preview", "extras", "bonus"];

fn has_ignored_substring(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IGNORED_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Which managed subtree a scan record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSubtree {
    Movies,
    Series,
}

impl SourceSubtree {
    fn type_hint(self) -> MediaKind {
        match self {
            SourceSubtree::Movies => MediaKind::Movie,
            SourceSubtree::Series => MediaKind::Series,
        }
    }
}

/// One accepted file, with its parsed and technical metadata (spec §4.3).
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub video_file: VideoFile,
    pub parsed: ParsedFilename,
    pub media_info: Option<MediaInfo>,
    pub source: SourceSubtree,
    /// True iff the parser, even though told the subtree's hint, would
    /// naturally have produced the *other* type (series markers found in
    /// the movies tree, or vice versa) — signals a later corrective move.
    pub corrected_location: bool,
}

/// Full scan result: accepted records plus files under the configured
/// minimum size, kept separate so the UI may opt them in per group (spec
/// §4.3, §4.14 step 2).
#[derive(Debug, Default)]
pub struct ScanResult {
    pub accepted: Vec<ScanRecord>,
    pub below_minimum: Vec<PathBuf>,
}

/// Scan both managed download subtrees.
pub async fn scan_downloads(
    fs: &dyn Filesystem,
    probe: &dyn MediaProbe,
    movies_dir: &Path,
    series_dir: &Path,
    min_file_size_bytes: u64,
) -> Result<ScanResult> {
    let mut result = ScanResult::default();
    scan_subtree(fs, probe, movies_dir, SourceSubtree::Movies, min_file_size_bytes, &mut result).await?;
    scan_subtree(fs, probe, series_dir, SourceSubtree::Series, min_file_size_bytes, &mut result).await?;
    Ok(result)
}

async fn scan_subtree(
    fs: &dyn Filesystem,
    probe: &dyn MediaProbe,
    root: &Path,
    source: SourceSubtree,
    min_file_size_bytes: u64,
    result: &mut ScanResult,
) -> Result<()> {
    if !fs.exists(root).await {
        return Ok(());
    }

    for entry in fs.list_video_files(root, VIDEO_EXTENSIONS).await? {
        let filename = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if has_ignored_substring(&filename) {
            continue;
        }
        if fs.is_symlink(&entry.path).await {
            continue;
        }
        if entry.size_bytes < min_file_size_bytes {
            result.below_minimum.push(entry.path);
            continue;
        }

        let hint = source.type_hint();
        let parsed = parser::parse_filename(&filename, hint);
        let corrected_location = parser::natural_type(&filename) != hint;
        let media_info = probe.probe(&entry.path).await.ok().flatten();

        result.accepted.push(ScanRecord {
            video_file: VideoFile::new(entry.path, entry.size_bytes),
            parsed,
            media_info,
            source,
            corrected_location,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_substrings_match_case_insensitively() {
        assert!(has_ignored_substring("Movie.SAMPLE.mkv"));
        assert!(!has_ignored_substring("Movie.mkv"));
    }
}
