//! Media Info Extractor (spec §4.4). Ground-truthed on the teacher's
//! `services::ffprobe` (spawning `ffprobe -print_format json
//! -show_format -show_streams` and parsing the stream table) and
//! `original_source`'s `src/adapters/parsing/mediainfo_extractor.py`
//! (one video stream + all audio streams, tags.language per audio
//! stream, duration from the format section), adapted to return the
//! crate's [`MediaInfo`] value object through the async [`MediaProbe`]
//! port instead of the teacher's `VideoMetadata` model.

use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::value_objects::{MediaInfo, ResolutionLabel};
use crate::error::{Error, Result};

/// Normalizes a raw codec name to a canonical token by lowercase substring
/// match against a fixed table (spec §4.2).
fn normalize_video_codec(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("hevc") || lower.contains("h.265") || lower.contains("h265") || lower.contains("x265") {
        "x265".to_string()
    } else if lower.contains("avc") || lower.contains("h.264") || lower.contains("h264") || lower.contains("x264") {
        "x264".to_string()
    } else if lower.contains("av1") {
        "AV1".to_string()
    } else if lower.contains("xvid") {
        "XviD".to_string()
    } else if lower.contains("mpeg2") || lower.contains("mpeg-2") {
        "MPEG2".to_string()
    } else if lower.contains("vp9") {
        "VP9".to_string()
    } else {
        raw.to_string()
    }
}

/// Normalizes a raw audio codec name to a canonical token (spec §4.2).
fn normalize_audio_codec(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("eac3") || lower.contains("e-ac-3") {
        "EAC3".to_string()
    } else if lower.contains("ac-3") || lower.contains("ac3") {
        "AC3".to_string()
    } else if lower.contains("dts-hd") || lower.contains("dtshd") {
        "DTS-HD".to_string()
    } else if lower.contains("dts") {
        "DTS".to_string()
    } else if lower.contains("truehd") {
        "TrueHD".to_string()
    } else if lower.contains("aac") {
        "AAC".to_string()
    } else if lower.contains("flac") {
        "FLAC".to_string()
    } else {
        raw.to_string()
    }
}

/// Maps a channel count to a canonical layout label (spec §4.2).
fn channel_layout_label(channels: u32) -> String {
    match channels {
        1 => "1.0".to_string(),
        2 => "2.0".to_string(),
        3 => "2.1".to_string(),
        6 => "5.1".to_string(),
        7 => "6.1".to_string(),
        8 => "7.1".to_string(),
        n => format!("{n}.0"),
    }
}

/// Probes a video file for technical metadata (spec §4.4). Implementations
/// may shell out to an external tool; a failed or missing probe is not
/// fatal to a scan (the scanner stores `None` and proceeds).
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<Option<MediaInfo>>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    channels: Option<u32>,
    #[serde(default)]
    tags: Option<FfprobeTags>,
}

#[derive(Debug, Deserialize, Default)]
struct FfprobeTags {
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probes files via a real `ffprobe` binary on `$PATH`.
pub struct FfprobeMediaProbe;

impl FfprobeMediaProbe {
    pub fn new() -> Self {
        Self
    }

    /// Whether an `ffprobe` binary is reachable; used at startup to decide
    /// whether to warn that technical metadata will be unavailable.
    pub fn is_installed() -> bool {
        Command::new("ffprobe")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(path: &Path) -> Result<MediaInfo> {
        let output = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| Error::ProbeFailed(path.to_path_buf(), e.to_string()))?;

        if !output.status.success() {
            return Err(Error::ProbeFailed(
                path.to_path_buf(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::ProbeFailed(path.to_path_buf(), e.to_string()))?;

        let video_stream = parsed.streams.iter().find(|s| s.codec_type == "video");
        let audio_streams: Vec<&FfprobeStream> =
            parsed.streams.iter().filter(|s| s.codec_type == "audio").collect();

        let width = video_stream.and_then(|s| s.width).unwrap_or(0);
        let height = video_stream.and_then(|s| s.height).unwrap_or(0);

        let mut info = MediaInfo {
            width,
            height,
            resolution_label: Some(ResolutionLabel::from_dimensions(width, height).to_string()),
            video_codec: video_stream.and_then(|s| s.codec_name.as_deref()).map(normalize_video_codec),
            audio_codecs: Vec::new(),
            audio_channel_layout: audio_streams
                .first()
                .and_then(|s| s.channels)
                .map(channel_layout_label),
            audio_languages: Vec::new(),
            duration_seconds: parsed
                .format
                .duration
                .as_deref()
                .and_then(|d| d.parse::<f64>().ok())
                .map(|secs| secs.round() as u64),
        };

        for stream in &audio_streams {
            if let Some(codec) = &stream.codec_name {
                let normalized = normalize_audio_codec(codec);
                if !info.audio_codecs.contains(&normalized) {
                    info.audio_codecs.push(normalized);
                }
            }
            if let Some(lang) = stream.tags.as_ref().and_then(|t| t.language.clone()) {
                info.push_language(lang.to_lowercase());
            }
        }

        Ok(info)
    }
}

impl Default for FfprobeMediaProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaProbe for FfprobeMediaProbe {
    async fn probe(&self, path: &Path) -> Result<Option<MediaInfo>> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::run(&path))
            .await
            .map_err(|e| Error::other(e.to_string()))?
            .map(Some)
    }
}

/// A probe that never runs an external process; useful when `ffprobe` is
/// not installed or for tests that do not care about technical metadata.
pub struct NullMediaProbe;

#[async_trait]
impl MediaProbe for NullMediaProbe {
    async fn probe(&self, _path: &Path) -> Result<Option<MediaInfo>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_probe_always_returns_none() {
        let probe = NullMediaProbe;
        assert!(probe.probe(Path::new("/nonexistent")).await.unwrap().is_none());
    }
}
