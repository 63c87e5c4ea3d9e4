//! Audio and video metadata
//!
//! Video probing needs a real file on disk. The bytes are written to a
//! [`tempfile::NamedTempFile`] that is removed when it goes out of scope, so every
//! exit path (write failure, probe failure, success) releases it.

use crate::error::ProcessError;
use crate::extractors::Extractor;
use crate::types::{AudioMetadata, ExtractionResult, VideoMetadata};
use async_trait::async_trait;
use serde_json::Value;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, StandardTagKey, Tag};
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Reads tags and stream properties of audio files
pub struct AudioExtractor;

#[async_trait]
impl Extractor for AudioExtractor {
    fn name(&self) -> &'static str {
        "audio"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        Ok(ExtractionResult::Audio(read_audio(content)?))
    }
}

fn read_audio(content: &[u8]) -> Result<AudioMetadata, ProcessError> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(content.to_vec())), Default::default());
    let mut probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ProcessError::decode("audio", e))?;

    let params = probed
        .format
        .default_track()
        .map(|track| track.codec_params.clone())
        .ok_or_else(|| ProcessError::decode("audio", "no audio track found"))?;

    let duration = match (params.time_base, params.n_frames) {
        (Some(time_base), Some(frames)) => {
            let time = time_base.calc_time(frames);
            time.seconds as f64 + time.frac
        }
        _ => 0.0,
    };

    let mut metadata = AudioMetadata {
        duration,
        bitrate: (duration > 0.0).then(|| (content.len() as f64 * 8.0 / duration / 1000.0) as u32),
        samplerate: params.sample_rate,
        channels: params.channels.map(|c| c.count() as u8),
        ..Default::default()
    };

    // Container tags (e.g. ID3v2 ahead of the stream) first, then in-stream tags
    if let Some(revision) = probed.metadata.get().as_ref().and_then(|m| m.current()) {
        apply_tags(&mut metadata, revision.tags());
    }
    if let Some(revision) = probed.format.metadata().current() {
        apply_tags(&mut metadata, revision.tags());
    }

    Ok(metadata)
}

fn apply_tags(metadata: &mut AudioMetadata, tags: &[Tag]) {
    for tag in tags {
        let value = tag.value.to_string();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let leading_number = || {
            value
                .split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|n| n.parse::<u32>().ok())
        };
        match tag.std_key {
            Some(StandardTagKey::TrackTitle) => metadata.title = Some(value.to_string()),
            Some(StandardTagKey::Artist) => metadata.artist = Some(value.to_string()),
            Some(StandardTagKey::Album) => metadata.album = Some(value.to_string()),
            Some(StandardTagKey::Genre) => metadata.genre = Some(value.to_string()),
            Some(StandardTagKey::Comment) => metadata.comment = Some(value.to_string()),
            Some(StandardTagKey::Date) => metadata.year = leading_number(),
            Some(StandardTagKey::TrackNumber) => metadata.track = leading_number(),
            _ => {}
        }
    }
}

/// Reads container metadata from a video file on disk
#[async_trait]
pub trait VideoProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata, ProcessError>;
}

/// Probes videos by running `ffprobe`
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeProbe {
    /// Use a specific ffprobe executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl VideoProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata, ProcessError> {
        let output = tokio::process::Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| ProcessError::Probe(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(ProcessError::Probe(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let report: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProcessError::Probe(format!("unreadable probe output: {e}")))?;
        Ok(metadata_from_ffprobe(&report))
    }
}

/// Map an ffprobe JSON report onto [`VideoMetadata`]
fn metadata_from_ffprobe(report: &Value) -> VideoMetadata {
    let streams = report["streams"].as_array().cloned().unwrap_or_default();
    let video = streams.iter().find(|s| s["codec_type"] == "video");
    let audio = streams.iter().find(|s| s["codec_type"] == "audio");

    let number = |v: &Value| -> Option<f64> {
        v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
    };

    let duration = number(&report["format"]["duration"])
        .or_else(|| video.and_then(|v| number(&v["duration"])));

    VideoMetadata {
        duration,
        fps: video.and_then(|v| {
            v["avg_frame_rate"]
                .as_str()
                .and_then(parse_frame_rate)
                .or_else(|| v["r_frame_rate"].as_str().and_then(parse_frame_rate))
        }),
        width: video.and_then(|v| v["width"].as_u64()).map(|w| w as u32),
        height: video.and_then(|v| v["height"].as_u64()).map(|h| h as u32),
        has_audio: audio.is_some(),
        audio_channels: audio.and_then(|a| a["channels"].as_u64()).map(|c| c as u32),
        audio_fps: audio.and_then(|a| number(&a["sample_rate"])).map(|r| r as u32),
        misc: report.get("format").cloned(),
    }
}

/// Parse "num/den" frame rates; zero denominators yield `None`
fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0 && num != 0.0).then(|| num / den)
        }
        None => rate.trim().parse().ok(),
    }
}

/// Blocking write of the fetched bytes to a fresh temp file
fn write_temp_file(content: &[u8]) -> Result<tempfile::NamedTempFile, ProcessError> {
    let mut file = tempfile::Builder::new()
        .prefix("urlsift-video-")
        .tempfile()
        .map_err(|e| ProcessError::Probe(format!("failed to create temp file: {e}")))?;
    file.write_all(content)
        .and_then(|_| file.flush())
        .map_err(|e| ProcessError::Probe(format!("failed to write temp file: {e}")))?;
    Ok(file)
}

/// Writes videos to a temporary file off the async runtime and probes it
pub struct VideoExtractor {
    probe: Arc<dyn VideoProbe>,
}

impl VideoExtractor {
    pub fn new(probe: Arc<dyn VideoProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl Extractor for VideoExtractor {
    fn name(&self) -> &'static str {
        "video"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        let bytes = content.to_vec();
        let file = tokio::task::spawn_blocking(move || write_temp_file(&bytes))
            .await
            .map_err(|e| ProcessError::Probe(format!("temp file writer failed: {e}")))??;

        debug!(path = %file.path().display(), "Probing video");
        let result = self.probe.probe(file.path()).await;

        match tokio::task::spawn_blocking(move || file.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to remove temp file: {}", e),
            Err(e) => warn!("Temp file cleanup failed: {}", e),
        }

        result.map(ExtractionResult::Video)
    }
}
