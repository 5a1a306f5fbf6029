//! Media probing using ffprobe JSON output.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use super::{AudioInfo, MediaInfo, MediaProber, ProbeError, ProbeResult};

/// [`MediaProber`] backed by the ffprobe executable.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, path: &Path) -> ProbeResult<Value> {
        if !path.exists() {
            return Err(ProbeError::FileNotFound(path.to_path_buf()));
        }

        tracing::debug!("Probing media: {}", path.display());

        let tool = self.program.display().to_string();
        let output = Command::new(&self.program)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| ProbeError::Launch {
                tool: tool.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::unreadable(tool, path, stderr.trim()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ProbeError::invalid_output(path, e.to_string()))
    }
}

impl MediaProber for FfprobeProber {
    fn probe(&self, path: &Path) -> ProbeResult<MediaInfo> {
        let json = self.run(path)?;
        parse_media_info(&json, path)
    }

    fn probe_audio(&self, path: &Path) -> ProbeResult<AudioInfo> {
        let json = self.run(path)?;
        parse_audio_info(&json, path)
    }
}

fn streams(json: &Value) -> impl Iterator<Item = &Value> {
    json.get("streams")
        .and_then(|s| s.as_array())
        .into_iter()
        .flatten()
}

fn codec_type(stream: &Value) -> &str {
    stream
        .get("codec_type")
        .and_then(|t| t.as_str())
        .unwrap_or("")
}

/// ffprobe reports durations as decimal strings.
fn duration_of(value: &Value) -> Option<f64> {
    let duration = value.get("duration")?;
    let seconds = match duration {
        Value::String(s) => s.parse::<f64>().ok()?,
        other => other.as_f64()?,
    };
    (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}

fn format_duration(json: &Value) -> Option<f64> {
    json.get("format").and_then(duration_of)
}

/// Parse size and duration from `ffprobe -show_format -show_streams` JSON.
pub fn parse_media_info(json: &Value, path: &Path) -> ProbeResult<MediaInfo> {
    let video = streams(json)
        .find(|s| codec_type(s) == "video")
        .ok_or_else(|| ProbeError::missing_stream(path, "video"))?;

    let dimension = |key: &str| {
        video
            .get(key)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
    };
    let (Some(width), Some(height)) = (dimension("width"), dimension("height")) else {
        return Err(ProbeError::invalid_output(path, "video stream has no dimensions"));
    };

    Ok(MediaInfo {
        width,
        height,
        duration: format_duration(json).or_else(|| duration_of(video)),
        has_audio: streams(json).any(|s| codec_type(s) == "audio"),
    })
}

/// Parse audio duration from `ffprobe -show_format -show_streams` JSON.
pub fn parse_audio_info(json: &Value, path: &Path) -> ProbeResult<AudioInfo> {
    let audio = streams(json)
        .find(|s| codec_type(s) == "audio")
        .ok_or_else(|| ProbeError::missing_stream(path, "audio"))?;

    Ok(AudioInfo {
        duration: format_duration(json).or_else(|| duration_of(audio)),
    })
}
