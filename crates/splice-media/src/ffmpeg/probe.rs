//! Source probing via `ffprobe -print_format json`.

use std::process::Command;

use serde::Deserialize;
use splice_core::{MediaInfo, MediaKind, Result, SpliceError};
use tracing::debug;

use super::ffprobe_path;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    disposition: Disposition,
}

#[derive(Debug, Default, Deserialize)]
struct Disposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Probe `source` with ffprobe.
pub(crate) fn probe_source(source: &str, still_duration: f64) -> Result<MediaInfo> {
    let output = Command::new(ffprobe_path())
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(source)
        .output()
        .map_err(|e| SpliceError::Media(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(SpliceError::Media(format!(
            "ffprobe failed on {}: {}",
            source,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_json(&json, still_duration)?;
    debug!("Probed {}: {:?}", source, info);
    Ok(info)
}

/// Interpret ffprobe's JSON report.
///
/// Image containers (`image2`, `*_pipe`) and video streams without a duration
/// are stills and get `still_duration`.
pub fn parse_probe_json(json: &str, still_duration: f64) -> Result<MediaInfo> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| SpliceError::Serialization(e.to_string()))?;

    let format_name = probe
        .format
        .as_ref()
        .and_then(|f| f.format_name.as_deref())
        .unwrap_or_default();
    let format_duration = parse_seconds(probe.format.as_ref().and_then(|f| f.duration.as_deref()));

    let video = probe.streams.iter().find(|s| {
        s.codec_type.as_deref() == Some("video") && s.disposition.attached_pic == 0
    });
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    if let Some(video) = video {
        let (width, height) = match (video.width, video.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(SpliceError::Media("video stream without dimensions".into()));
            }
        };
        let is_image_container =
            format_name.contains("image2") || format_name.ends_with("_pipe");
        let duration = format_duration.or_else(|| parse_seconds(video.duration.as_deref()));

        return Ok(match duration {
            Some(d) if !is_image_container => MediaInfo {
                kind: MediaKind::Video,
                duration_seconds: d,
                width: Some(width),
                height: Some(height),
                has_audio,
            },
            _ => MediaInfo::image(still_duration, width, height),
        });
    }

    if has_audio {
        let duration = format_duration
            .ok_or_else(|| SpliceError::Media("audio source without duration".into()))?;
        return Ok(MediaInfo::audio(duration));
    }

    Err(SpliceError::UnsupportedFormat(format!(
        "no audio or video stream ({format_name})"
    )))
}
