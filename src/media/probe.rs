use serde::Deserialize;

use crate::error::{Result, SplitError};
use crate::silence::duration_from_secs;

use super::MediaInfo;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

/// Parse the JSON written by `ffprobe -print_format json -show_format -show_streams`.
pub fn parse_probe_output(json: &str) -> Result<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| SplitError::Probe(format!("Unreadable FFprobe output: {e}")))?;

    let codec = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()))
        .ok_or_else(|| SplitError::Probe("No audio stream found".to_string()))?;

    let has_video = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("video"));

    let format = probe
        .format
        .ok_or_else(|| SplitError::Probe("No format section in probe output".to_string()))?;

    let container = format
        .format_name
        .as_deref()
        .and_then(|name| name.split(',').next())
        .unwrap_or("unknown")
        .to_string();

    let duration_str = format
        .duration
        .ok_or_else(|| SplitError::Probe("Input reports no duration".to_string()))?;
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        SplitError::Probe(format!("Failed to parse duration '{duration_str}': {e}"))
    })?;
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(SplitError::Probe(format!(
            "Input duration is not positive: {duration_secs}"
        )));
    }

    Ok(MediaInfo {
        codec,
        container,
        duration: duration_from_secs(duration_secs),
        has_video,
    })
}
