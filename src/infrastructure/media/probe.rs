use super::VideoInfo;
use crate::modules::video::error::VideoError;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::warn;

const FALLBACK_FPS: f64 = 30.0;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

pub fn probe(ffprobe_bin: &str, path: &Path) -> Result<VideoInfo, VideoError> {
    if !path.is_file() {
        return Err(VideoError::OpenError(format!("{} does not exist", path.display())));
    }

    let output = Command::new(ffprobe_bin)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| VideoError::OpenError(format!("failed to run {}: {}", ffprobe_bin, e)))?;

    if !output.status.success() {
        return Err(VideoError::OpenError(format!(
            "ffprobe exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> Result<VideoInfo, VideoError> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| VideoError::OpenError(format!("unreadable ffprobe output: {}", e)))?;

    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| VideoError::OpenError("no video stream".to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(VideoError::OpenError("video stream has no dimensions".to_string())),
    };

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or_else(|| {
            warn!("Could not read frame rate, assuming {} fps", FALLBACK_FPS);
            FALLBACK_FPS
        });

    Ok(VideoInfo { width, height, fps })
}

/// Parses ffprobe rates such as `30000/1001` or `25`.
fn parse_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
