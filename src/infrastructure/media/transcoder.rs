use super::Transcode;
use crate::modules::video::error::VideoError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

const STDERR_TAIL: usize = 600;

/// Converts the intermediate encode to H.264/AAC MP4 for browser playback.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    pub ffmpeg_bin: String,
    pub timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            timeout,
        }
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.args(["-y", "-v", "error", "-i"])
            .arg(input)
            .args([
                "-c:v", "libx264",
                "-preset", "fast",
                "-pix_fmt", "yuv420p",
                // libx264 with 4:2:0 chroma needs even dimensions
                "-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2",
                "-c:a", "aac",
                "-movflags", "+faststart",
            ])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Transcode for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), VideoError> {
        info!("🎞️ Transcoding {} -> {}", input.display(), output.display());

        let run = self.command(input, output).output();
        let result = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                VideoError::TranscodeError(format!("ffmpeg timed out after {:?}", self.timeout))
            })?
            .map_err(|e| {
                VideoError::TranscodeError(format!("failed to run {}: {}", self.ffmpeg_bin, e))
            })?;

        if !result.status.success() {
            return Err(VideoError::TranscodeError(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr_tail(&result.stderr)
            )));
        }

        info!("✅ Converted video saved to: {}", output.display());
        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map(|(i, _)| i)
        .unwrap_or(0);
    text[start..].to_string()
}
