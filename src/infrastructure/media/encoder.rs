use super::{FrameSink, VideoInfo};
use crate::modules::video::error::VideoError;
use crate::modules::video::transform::Frame;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::debug;

/// Intermediate writer: raw RGB frames piped into ffmpeg, stored as MPEG-4
/// Part 2 ("mp4v") in an MP4 container.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    width: u32,
    height: u32,
    path: PathBuf,
    finished: bool,
}

impl FfmpegEncoder {
    pub fn open(ffmpeg_bin: &str, path: &Path, info: &VideoInfo) -> Result<Self, VideoError> {
        let size = format!("{}x{}", info.width, info.height);
        let rate = format!("{}", info.fps);

        let mut child = Command::new(ffmpeg_bin)
            .args([
                "-y",
                "-v", "error",
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-s", &size,
                "-r", &rate,
                "-i", "-",
                "-an",
                "-c:v", "mpeg4",
                "-q:v", "3",
                "-tag:v", "mp4v",
            ])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| VideoError::EncodeError(format!("failed to spawn {}: {}", ffmpeg_bin, e)))?;

        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::EncodeError("encoder stdin unavailable".to_string()));
            }
        };

        debug!("Opened intermediate writer {} at {} {}fps", path.display(), size, rate);

        Ok(Self {
            child,
            stdin: Some(BufWriter::with_capacity(1 << 20, stdin)),
            width: info.width,
            height: info.height,
            path: path.to_path_buf(),
            finished: false,
        })
    }
}

impl FrameSink for FfmpegEncoder {
    fn write(&mut self, frame: &Frame) -> Result<(), VideoError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(VideoError::EncodeError(format!(
                "frame is {:?}, writer expects {}x{}",
                frame.dimensions(),
                self.width,
                self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| VideoError::EncodeError("writer already closed".to_string()))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| VideoError::EncodeError(format!("failed to write frame: {}", e)))
    }

    fn finish(mut self) -> Result<(), VideoError> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .flush()
                .map_err(|e| VideoError::EncodeError(format!("failed to flush frames: {}", e)))?;
        }

        let status = self
            .child
            .wait()
            .map_err(|e| VideoError::EncodeError(format!("failed waiting on encoder: {}", e)))?;
        self.finished = true;
        if !status.success() {
            return Err(VideoError::EncodeError(format!(
                "encoder for {} exited with {}",
                self.path.display(),
                status
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.stdin.take();
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_an_encode_error() {
        let info = VideoInfo { width: 2, height: 2, fps: 30.0 };
        let result = FfmpegEncoder::open("/nonexistent/ffmpeg-binary", Path::new("out.mp4"), &info);
        assert!(matches!(result, Err(VideoError::EncodeError(_))));
    }
}
