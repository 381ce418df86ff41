use super::{FrameSource, VideoInfo};
use crate::modules::video::error::VideoError;
use crate::modules::video::transform::Frame;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

/// Sequential RGB frame reader backed by an `ffmpeg ... -f rawvideo -` child.
pub struct FfmpegDecoder {
    child: Child,
    stdout: Option<BufReader<ChildStdout>>,
    width: u32,
    height: u32,
    frame_len: usize,
    frames_read: u64,
}

impl FfmpegDecoder {
    pub fn open(ffmpeg_bin: &str, path: &Path, info: &VideoInfo) -> Result<Self, VideoError> {
        // Rotation metadata would swap the probed dimensions, so frames are
        // decoded as stored.
        let mut child = Command::new(ffmpeg_bin)
            .args(["-v", "error", "-noautorotate", "-i"])
            .arg(path)
            .args([
                "-map", "0:v:0",
                "-fps_mode", "passthrough",
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| VideoError::OpenError(format!("failed to spawn {}: {}", ffmpeg_bin, e)))?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::OpenError("decoder stdout unavailable".to_string()));
            }
        };

        Ok(Self {
            child,
            stdout: Some(BufReader::new(stdout)),
            width: info.width,
            height: info.height,
            frame_len: info.width as usize * info.height as usize * 3,
            frames_read: 0,
        })
    }

    fn close(&mut self) {
        if self.stdout.take().is_none() {
            return;
        }
        match self.child.try_wait() {
            Ok(Some(status)) if !status.success() => {
                warn!("Decoder exited with {} after {} frames", status, self.frames_read)
            }
            Ok(Some(_)) => {}
            _ => {
                let _ = self.child.kill();
                let _ = self.child.wait();
            }
        }
    }
}

impl FrameSource for FfmpegDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.frame_len];
        let filled = read_full(stdout, &mut buf)
            .map_err(|e| VideoError::OpenError(format!("failed reading decoded frames: {}", e)))?;

        if filled < self.frame_len {
            if filled > 0 {
                warn!(
                    "Discarding truncated trailing frame ({} of {} bytes)",
                    filled, self.frame_len
                );
            }
            debug!("Decoder exhausted after {} frames", self.frames_read);
            let _ = self.child.wait();
            self.close();
            return Ok(None);
        }

        self.frames_read += 1;
        let frame = Frame::from_raw(self.width, self.height, buf)
            .ok_or_else(|| VideoError::OpenError("decoded frame has wrong size".to_string()))?;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        self.close();
    }
}

/// Like `read_exact`, but reports how much was read when the stream ends.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_full_reports_short_reads_at_eof() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = &data[..];
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 1);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn missing_binary_is_an_open_error() {
        let info = VideoInfo { width: 2, height: 2, fps: 30.0 };
        let result = FfmpegDecoder::open("/nonexistent/ffmpeg-binary", Path::new("in.mp4"), &info);
        assert!(matches!(result, Err(VideoError::OpenError(_))));
    }
}
