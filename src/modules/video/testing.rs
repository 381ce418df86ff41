//! In-memory codec, transcoder and transformer doubles for pipeline tests.

use super::error::VideoError;
use super::transform::{Frame, FrameMetadata, FrameTransformer, PoseContext, TransformOutput};
use crate::infrastructure::media::{Codec, FrameSink, FrameSource, Transcode, VideoInfo};
use image::Rgb;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
    Frame::from_pixel(width, height, Rgb(rgb))
}

pub struct VecSource {
    frames: std::vec::IntoIter<Frame>,
}

impl VecSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames: frames.into_iter() }
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        Ok(self.frames.next())
    }
}

/// Keeps written frames in shared memory and, when given a path, mirrors the
/// frame count to disk so the intermediate artifact exists like a real one.
#[derive(Default, Clone)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<Frame>>>,
    fail_after: Option<usize>,
    path: Option<PathBuf>,
}

impl RecordingSink {
    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::default()
        }
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }
}

impl FrameSink for RecordingSink {
    fn write(&mut self, frame: &Frame) -> Result<(), VideoError> {
        let mut frames = self.frames.lock().unwrap();
        if self.fail_after.is_some_and(|limit| frames.len() >= limit) {
            return Err(VideoError::EncodeError("disk full".to_string()));
        }
        frames.push(frame.clone());
        if let Some(path) = &self.path {
            fs::write(path, frames.len().to_string()).unwrap();
        }
        Ok(())
    }

    fn finish(self) -> Result<(), VideoError> {
        if self.frames.lock().unwrap().is_empty() {
            return Err(VideoError::EncodeError("nothing was encoded".to_string()));
        }
        Ok(())
    }
}

pub struct FakeCodec {
    pub info: VideoInfo,
    pub frame_count: u8,
    pub sink: RecordingSink,
    pub fail_open: bool,
}

impl FakeCodec {
    pub fn new(frame_count: u8) -> Self {
        Self {
            info: VideoInfo { width: 64, height: 48, fps: 30.0 },
            frame_count,
            sink: RecordingSink::default(),
            fail_open: false,
        }
    }
}

impl Codec for FakeCodec {
    type Source = VecSource;
    type Sink = RecordingSink;

    fn probe(&self, path: &Path) -> Result<VideoInfo, VideoError> {
        if self.fail_open || !path.is_file() {
            return Err(VideoError::OpenError("unsupported container".to_string()));
        }
        Ok(self.info)
    }

    fn open_source(&self, _path: &Path, info: &VideoInfo) -> Result<VecSource, VideoError> {
        let frames = (0..self.frame_count)
            .map(|i| solid(info.width, info.height, [i, 0, 0]))
            .collect();
        Ok(VecSource::new(frames))
    }

    fn open_sink(&self, path: &Path, _info: &VideoInfo) -> Result<RecordingSink, VideoError> {
        let mut sink = self.sink.clone();
        sink.path = Some(path.to_path_buf());
        Ok(sink)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeMode {
    /// Copies the intermediate to the output; fails if there is no input.
    Copy,
    Fail,
    /// Reports success without producing anything.
    SilentNoOutput,
}

pub struct FakeTranscoder {
    pub mode: TranscodeMode,
    pub calls: AtomicUsize,
}

impl FakeTranscoder {
    pub fn new(mode: TranscodeMode) -> Self {
        Self { mode, calls: AtomicUsize::new(0) }
    }
}

impl Transcode for FakeTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), VideoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            TranscodeMode::Copy => fs::copy(input, output)
                .map(|_| ())
                .map_err(|e| VideoError::TranscodeError(e.to_string())),
            TranscodeMode::Fail => {
                fs::write(output, b"partial").unwrap();
                Err(VideoError::TranscodeError("exit status: 1".to_string()))
            }
            TranscodeMode::SilentNoOutput => Ok(()),
        }
    }
}

pub enum Step {
    Skip,
    Replace(Frame),
}

/// Applies scripted outcomes keyed by 1-based frame number; other frames pass
/// through unchanged.
pub struct ScriptedTransformer {
    script: HashMap<usize, Step>,
    skip_all: bool,
    seen: AtomicUsize,
}

impl ScriptedTransformer {
    pub fn new(script: Vec<(usize, Step)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            skip_all: false,
            seen: AtomicUsize::new(0),
        }
    }

    pub fn skip_all() -> Self {
        Self {
            skip_all: true,
            ..Self::new(Vec::new())
        }
    }
}

impl FrameTransformer for ScriptedTransformer {
    fn transform(&self, frame: &Frame, _pose: &PoseContext) -> TransformOutput {
        let number = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if self.skip_all {
            return TransformOutput::skip();
        }
        match self.script.get(&number) {
            Some(Step::Skip) => TransformOutput {
                frame: None,
                metadata: FrameMetadata {
                    alert: Some("no pose detected".to_string()),
                },
            },
            Some(Step::Replace(replacement)) => TransformOutput::frame(replacement.clone()),
            None => TransformOutput::frame(frame.clone()),
        }
    }
}

/// Passes frames through after a fixed delay, standing in for a slow model.
pub struct SlowTransformer {
    delay: Duration,
}

impl SlowTransformer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl FrameTransformer for SlowTransformer {
    fn transform(&self, frame: &Frame, _pose: &PoseContext) -> TransformOutput {
        std::thread::sleep(self.delay);
        TransformOutput::frame(frame.clone())
    }
}
