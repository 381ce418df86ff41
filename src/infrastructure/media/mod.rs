use crate::modules::video::error::VideoError;
use crate::modules::video::transform::Frame;
use std::future::Future;
use std::path::Path;

pub mod decoder;
pub mod encoder;
pub mod probe;
pub mod transcoder;

pub use decoder::FfmpegDecoder;
pub use encoder::FfmpegEncoder;
pub use transcoder::FfmpegTranscoder;

/// Stream properties read once from the source. The intermediate encode is
/// written at exactly these values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

pub trait FrameSource {
    /// `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;
}

pub trait FrameSink {
    fn write(&mut self, frame: &Frame) -> Result<(), VideoError>;

    /// Flushes and closes the output. Dropping a sink without calling this
    /// releases it without finalising the file.
    fn finish(self) -> Result<(), VideoError>;
}

/// Raw-frame access to video files: probing, decoding and the intermediate
/// writer. Calls block, so run them off the async executor.
pub trait Codec: Send + Sync + 'static {
    type Source: FrameSource;
    type Sink: FrameSink;

    fn probe(&self, path: &Path) -> Result<VideoInfo, VideoError>;
    fn open_source(&self, path: &Path, info: &VideoInfo) -> Result<Self::Source, VideoError>;
    fn open_sink(&self, path: &Path, info: &VideoInfo) -> Result<Self::Sink, VideoError>;
}

/// Converts the intermediate encode into the browser-playable final artifact.
pub trait Transcode: Send + Sync {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<(), VideoError>> + Send;
}

#[derive(Debug, Clone)]
pub struct FfmpegCodec {
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

impl FfmpegCodec {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }
}

impl Codec for FfmpegCodec {
    type Source = FfmpegDecoder;
    type Sink = FfmpegEncoder;

    fn probe(&self, path: &Path) -> Result<VideoInfo, VideoError> {
        probe::probe(&self.ffprobe_bin, path)
    }

    fn open_source(&self, path: &Path, info: &VideoInfo) -> Result<FfmpegDecoder, VideoError> {
        FfmpegDecoder::open(&self.ffmpeg_bin, path, info)
    }

    fn open_sink(&self, path: &Path, info: &VideoInfo) -> Result<FfmpegEncoder, VideoError> {
        FfmpegEncoder::open(&self.ffmpeg_bin, path, info)
    }
}
