use crate::config::settings::AppConfig;
use crate::infrastructure::media::{FfmpegCodec, FfmpegTranscoder};
use crate::infrastructure::storage::staging::StagingArea;
use crate::modules::video::transform::{FrameTransformer, PassthroughTransformer, PoseContext};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub staging: StagingArea,
    pub codec: Arc<FfmpegCodec>,
    pub transcoder: Arc<FfmpegTranscoder>,
    pub transformer: Arc<dyn FrameTransformer>,
    pub pose: Arc<PoseContext>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        staging: StagingArea,
        transformer: Arc<dyn FrameTransformer>,
        pose: PoseContext,
    ) -> Self {
        let codec = FfmpegCodec::new(config.ffmpeg_bin.clone(), config.ffprobe_bin.clone());
        let transcoder = FfmpegTranscoder::new(config.ffmpeg_bin.clone(), config.transcode_timeout);

        Self {
            config: Arc::new(config),
            staging,
            codec: Arc::new(codec),
            transcoder: Arc::new(transcoder),
            transformer,
            pose: Arc::new(pose),
        }
    }

    /// State with the pass-through transformer, for running without a pose model.
    pub fn from_config(config: AppConfig) -> std::io::Result<Self> {
        let staging = StagingArea::init(&config.staging_dir)?;
        Ok(Self::new(
            config,
            staging,
            Arc::new(PassthroughTransformer),
            PoseContext::default(),
        ))
    }
}
