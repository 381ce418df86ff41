use super::error::VideoError;
use super::job::Job;
use super::pipeline::{self, PipelineStats, SkippedFramePolicy};
use super::transform::{FrameTransformer, PoseContext};
use crate::infrastructure::media::{Codec, Transcode};
use crate::infrastructure::storage::staging::StagingArea;
use crate::state::AppState;
use std::sync::Arc;
use tracing::{error, info};

/// Everything one job run needs besides the job itself.
pub struct Processor<C, T> {
    pub codec: Arc<C>,
    pub transcoder: Arc<T>,
    pub transformer: Arc<dyn FrameTransformer>,
    pub pose: Arc<PoseContext>,
    pub policy: SkippedFramePolicy,
}

pub struct VideoService;

impl VideoService {
    /// Runs a saved upload through the whole pipeline and returns the final
    /// artifact's file name.
    pub async fn process(state: &AppState, job: Job) -> Result<String, VideoError> {
        let processor = Processor {
            codec: state.codec.clone(),
            transcoder: state.transcoder.clone(),
            transformer: state.transformer.clone(),
            pose: state.pose.clone(),
            policy: state.config.skipped_frame_policy,
        };
        processor.run_detached(job).await
    }
}

impl<C, T> Processor<C, T>
where
    C: Codec,
    T: Transcode + 'static,
{
    /// Runs the job on its own task. Dropping the returned future (a client
    /// disconnect) does not cancel it, so the job still cleans up after itself.
    pub async fn run_detached(self, job: Job) -> Result<String, VideoError> {
        tokio::spawn(async move { self.run(job).await }).await?
    }

    pub async fn run(&self, job: Job) -> Result<String, VideoError> {
        let stats = self.encode(&job).await;

        // The upload is never needed again, whatever happened above.
        if StagingArea::discard(&job.source) {
            info!("Deleted temporary video: {}", job.source.display());
        }

        if let Err(e) = stats {
            error!("Frame processing failed for job {}: {}", job.token, e);
            StagingArea::discard(&job.intermediate);
            return Err(e);
        }

        let transcoded = self.transcoder.transcode(&job.intermediate, &job.final_artifact).await;

        if StagingArea::discard(&job.intermediate) {
            info!("Deleted intermediate video: {}", job.intermediate.display());
        }

        if let Err(e) = transcoded {
            error!("Transcode failed for job {}: {}", job.token, e);
            StagingArea::discard(&job.final_artifact);
            return Err(e);
        }

        if !tokio::fs::try_exists(&job.final_artifact).await.unwrap_or(false) {
            error!(
                "Transcoder reported success but {} is missing",
                job.final_artifact.display()
            );
            return Err(VideoError::FinalArtifactMissing);
        }

        Ok(job.final_filename())
    }

    async fn encode(&self, job: &Job) -> Result<PipelineStats, VideoError> {
        let codec = self.codec.clone();
        let transformer = self.transformer.clone();
        let pose = self.pose.clone();
        let policy = self.policy;
        let job = job.clone();

        tokio::task::spawn_blocking(move || {
            pipeline::encode_job(codec.as_ref(), &job, transformer.as_ref(), &pose, policy)
        })
        .await?
    }
}
