use super::error::VideoError;
use super::job::Job;
use super::transform::{Frame, FrameTransformer, PoseContext};
use crate::infrastructure::media::{Codec, FrameSink, FrameSource, VideoInfo};
use image::imageops::{self, FilterType};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// What happens to a frame the transformer declines to annotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkippedFramePolicy {
    /// Leave it out. The output may end up shorter than the source.
    #[default]
    Drop,
    /// Write the decoded frame unannotated, keeping the source duration.
    Substitute,
}

impl FromStr for SkippedFramePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(SkippedFramePolicy::Drop),
            "substitute" => Ok(SkippedFramePolicy::Substitute),
            other => Err(format!("unknown skipped frame policy '{}'", other)),
        }
    }
}

impl fmt::Display for SkippedFramePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkippedFramePolicy::Drop => write!(f, "drop"),
            SkippedFramePolicy::Substitute => write!(f, "substitute"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_read: u64,
    pub frames_written: u64,
    pub frames_skipped: u64,
    pub frames_substituted: u64,
    pub frames_resized: u64,
}

/// Decodes the job's source and writes every transformed frame to its
/// intermediate encode. Blocking; run on the blocking pool.
///
/// Reader and writer are released on every exit path. Deleting the source
/// is left to the caller.
pub fn encode_job<C: Codec>(
    codec: &C,
    job: &Job,
    transformer: &dyn FrameTransformer,
    pose: &PoseContext,
    policy: SkippedFramePolicy,
) -> Result<PipelineStats, VideoError> {
    let info = codec.probe(&job.source)?;
    info!(
        "Source {} is {}x{} @ {:.2}fps",
        job.source.display(),
        info.width,
        info.height,
        info.fps
    );

    job.clear_outputs();

    let mut source = codec.open_source(&job.source, &info)?;
    let mut sink = codec.open_sink(&job.intermediate, &info)?;
    info!("Processing video frames and writing to: {}", job.intermediate.display());

    let stats = run_frames(&mut source, &mut sink, &info, transformer, pose, policy)?;
    drop(source);

    match sink.finish() {
        Ok(()) => {}
        Err(e) if stats.frames_written == 0 => {
            warn!("No frames were written for job {}: {}", job.token, e);
        }
        Err(e) => return Err(e),
    }

    info!(
        "Job {}: read {} frames, wrote {} ({} skipped, {} substituted, {} resized)",
        job.token,
        stats.frames_read,
        stats.frames_written,
        stats.frames_skipped,
        stats.frames_substituted,
        stats.frames_resized
    );
    Ok(stats)
}

/// The per-frame loop: strictly sequential, output order equals input order.
pub fn run_frames<S: FrameSource, K: FrameSink>(
    source: &mut S,
    sink: &mut K,
    info: &VideoInfo,
    transformer: &dyn FrameTransformer,
    pose: &PoseContext,
    policy: SkippedFramePolicy,
) -> Result<PipelineStats, VideoError> {
    let mut stats = PipelineStats::default();

    while let Some(frame) = source.next_frame()? {
        stats.frames_read += 1;

        let output = transformer.transform(&frame, pose);
        if let Some(alert) = &output.metadata.alert {
            debug!("Frame {}: {}", stats.frames_read, alert);
        }

        let annotated = match (output.frame, policy) {
            (Some(annotated), _) => annotated,
            (None, SkippedFramePolicy::Drop) => {
                stats.frames_skipped += 1;
                continue;
            }
            (None, SkippedFramePolicy::Substitute) => {
                stats.frames_substituted += 1;
                frame
            }
        };

        let (fitted, resized) = fit_to(annotated, info.width, info.height);
        if resized {
            stats.frames_resized += 1;
        }

        sink.write(&fitted)?;
        stats.frames_written += 1;
    }

    Ok(stats)
}

/// Resamples `frame` to `width`x`height` unless it already matches.
pub fn fit_to(frame: Frame, width: u32, height: u32) -> (Frame, bool) {
    if frame.dimensions() == (width, height) {
        return (frame, false);
    }
    (imageops::resize(&frame, width, height, FilterType::Triangle), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::video::testing::{
        solid, RecordingSink, ScriptedTransformer, Step, VecSource,
    };
    use crate::modules::video::transform::PassthroughTransformer;
    use image::Rgb;

    fn info() -> VideoInfo {
        VideoInfo { width: 640, height: 480, fps: 30.0 }
    }

    fn numbered_frames(count: u8) -> Vec<Frame> {
        (0..count).map(|i| solid(640, 480, [i, 0, 0])).collect()
    }

    #[test]
    fn resizes_one_frame_and_drops_another() {
        let mut source = VecSource::new(numbered_frames(10));
        let mut sink = RecordingSink::default();
        let transformer = ScriptedTransformer::new(vec![
            (3, Step::Skip),
            (5, Step::Replace(solid(600, 450, [255, 255, 0]))),
        ]);

        let stats = run_frames(
            &mut source,
            &mut sink,
            &info(),
            &transformer,
            &PoseContext::default(),
            SkippedFramePolicy::Drop,
        )
        .unwrap();

        let written = sink.frames();
        assert_eq!(written.len(), 9);
        assert!(written.iter().all(|f| f.dimensions() == (640, 480)));
        assert_eq!(stats.frames_read, 10);
        assert_eq!(stats.frames_written, 9);
        assert_eq!(stats.frames_skipped, 1);
        assert_eq!(stats.frames_resized, 1);

        // Frame 3 is gone, so frame 5 lands at output index 3.
        let order: Vec<u8> = written.iter().map(|f| f.get_pixel(0, 0)[0]).collect();
        assert_eq!(order, vec![0, 1, 3, 255, 5, 6, 7, 8, 9]);
        assert_eq!(*written[3].get_pixel(320, 240), Rgb([255, 255, 0]));
    }

    #[test]
    fn skipping_everything_writes_nothing() {
        let mut source = VecSource::new(numbered_frames(4));
        let mut sink = RecordingSink::default();
        let transformer = ScriptedTransformer::skip_all();

        let stats = run_frames(
            &mut source,
            &mut sink,
            &info(),
            &transformer,
            &PoseContext::default(),
            SkippedFramePolicy::Drop,
        )
        .unwrap();

        assert_eq!(stats.frames_written, 0);
        assert_eq!(stats.frames_skipped, 4);
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn substitute_policy_keeps_the_undecorated_frame() {
        let mut source = VecSource::new(numbered_frames(5));
        let mut sink = RecordingSink::default();
        let transformer = ScriptedTransformer::new(vec![(2, Step::Skip)]);

        let stats = run_frames(
            &mut source,
            &mut sink,
            &info(),
            &transformer,
            &PoseContext::default(),
            SkippedFramePolicy::Substitute,
        )
        .unwrap();

        assert_eq!(stats.frames_written, 5);
        assert_eq!(stats.frames_substituted, 1);
        let order: Vec<u8> = sink.frames().iter().map(|f| f.get_pixel(0, 0)[0]).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn written_frames_never_outnumber_read_frames() {
        for count in [0u8, 1, 7] {
            let mut source = VecSource::new(numbered_frames(count));
            let mut sink = RecordingSink::default();
            let stats = run_frames(
                &mut source,
                &mut sink,
                &info(),
                &PassthroughTransformer,
                &PoseContext::default(),
                SkippedFramePolicy::Drop,
            )
            .unwrap();
            assert!(stats.frames_written <= stats.frames_read);
            assert_eq!(stats.frames_read, count as u64);
        }
    }

    #[test]
    fn sink_errors_abort_the_loop() {
        let mut source = VecSource::new(numbered_frames(5));
        let mut sink = RecordingSink::failing_after(2);

        let err = run_frames(
            &mut source,
            &mut sink,
            &info(),
            &PassthroughTransformer,
            &PoseContext::default(),
            SkippedFramePolicy::Drop,
        )
        .unwrap_err();

        assert!(matches!(err, VideoError::EncodeError(_)));
        assert_eq!(sink.frames().len(), 2);
    }

    #[test]
    fn fit_to_leaves_matching_frames_alone() {
        let (frame, resized) = fit_to(solid(4, 4, [1, 2, 3]), 4, 4);
        assert!(!resized);
        assert_eq!(frame.dimensions(), (4, 4));

        let (frame, resized) = fit_to(solid(3, 5, [1, 2, 3]), 4, 4);
        assert!(resized);
        assert_eq!(frame.dimensions(), (4, 4));
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("drop".parse::<SkippedFramePolicy>().unwrap(), SkippedFramePolicy::Drop);
        assert_eq!(
            " Substitute ".parse::<SkippedFramePolicy>().unwrap(),
            SkippedFramePolicy::Substitute
        );
        assert!("repeat".parse::<SkippedFramePolicy>().is_err());
    }
}
