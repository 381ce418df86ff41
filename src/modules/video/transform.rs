use image::RgbImage;

pub type Frame = RgbImage;

/// Settings shared by every frame of every job for the pose model.
#[derive(Debug, Clone)]
pub struct PoseContext {
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for PoseContext {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameMetadata {
    /// Audible cue requested by the analysis for this frame, if any.
    pub alert: Option<String>,
}

#[derive(Debug)]
pub struct TransformOutput {
    /// `None` asks the pipeline to skip the frame, e.g. no person detected.
    pub frame: Option<Frame>,
    pub metadata: FrameMetadata,
}

impl TransformOutput {
    pub fn frame(frame: Frame) -> Self {
        Self {
            frame: Some(frame),
            metadata: FrameMetadata::default(),
        }
    }

    pub fn skip() -> Self {
        Self {
            frame: None,
            metadata: FrameMetadata::default(),
        }
    }
}

/// Per-frame pose analysis and annotation.
///
/// A single instance serves all concurrent jobs; implementations that keep
/// state between frames need their own synchronisation.
pub trait FrameTransformer: Send + Sync {
    fn transform(&self, frame: &Frame, pose: &PoseContext) -> TransformOutput;
}

/// Returns every frame untouched. Used when no pose model is wired in.
#[derive(Debug, Default)]
pub struct PassthroughTransformer;

impl FrameTransformer for PassthroughTransformer {
    fn transform(&self, frame: &Frame, _pose: &PoseContext) -> TransformOutput {
        TransformOutput::frame(frame.clone())
    }
}
