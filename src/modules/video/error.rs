use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("No video file provided")]
    MissingFile,

    #[error("No video file selected")]
    EmptyFilename,

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Uploaded video is too large")]
    UploadTooLarge,

    #[error("Error opening video file: {0}")]
    OpenError(String),

    #[error("Error writing processed video: {0}")]
    EncodeError(String),

    #[error("Video conversion failed: {0}")]
    TranscodeError(String),

    #[error("Final processed video was not created")]
    FinalArtifactMissing,

    #[error("Video not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VideoError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            VideoError::MissingFile | VideoError::EmptyFilename | VideoError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            VideoError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            VideoError::NotFound => StatusCode::NOT_FOUND,
            VideoError::OpenError(_)
            | VideoError::EncodeError(_)
            | VideoError::TranscodeError(_)
            | VideoError::FinalArtifactMissing
            | VideoError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the client. Process details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            VideoError::OpenError(_) => "Error opening video file".to_string(),
            VideoError::EncodeError(_) => "Error writing processed video".to_string(),
            VideoError::TranscodeError(_) => "Video conversion failed".to_string(),
            VideoError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for VideoError {
    fn from(e: tokio::task::JoinError) -> Self {
        VideoError::Internal(format!("processing task failed: {}", e))
    }
}
