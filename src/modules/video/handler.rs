use crate::common::response::{ApiError, ApiSuccess, ErrorBody};
use crate::common::upload::stream_to_file;
use crate::modules::video::delivery;
use crate::modules::video::dto::ProcessVideoResponse;
use crate::modules::video::error::VideoError;
use crate::modules::video::job::Job;
use crate::modules::video::service::VideoService;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};

const VIDEO_FIELD: &str = "video";

/// Upload a video, annotate every frame and transcode it for the browser.
#[utoipa::path(
    post,
    path = "/process-video",
    request_body(content = String, content_type = "multipart/form-data", description = "Multipart form with a `video` file field"),
    responses(
        (status = 200, description = "Video processed", body = ProcessVideoResponse),
        (status = 400, description = "Missing or unnamed video file", body = ErrorBody),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorBody),
        (status = 500, description = "Processing failed", body = ErrorBody)
    ),
    tag = "Video"
)]
pub async fn process_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let job = match ingest(&state, multipart).await {
        Ok(job) => job,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let filename = match VideoService::process(&state, job).await {
        Ok(filename) => filename,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.config.download_url(&filename) {
        Ok(url) => ApiSuccess(
            ProcessVideoResponse {
                message: "Video processed and converted successfully".to_string(),
                video_url: url.to_string(),
            },
            StatusCode::OK,
        )
        .into_response(),
        Err(e) => ApiError::from(VideoError::Internal(e.to_string())).into_response(),
    }
}

/// Finds the `video` field and saves it under a fresh job token.
async fn ingest(state: &AppState, mut multipart: Multipart) -> Result<Job, VideoError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(VideoError::MissingFile),
            Err(e) => return Err(multipart_error(&e)),
        };

        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        if file_name.is_empty() {
            return Err(VideoError::EmptyFilename);
        }

        state
            .staging
            .ensure()
            .await
            .map_err(|e| VideoError::Internal(format!("staging directory unavailable: {}", e)))?;

        let job = Job::new(&state.staging, &file_name);
        let written = stream_to_file(field, &job.source).await.map_err(|e| {
            error!("Failed to save upload {}: {:#}", file_name, e);
            match e.downcast_ref::<MultipartError>() {
                Some(multipart) => multipart_error(multipart),
                None => VideoError::Upload(e.to_string()),
            }
        })?;

        info!("Saved uploaded video to: {} ({} bytes)", job.source.display(), written);
        return Ok(job);
    }
}

fn multipart_error(e: &MultipartError) -> VideoError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VideoError::UploadTooLarge
    } else {
        VideoError::Upload(e.body_text())
    }
}

/// Download a processed video once. The file is deleted after the transfer.
#[utoipa::path(
    get,
    path = "/download-video/{filename}",
    params(
        ("filename" = String, Path, description = "Final artifact file name")
    ),
    responses(
        (status = 200, description = "Video file attachment", body = Vec<u8>, content_type = "video/mp4"),
        (status = 404, description = "Not found or already downloaded", body = ErrorBody)
    ),
    tag = "Video"
)]
pub async fn download_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    match delivery::download_once(&state.staging, &filename).await {
        Ok(response) => response,
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Serve a staged video for repeat access, without deleting it.
#[utoipa::path(
    get,
    path = "/videos/{filename}",
    params(
        ("filename" = String, Path, description = "Staged file name")
    ),
    responses(
        (status = 200, description = "Video file", body = Vec<u8>, content_type = "video/mp4"),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    tag = "Video"
)]
pub async fn serve_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    match delivery::serve_static(&state.staging, &filename).await {
        Ok(response) => response,
        Err(e) => ApiError::from(e).into_response(),
    }
}
