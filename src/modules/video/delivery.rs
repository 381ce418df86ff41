use super::error::VideoError;
use crate::infrastructure::storage::staging::{DELIVERY_PREFIX, FINAL_PREFIX, StagingArea};
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use futures_util::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::info;
use uuid::Uuid;

/// Deletes the delivered file when dropped. Owned by the response body, so it
/// fires once the transfer ends however it ends.
pub struct DeleteOnCompletion {
    path: PathBuf,
}

impl DeleteOnCompletion {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for DeleteOnCompletion {
    fn drop(&mut self) {
        if StagingArea::discard(&self.path) {
            info!("Deleted processed video after download: {}", self.path.display());
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Disposition {
    Attachment,
    Inline,
}

/// One-shot download: streams a final artifact as an attachment and deletes
/// it afterwards. A second request for the same name is `NotFound`, even
/// when both arrive at once.
pub async fn download_once(staging: &StagingArea, filename: &str) -> Result<Response, VideoError> {
    if !filename.starts_with(FINAL_PREFIX) {
        return Err(VideoError::NotFound);
    }
    let path = staging.resolve(filename).ok_or(VideoError::NotFound)?;
    let (file, len) = open_regular_file(&path).await?;

    // Renaming is atomic, so exactly one request claims the artifact. The
    // open handle keeps reading the same file under its new name.
    let claimed = staging.path_for(&format!(
        "{}{}_{}",
        DELIVERY_PREFIX,
        Uuid::new_v4().simple(),
        filename
    ));
    tokio::fs::rename(&path, &claimed).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => VideoError::NotFound,
        _ => VideoError::Internal(format!("failed to claim {}: {}", path.display(), e)),
    })?;

    let guard = DeleteOnCompletion::new(claimed);
    let body = Body::from_stream(ReaderStream::new(file).map(move |chunk| {
        let _held = &guard;
        chunk
    }));

    build_response(body, filename, len, Disposition::Attachment)
}

/// Read-only serving of any staged file. No lifecycle side effects.
pub async fn serve_static(staging: &StagingArea, filename: &str) -> Result<Response, VideoError> {
    info!("Serving video from directory: {}", staging.root().display());
    let path = staging.resolve(filename).ok_or(VideoError::NotFound)?;
    let (file, len) = open_regular_file(&path).await?;

    build_response(Body::from_stream(ReaderStream::new(file)), filename, len, Disposition::Inline)
}

async fn open_regular_file(path: &Path) -> Result<(File, u64), VideoError> {
    let file = File::open(path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => VideoError::NotFound,
        _ => VideoError::Internal(format!("failed to open {}: {}", path.display(), e)),
    })?;
    let metadata = file
        .metadata()
        .await
        .map_err(|e| VideoError::Internal(format!("failed to stat {}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(VideoError::NotFound);
    }
    Ok((file, metadata.len()))
}

fn build_response(
    body: Body,
    filename: &str,
    len: u64,
    disposition: Disposition,
) -> Result<Response, VideoError> {
    let content_type = mime_guess::from_path(filename).first_or_octet_stream();
    let kind = match disposition {
        Disposition::Attachment => "attachment",
        Disposition::Inline => "inline",
    };
    let disposition = HeaderValue::from_str(&format!(
        "{}; filename=\"{}\"",
        kind,
        quoted_filename(filename)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(kind));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, len)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(body)
        .map_err(|e| VideoError::Internal(format!("failed to build response: {}", e)))
}

/// Escapes a name for a quoted-string header parameter. Characters a header
/// value cannot carry are replaced with `_`.
fn quoted_filename(filename: &str) -> String {
    let mut quoted = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_ascii_graphic() || c == ' ' => quoted.push(c),
            _ => quoted.push('_'),
        }
    }
    quoted
}
