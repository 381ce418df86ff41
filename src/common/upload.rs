use anyhow::{Context, Result};
use axum::{body::Bytes, extract::multipart::Field};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, warn};

const WRITE_BUFFER: usize = 1024 * 1024;

/// Writes an upload to disk chunk by chunk. Unless `finish` succeeds, the
/// file is removed when the uploader is dropped, including when the request
/// future is cancelled mid-stream.
pub struct FileUploader {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
    completed: bool,
}

impl FileUploader {
    pub async fn new(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(WRITE_BUFFER, file),
            written: 0,
            completed: false,
        })
    }

    pub async fn write_chunk(&mut self, chunk: Bytes) -> Result<()> {
        self.writer.write_all(&chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<u64> {
        self.writer.flush().await?;
        self.writer.get_mut().sync_all().await?;
        self.completed = true;
        Ok(self.written)
    }

    fn remove_partial(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Removed partial upload {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove partial upload {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for FileUploader {
    fn drop(&mut self) {
        if !self.completed {
            self.remove_partial();
        }
    }
}

/// Streams a multipart field into `path`, returning the number of bytes saved.
/// Stream failures keep the underlying `MultipartError` so callers can read
/// its status.
pub async fn stream_to_file(mut field: Field<'_>, path: &Path) -> Result<u64> {
    let mut uploader = FileUploader::new(path).await?;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                error!("Stream error: {}", e);
                return Err(e).context("Stream interrupted");
            }
        };

        if let Err(e) = uploader.write_chunk(chunk).await {
            error!("Upload error: {}", e);
            return Err(e);
        }
    }

    uploader.finish().await
}
