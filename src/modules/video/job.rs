use crate::infrastructure::storage::staging::{
    FINAL_PREFIX, INTERMEDIATE_PREFIX, SOURCE_PREFIX, StagingArea,
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const DEFAULT_EXTENSION: &str = "mp4";

/// One upload-to-download cycle. The three paths are derived once from the
/// token and never rebuilt from strings afterwards.
#[derive(Debug, Clone)]
pub struct Job {
    pub token: String,
    pub source: PathBuf,
    pub intermediate: PathBuf,
    pub final_artifact: PathBuf,
}

impl Job {
    pub fn new(staging: &StagingArea, uploaded_name: &str) -> Self {
        Self::with_token(staging, Uuid::new_v4().simple().to_string(), uploaded_name)
    }

    pub fn with_token(staging: &StagingArea, token: String, uploaded_name: &str) -> Self {
        let ext = source_extension(uploaded_name);
        Self {
            source: staging.path_for(&format!("{}{}.{}", SOURCE_PREFIX, token, ext)),
            intermediate: staging.path_for(&format!("{}{}.mp4", INTERMEDIATE_PREFIX, token)),
            final_artifact: staging.path_for(&format!("{}{}.mp4", FINAL_PREFIX, token)),
            token,
        }
    }

    pub fn final_filename(&self) -> String {
        file_name(&self.final_artifact)
    }

    /// Removes leftovers from an earlier attempt under the same token.
    pub fn clear_outputs(&self) {
        for path in [&self.intermediate, &self.final_artifact] {
            StagingArea::discard(path);
        }
    }
}

fn source_extension(uploaded_name: &str) -> String {
    Path::new(uploaded_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| (1..=5).contains(&e.len()) && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
