use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};

pub const SOURCE_PREFIX: &str = "temp_video_";
pub const INTERMEDIATE_PREFIX: &str = "processed_intermediate_video_";
pub const FINAL_PREFIX: &str = "processed_video_";
/// A final artifact claimed by an in-progress download.
pub const DELIVERY_PREFIX: &str = "delivering_";

/// Filesystem area holding every in-flight job artifact.
///
/// Jobs never share a file: names carry a per-job random token, so the
/// directory is the only state concurrent jobs have in common.
#[derive(Clone, Debug)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Creates the directory if it is absent. Safe to call from several
    /// processes at once.
    pub fn init(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
            info!("📁 Created staging directory: {}", root.display());
        }
        let root = fs::canonicalize(&root)?;
        info!("📁 Staging directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Maps a client-supplied name onto a file inside the staging directory.
    /// Anything that is not a single plain path component is rejected.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\', '\0']) {
            return None;
        }
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == filename => {
                Some(self.root.join(filename))
            }
            _ => None,
        }
    }

    /// Best-effort removal. Failures are logged, never returned.
    pub fn discard(path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => {
                info!("🗑️ Deleted {}", path.display());
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                error!("Error deleting file {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Startup cleanup. Sources, intermediates and claimed downloads cannot
    /// belong to a live request before the server accepts requests; final artifacts are kept until
    /// they outlive `final_ttl`.
    pub fn sweep_orphans(&self, final_ttl: Duration) -> usize {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not scan staging directory {}: {}", self.root.display(), e);
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let path = entry.path();

            let stale = if name.starts_with(SOURCE_PREFIX)
                || name.starts_with(INTERMEDIATE_PREFIX)
                || name.starts_with(DELIVERY_PREFIX)
            {
                true
            } else if name.starts_with(FINAL_PREFIX) {
                entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .is_some_and(|age| age >= final_ttl)
            } else {
                false
            };

            if stale && Self::discard(&path) {
                removed += 1;
            }
        }

        if removed > 0 {
            info!("🧹 Swept {} orphaned artifact(s) from {}", removed, self.root.display());
        }
        removed
    }
}
