use crate::config::env::{self, EnvKey};
use crate::modules::video::pipeline::SkippedFramePolicy;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    /// Absolute base used to build the `videoUrl` handed back to clients.
    pub public_base_url: Url,
    pub staging_dir: PathBuf,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub transcode_timeout: Duration,
    pub max_upload_bytes: usize,
    pub skipped_frame_policy: SkippedFramePolicy,
    pub artifact_ttl: Duration,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let server_port = env::get_parsed(EnvKey::ServerPort, 3000);
        let base = env::get_or(
            EnvKey::PublicBaseUrl,
            &format!("http://localhost:{}", server_port),
        );
        let public_base_url =
            Url::parse(&base).with_context(|| format!("Invalid PUBLIC_BASE_URL: {}", base))?;

        let policy = env::get_or(EnvKey::SkippedFramePolicy, "drop");
        let skipped_frame_policy = policy
            .parse::<SkippedFramePolicy>()
            .map_err(|e| anyhow::anyhow!("Invalid SKIPPED_FRAME_POLICY: {}", e))?;

        Ok(Self {
            server_host: env::get_or(EnvKey::ServerHost, "0.0.0.0"),
            server_port,
            public_base_url,
            staging_dir: PathBuf::from(env::get_or(EnvKey::StagingDir, "./frontend/public/videos")),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, "ffmpeg"),
            ffprobe_bin: env::get_or(EnvKey::FfprobeBin, "ffprobe"),
            transcode_timeout: Duration::from_secs(env::get_parsed(EnvKey::TranscodeTimeoutSecs, 600)),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, 512 * 1024 * 1024),
            skipped_frame_policy,
            artifact_ttl: Duration::from_secs(env::get_parsed(EnvKey::ArtifactTtlSecs, 86_400)),
        })
    }

    /// Public URL of the one-shot download for a final artifact.
    pub fn download_url(&self, filename: &str) -> Result<Url> {
        let mut url = self.public_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("PUBLIC_BASE_URL cannot be a base"))?
            .pop_if_empty()
            .push("download-video")
            .push(filename);
        Ok(url)
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests(staging_dir: PathBuf) -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            public_base_url: Url::parse("http://localhost:3000").unwrap(),
            staging_dir,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            transcode_timeout: Duration::from_secs(5),
            max_upload_bytes: 1024 * 1024,
            skipped_frame_policy: SkippedFramePolicy::Drop,
            artifact_ttl: Duration::from_secs(60),
        }
    }
}
