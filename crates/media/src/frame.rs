//! Video cover-frame extraction.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use {async_trait::async_trait, tokio::process::Command, tracing::debug};

use crate::error::{Error, Result};

/// Cover frames are grabbed at the start of the video unless configured
/// otherwise.
pub const COVER_FRAME_OFFSET: Duration = Duration::ZERO;

/// Writes a still frame of a video to disk.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract_frame(&self, video: &Path, offset: Duration) -> Result<PathBuf>;
}

/// Shells out to `ffmpeg` and writes `cover_<uuid>.jpg` files.
pub struct FfmpegFrameExtractor {
    binary: Option<PathBuf>,
    output_dir: PathBuf,
}

impl FfmpegFrameExtractor {
    /// `configured` is checked first, then `PATH`.
    pub fn new(configured: Option<&str>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: find_binary("ffmpeg", configured),
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.binary.is_some()
    }
}

/// Find a binary at an explicit path or in `PATH`.
pub fn find_binary(name: &str, configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured.map(PathBuf::from)
        && path.is_file()
    {
        return Some(path);
    }
    which::which(name).ok()
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frame(&self, video: &Path, offset: Duration) -> Result<PathBuf> {
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| Error::tool_missing("ffmpeg"))?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let target = self
            .output_dir
            .join(format!("cover_{}.jpg", uuid::Uuid::new_v4().simple()));

        let output = Command::new(binary)
            .arg("-y")
            .args(["-loglevel", "error"])
            .arg("-ss")
            .arg(format!("{:.3}", offset.as_secs_f64()))
            .arg("-i")
            .arg(video)
            .args(["-frames:v", "1", "-q:v", "2"])
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: "ffmpeg".into(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(Error::message(format!(
                "ffmpeg produced no frame for {}",
                video.display()
            )));
        }

        debug!(video = %video.display(), cover = %target.display(), "extracted cover frame");
        Ok(target)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tempfile::TempDir};

    #[test]
    fn find_binary_prefers_configured_path() {
        let tmp = TempDir::new().unwrap();
        let fake = tmp.path().join("my-ffmpeg");
        std::fs::write(&fake, b"").unwrap();
        assert_eq!(
            find_binary("ffmpeg", Some(fake.to_str().unwrap())),
            Some(fake)
        );
    }

    #[test]
    fn find_binary_misses_unknown_tool() {
        assert!(find_binary("definitely-not-a-real-binary-xyz123", None).is_none());
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_reported() {
        let tmp = TempDir::new().unwrap();
        let extractor = FfmpegFrameExtractor {
            binary: None,
            output_dir: tmp.path().to_path_buf(),
        };
        assert!(!extractor.is_available());
        let err = extractor
            .extract_frame(Path::new("/v.mp4"), COVER_FRAME_OFFSET)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolMissing { .. }));
    }
}
