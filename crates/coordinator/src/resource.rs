//! Capture targets the external subsystem writes into.

use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    tokio::fs,
    tracing::debug,
    url::Url,
};

use crate::{Result, error::Error, types::RequestKind};

/// A fresh, empty file plus a durable locator for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub path: PathBuf,
    /// Survives a restart, unlike `path` handles held in memory.
    pub locator: String,
}

#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn allocate(&self, kind: RequestKind) -> Result<CaptureTarget>;

    /// Make the target writable by the external subsystem.
    async fn grant_access(&self, target: &CaptureTarget) -> Result<()>;

    /// Path behind `locator`, once something non-empty was written there.
    async fn resolve(&self, locator: &str) -> Result<Option<PathBuf>>;
}

/// Allocates `<uuid>.jpg` / `<uuid>.mp4` files in a capture directory and
/// hands out `file:` URLs for them.
pub struct FsResourceResolver {
    dir: PathBuf,
}

impl FsResourceResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ResourceResolver for FsResourceResolver {
    async fn allocate(&self, kind: RequestKind) -> Result<CaptureTarget> {
        let suffix = kind
            .capture_suffix()
            .ok_or_else(|| Error::message(format!("{kind} does not write a capture target")))?;
        fs::create_dir_all(&self.dir).await?;
        let dir = fs::canonicalize(&self.dir).await?;
        let path = dir.join(format!("{}{suffix}", uuid::Uuid::new_v4()));

        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let locator = Url::from_file_path(&path)
            .map_err(|()| Error::message(format!("not an absolute path: {}", path.display())))?
            .to_string();
        debug!(kind = %kind, path = %path.display(), "allocated capture target");
        Ok(CaptureTarget { path, locator })
    }

    async fn grant_access(&self, target: &CaptureTarget) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target.path, std::fs::Permissions::from_mode(0o660)).await?;
        }
        #[cfg(not(unix))]
        let _ = target;
        Ok(())
    }

    async fn resolve(&self, locator: &str) -> Result<Option<PathBuf>> {
        let url = Url::parse(locator)
            .map_err(|e| Error::external(format!("bad resource locator {locator}"), e))?;
        let Ok(path) = url.to_file_path() else {
            return Ok(None);
        };
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
