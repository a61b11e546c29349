//! JSON file-backed cache with atomic writes.

use std::path::{Path, PathBuf};

use {async_trait::async_trait, tokio::fs};

use crate::{
    Result,
    cache::ResultCache,
    error::Context,
    types::PersistedState,
};

/// One JSON document at `path`. Writes go through `<path>.tmp` and the
/// previous document is kept as `<path>.bak`.
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    async fn atomic_write(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.sibling(".tmp");
        fs::write(&tmp, json.as_bytes()).await?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let _ = fs::rename(&self.path, self.sibling(".bak")).await;
        }

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultCache for FileCache {
    async fn put(&self, state: &PersistedState) -> Result<()> {
        self.atomic_write(state).await
    }

    async fn get(&self) -> Result<Option<PersistedState>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path).await?;
        let state = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(state))
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::{Outcome, PersistedOptions, RequestKind},
    };

    fn make_cache() -> (tempfile::TempDir, FileCache) {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FileCache::new(tmp.path().join("state").join("pending.json"));
        (tmp, cache)
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let (_tmp, cache) = make_cache();
        assert!(cache.get().await.unwrap().is_none());
        // Clearing twice is fine.
        cache.clear().await.unwrap();
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn put_get_clear() {
        let (_tmp, cache) = make_cache();
        let mut state = PersistedState::new(RequestKind::CaptureVideo, PersistedOptions {
            max_video_duration_secs: 30,
            ..Default::default()
        })
        .with_locator(Some("file:///tmp/x.mp4".into()));
        cache.put(&state).await.unwrap();

        state.outcome = Some(Outcome::cancelled());
        cache.put(&state).await.unwrap();

        let loaded = cache.get().await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(cache.sibling(".bak").exists());
        assert!(!cache.sibling(".tmp").exists());

        cache.clear().await.unwrap();
        assert!(cache.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let (_tmp, cache) = make_cache();
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(cache.path(), "not json").unwrap();
        let err = cache.get().await.unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
