//! In-memory doubles for the resize and frame-extraction capabilities.
//! No filesystem access; paths are derived by appending suffixes.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    frame::FrameExtractor,
    record::ResizeParams,
    resize::ImageResizer,
};

/// Returns `<source>.scaled` unless the params are a no-op.
#[derive(Clone, Default)]
pub struct FakeResizer {
    failing: HashSet<PathBuf>,
    calls: Arc<Mutex<Vec<(PathBuf, ResizeParams)>>>,
}

impl FakeResizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail whenever `path` is resized.
    #[must_use]
    pub fn failing_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing.insert(path.into());
        self
    }

    pub fn calls(&self) -> Vec<(PathBuf, ResizeParams)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ImageResizer for FakeResizer {
    async fn resize_if_needed(&self, source: &Path, params: ResizeParams) -> Result<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((source.to_path_buf(), params));
        if self.failing.contains(source) {
            return Err(Error::message(format!("cannot decode {}", source.display())));
        }
        if params.is_noop() {
            return Ok(source.to_path_buf());
        }
        let mut out = source.as_os_str().to_owned();
        out.push(".scaled");
        Ok(PathBuf::from(out))
    }
}

/// Returns `<video>.cover.jpg`, or fails every call when built with
/// [`FakeFrameExtractor::failing`].
#[derive(Clone, Default)]
pub struct FakeFrameExtractor {
    fail: bool,
    calls: Arc<Mutex<Vec<(PathBuf, Duration)>>>,
}

impl FakeFrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<(PathBuf, Duration)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl FrameExtractor for FakeFrameExtractor {
    async fn extract_frame(&self, video: &Path, offset: Duration) -> Result<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((video.to_path_buf(), offset));
        if self.fail {
            return Err(Error::tool_missing("ffmpeg"));
        }
        let mut out = video.as_os_str().to_owned();
        out.push(".cover.jpg");
        Ok(PathBuf::from(out))
    }
}
