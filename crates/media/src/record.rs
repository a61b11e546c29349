//! Selection records returned by an external picker.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One item delivered by the external subsystem. Immutable once received.
///
/// The picker may produce several candidate files for the same item; see
/// [`SelectionRecord::resolved_path`] for which one wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionRecord {
    /// Path of the item as stored on the host.
    pub path: PathBuf,
    pub compressed_path: Option<PathBuf>,
    /// Output of the in-picker crop step.
    pub cut_path: Option<PathBuf>,
    /// Set when the user toggled "use original".
    pub original_path: Option<PathBuf>,
    /// Copy the host placed inside the app sandbox.
    pub sandbox_path: Option<PathBuf>,
    pub duration_ms: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
}

impl SelectionRecord {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Compressed, then cropped, then explicit original, then sandbox copy,
    /// then the raw path.
    #[must_use]
    pub fn resolved_path(&self) -> &Path {
        self.compressed_path
            .as_deref()
            .or(self.cut_path.as_deref())
            .or(self.original_path.as_deref())
            .or(self.sandbox_path.as_deref())
            .unwrap_or(&self.path)
    }

    /// True when the record reports a duration longer than `max_secs`.
    /// A limit of zero means unlimited; records without a duration pass.
    #[must_use]
    pub fn exceeds_duration(&self, max_secs: u32) -> bool {
        max_secs != 0
            && self
                .duration_ms
                .is_some_and(|d| d > u64::from(max_secs) * 1000)
    }
}

/// Caller-supplied resize parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeParams {
    pub max_width: Option<f64>,
    pub max_height: Option<f64>,
    /// JPEG quality, 1–100.
    pub quality: u8,
}

impl Default for ResizeParams {
    fn default() -> Self {
        Self {
            max_width: None,
            max_height: None,
            quality: 100,
        }
    }
}

impl ResizeParams {
    /// No bounds and full quality: the source file is used untouched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.max_width.is_none() && self.max_height.is_none() && self.quality >= 100
    }
}
