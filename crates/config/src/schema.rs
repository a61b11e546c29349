//! Config schema types (storage, permissions, launcher commands, media, metrics).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const APP_NAME: &str = "picker";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    pub storage: StorageConfig,
    pub permissions: PermissionsConfig,
    pub launcher: LauncherConfig,
    pub media: MediaConfig,
    pub metrics: MetricsConfig,
}

/// Where durable state and produced files live.
///
/// Every path is optional; unset paths derive from `data_dir`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    /// JSON file holding the pending-request snapshot and unclaimed outcome.
    pub cache_path: Option<PathBuf>,
    /// Directory for capture targets handed to the camera subsystem.
    pub capture_dir: Option<PathBuf>,
    /// Directory for scaled images and video covers.
    pub output_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".picker"))
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("pending.json"))
    }

    pub fn capture_dir(&self) -> PathBuf {
        self.capture_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("captures"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("processed"))
    }
}

/// Capabilities the host can gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityName {
    Photos,
    Camera,
}

/// How a permission prompt is answered when one is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptAnswer {
    #[default]
    Grant,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Capabilities already granted at startup.
    pub granted: Vec<CapabilityName>,
    /// Capabilities that need an explicit grant at all. A host that never
    /// declared the camera permission leaves `camera` out of this list.
    pub explicit: Vec<CapabilityName>,
    /// Answer given to prompts for capabilities not yet granted.
    pub prompt: PromptAnswer,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            granted: Vec::new(),
            explicit: vec![CapabilityName::Photos, CapabilityName::Camera],
            prompt: PromptAnswer::Grant,
        }
    }
}

/// An external program invoked for one request kind.
///
/// `args` may contain the placeholders `{target}`, `{max_count}`,
/// `{max_duration}`, `{camera}` and `{crop}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub pick_image: Option<CommandSpec>,
    pub capture_image: Option<CommandSpec>,
    pub pick_video: Option<CommandSpec>,
    pub capture_video: Option<CommandSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Offset into the video at which the cover frame is grabbed.
    pub cover_frame_offset_ms: u64,
    /// Explicit ffmpeg binary; falls back to `PATH` lookup.
    pub ffmpeg_path: Option<String>,
    /// JPEG quality used when a request does not set one.
    pub default_image_quality: u8,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cover_frame_offset_ms: 0,
            ffmpeg_path: None,
            default_image_quality: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}
