//! Request, outcome and persisted-state types.

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

pub use picker_media::{ResizeParams, SelectionRecord, VideoAsset};

use picker_config::CapabilityName;

// ── Requests ────────────────────────────────────────────────────────────────

/// What the caller wants acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    PickImage,
    CaptureImage,
    PickVideo,
    CaptureVideo,
}

impl RequestKind {
    pub const ALL: [Self; 4] = [
        Self::PickImage,
        Self::CaptureImage,
        Self::PickVideo,
        Self::CaptureVideo,
    ];

    /// Host capability that gates this kind.
    pub fn capability(self) -> Capability {
        match self {
            Self::PickImage | Self::PickVideo => Capability::Photos,
            Self::CaptureImage | Self::CaptureVideo => Capability::Camera,
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, Self::PickVideo | Self::CaptureVideo)
    }

    /// File suffix of the capture target, for kinds that write into one.
    pub fn capture_suffix(self) -> Option<&'static str> {
        match self {
            Self::CaptureImage => Some(".jpg"),
            Self::CaptureVideo => Some(".mp4"),
            Self::PickImage | Self::PickVideo => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PickImage => "pick_image",
            Self::CaptureImage => "capture_image",
            Self::PickVideo => "pick_video",
            Self::CaptureVideo => "capture_video",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Photos,
    Camera,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photos => "photos",
            Self::Camera => "camera",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CapabilityName> for Capability {
    fn from(name: CapabilityName) -> Self {
        match name {
            CapabilityName::Photos => Self::Photos,
            CapabilityName::Camera => Self::Camera,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraDevice {
    #[default]
    Rear,
    Front,
}

impl CameraDevice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rear => "rear",
            Self::Front => "front",
        }
    }
}

/// Immutable configuration snapshot taken when a request is admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    pub max_selection_count: u32,
    pub crop_enabled: bool,
    /// 0 = unlimited.
    pub max_video_duration_secs: u32,
    pub allow_original_photo_toggle: bool,
    pub preferred_capture_device: CameraDevice,
    pub max_width: Option<f64>,
    pub max_height: Option<f64>,
    /// 1–100; `None` uses the configured default.
    pub image_quality: Option<u8>,
    /// Show a camera entry inside the gallery picker.
    pub allow_capture_in_picker: bool,
    pub allow_gif: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            max_selection_count: 1,
            crop_enabled: false,
            max_video_duration_secs: 0,
            allow_original_photo_toggle: false,
            preferred_capture_device: CameraDevice::Rear,
            max_width: None,
            max_height: None,
            image_quality: None,
            allow_capture_in_picker: false,
            allow_gif: false,
        }
    }
}

impl RequestOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_selection_count == 0 {
            return Err("max_selection_count must be at least 1".into());
        }
        if let Some(q) = self.image_quality
            && !(1..=100).contains(&q)
        {
            return Err(format!("image_quality must be within 1..=100, got {q}"));
        }
        for (name, bound) in [("max_width", self.max_width), ("max_height", self.max_height)] {
            if let Some(v) = bound
                && !(v.is_finite() && v > 0.0)
            {
                return Err(format!("{name} must be a positive number, got {v}"));
            }
        }
        Ok(())
    }
}

// ── Outcomes ────────────────────────────────────────────────────────────────

/// Closed set of error codes delivered inside [`Outcome::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AlreadyActive,
    PhotoAccessDenied,
    CameraAccessDenied,
    #[serde(rename = "no_available_handler")]
    NoHandlerAvailable,
    InvalidOptions,
    PostProcessingFailed,
}

impl ErrorCode {
    pub fn permission_denied(capability: Capability) -> Self {
        match capability {
            Capability::Photos => Self::PhotoAccessDenied,
            Capability::Camera => Self::CameraAccessDenied,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyActive => "already_active",
            Self::PhotoAccessDenied => "photo_access_denied",
            Self::CameraAccessDenied => "camera_access_denied",
            Self::NoHandlerAvailable => "no_available_handler",
            Self::InvalidOptions => "invalid_options",
            Self::PostProcessingFailed => "post_processing_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful result data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "items", rename_all = "snake_case")]
pub enum Payload {
    Images(Vec<PathBuf>),
    Videos(Vec<VideoAsset>),
    /// The user backed out without choosing anything.
    Empty,
}

/// Terminal value of a request, delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { payload: Payload },
    Error { code: ErrorCode, message: String },
}

impl Outcome {
    pub fn images(paths: Vec<PathBuf>) -> Self {
        Self::Success {
            payload: Payload::Images(paths),
        }
    }

    pub fn videos(assets: Vec<VideoAsset>) -> Self {
        Self::Success {
            payload: Payload::Videos(assets),
        }
    }

    /// Cancellation is a successful, empty result.
    pub fn cancelled() -> Self {
        Self::Success {
            payload: Payload::Empty,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    pub fn already_active() -> Self {
        Self::error(ErrorCode::AlreadyActive, "Image picker is already active")
    }

    pub fn permission_denied(capability: Capability) -> Self {
        let message = match capability {
            Capability::Photos => "The user did not allow photo access.",
            Capability::Camera => "The user did not allow camera access.",
        };
        Self::error(ErrorCode::permission_denied(capability), message)
    }

    pub fn no_handler(kind: RequestKind) -> Self {
        Self::error(
            ErrorCode::NoHandlerAvailable,
            format!("No handler available for {kind}"),
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Error { code, .. } => Some(*code),
            Self::Success { .. } => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success {
                payload: Payload::Empty,
            } => "cancelled",
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        }
    }
}

// ── Host events ─────────────────────────────────────────────────────────────

/// What the external subsystem handed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "records", rename_all = "snake_case")]
pub enum ExternalResult {
    Selected(Vec<SelectionRecord>),
    /// The subsystem wrote into the capture target and returned no records.
    WroteTarget,
    Cancelled,
}

/// A single-fire message from the host, matched to a request by its code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    PermissionResult { code: u32, granted: bool },
    ExternalResult { code: u32, result: ExternalResult },
}

impl HostEvent {
    pub fn code(&self) -> u32 {
        match self {
            Self::PermissionResult { code, .. } | Self::ExternalResult { code, .. } => *code,
        }
    }
}

pub type HostEventSender = tokio::sync::mpsc::UnboundedSender<HostEvent>;
pub type HostEventReceiver = tokio::sync::mpsc::UnboundedReceiver<HostEvent>;

// ── Slot and persisted state ────────────────────────────────────────────────

/// Phase of the single request slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    /// Holds the slot; the permission check has not run yet.
    Admitted,
    AwaitingPermission,
    Launching,
    AwaitingExternalResult,
    Resolved,
}

/// The subset of [`RequestOptions`] needed to redo post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedOptions {
    pub max_width: Option<f64>,
    pub max_height: Option<f64>,
    pub image_quality: Option<u8>,
    pub max_selection_count: u32,
    pub max_video_duration_secs: u32,
}

impl Default for PersistedOptions {
    fn default() -> Self {
        Self::from(&RequestOptions::default())
    }
}

impl From<&RequestOptions> for PersistedOptions {
    fn from(options: &RequestOptions) -> Self {
        Self {
            max_width: options.max_width,
            max_height: options.max_height,
            image_quality: options.image_quality,
            max_selection_count: options.max_selection_count,
            max_video_duration_secs: options.max_video_duration_secs,
        }
    }
}

impl PersistedOptions {
    pub fn resize_params(&self, default_quality: u8) -> ResizeParams {
        ResizeParams {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: self.image_quality.unwrap_or(default_quality),
        }
    }
}

/// Durable projection of the pending request plus, once known, its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub kind: RequestKind,
    #[serde(default)]
    pub options: PersistedOptions,
    /// `file:` URL of the capture target, if one was allocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_locator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Whether `outcome` already went through resizing and cover extraction.
    #[serde(default)]
    pub processed: bool,
    pub saved_at_ms: u64,
}

impl PersistedState {
    pub fn new(kind: RequestKind, options: PersistedOptions) -> Self {
        Self {
            kind,
            options,
            resource_locator: None,
            outcome: None,
            processed: false,
            saved_at_ms: picker_common::time::now_ms(),
        }
    }

    #[must_use]
    pub fn with_locator(mut self, locator: Option<String>) -> Self {
        self.resource_locator = locator;
        self
    }
}
