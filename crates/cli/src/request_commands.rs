use std::{sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    clap::{Args, ValueEnum},
    picker_config::PickerConfig,
    picker_coordinator::{
        CameraDevice, Error as CoordinatorError, HostEventReceiver, Outcome, RequestCoordinator,
        RequestKind, RequestOptions, ResizeParams, ResponseSink, cache_file::FileCache,
        launcher_command::CommandLauncher, permission::PolicyPermissionGate,
        resource::FsResourceResolver,
    },
    picker_media::{FfmpegFrameExtractor, FsImageResizer, ResultPostProcessor},
    tokio::sync::mpsc,
    tracing::{debug, warn},
};

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    PickImage,
    CaptureImage,
    PickVideo,
    CaptureVideo,
}

impl From<KindArg> for RequestKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::PickImage => Self::PickImage,
            KindArg::CaptureImage => Self::CaptureImage,
            KindArg::PickVideo => Self::PickVideo,
            KindArg::CaptureVideo => Self::CaptureVideo,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CameraArg {
    Rear,
    Front,
}

#[derive(Args)]
pub struct RequestArgs {
    #[arg(value_enum)]
    kind: KindArg,
    /// Maximum number of items to select.
    #[arg(long, default_value_t = 1)]
    max_count: u32,
    /// Enable the crop step.
    #[arg(long)]
    crop: bool,
    /// Drop videos longer than this many seconds (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    max_duration: u32,
    /// Offer a "use original" toggle.
    #[arg(long)]
    allow_original: bool,
    #[arg(long, value_enum, default_value = "rear")]
    camera: CameraArg,
    #[arg(long)]
    max_width: Option<f64>,
    #[arg(long)]
    max_height: Option<f64>,
    /// JPEG quality, 1-100.
    #[arg(long)]
    quality: Option<u8>,
    /// Show a camera entry inside the gallery picker.
    #[arg(long)]
    allow_capture: bool,
    #[arg(long)]
    allow_gif: bool,
}

impl RequestArgs {
    fn options(&self) -> RequestOptions {
        RequestOptions {
            max_selection_count: self.max_count,
            crop_enabled: self.crop,
            max_video_duration_secs: self.max_duration,
            allow_original_photo_toggle: self.allow_original,
            preferred_capture_device: match self.camera {
                CameraArg::Rear => CameraDevice::Rear,
                CameraArg::Front => CameraDevice::Front,
            },
            max_width: self.max_width,
            max_height: self.max_height,
            image_quality: self.quality,
            allow_capture_in_picker: self.allow_capture,
            allow_gif: self.allow_gif,
        }
    }
}

#[derive(Args)]
pub struct RecoverArgs {
    /// Resize bound applied to recovered images.
    #[arg(long)]
    max_width: Option<f64>,
    #[arg(long)]
    max_height: Option<f64>,
    #[arg(long)]
    quality: Option<u8>,
}

impl RecoverArgs {
    /// Caller-supplied resize parameters, or `None` to reuse the persisted
    /// ones.
    fn resize(&self, default_quality: u8) -> Option<ResizeParams> {
        if self.max_width.is_none() && self.max_height.is_none() && self.quality.is_none() {
            return None;
        }
        Some(ResizeParams {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: self.quality.unwrap_or(default_quality),
        })
    }
}

/// Wire the production capabilities from `config`.
fn build_coordinator(config: &PickerConfig) -> (Arc<RequestCoordinator>, HostEventReceiver) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let output_dir = config.storage.output_dir();

    let frames = FfmpegFrameExtractor::new(config.media.ffmpeg_path.as_deref(), &output_dir);
    if !frames.is_available() {
        warn!("ffmpeg not found, videos will be delivered without covers");
    }
    let post = ResultPostProcessor::new(
        Arc::new(FsImageResizer::new(&output_dir)),
        Arc::new(frames),
    )
    .with_cover_offset(Duration::from_millis(config.media.cover_frame_offset_ms));

    let coordinator = RequestCoordinator::new(
        Arc::new(FileCache::new(config.storage.cache_path())),
        Arc::new(PolicyPermissionGate::new(
            &config.permissions,
            events_tx.clone(),
        )),
        Arc::new(CommandLauncher::new(&config.launcher, events_tx)),
        Arc::new(FsResourceResolver::new(config.storage.capture_dir())),
        post,
    )
    .with_default_quality(config.media.default_image_quality);
    (Arc::new(coordinator), events_rx)
}

fn print_outcome(outcome: Option<&Outcome>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

pub async fn handle_request(config: &PickerConfig, args: RequestArgs) -> Result<()> {
    let (coordinator, events) = build_coordinator(config);
    let pump = tokio::spawn(Arc::clone(&coordinator).run(events));

    let (sink, rx) = ResponseSink::channel();
    match coordinator
        .begin(args.kind.into(), args.options(), sink)
        .await
    {
        Ok(()) => {},
        // Rejections are delivered on the sink as well.
        Err(e @ (CoordinatorError::AlreadyActive | CoordinatorError::InvalidOptions { .. })) => {
            debug!(error = %e, "request rejected");
        },
        Err(e) => {
            pump.abort();
            return Err(e).context("request failed");
        },
    }

    let outcome = rx.await.context("request ended without an outcome")?;
    pump.abort();
    print_outcome(Some(&outcome))?;
    if let Outcome::Error { code, message } = &outcome {
        anyhow::bail!("{code}: {message}");
    }
    Ok(())
}

pub async fn handle_recover(config: &PickerConfig, args: RecoverArgs) -> Result<()> {
    let (coordinator, _events) = build_coordinator(config);
    let outcome = coordinator
        .retrieve_lost_result(args.resize(config.media.default_image_quality))
        .await?;
    print_outcome(outcome.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recover_without_flags_reuses_persisted_params() {
        let args = RecoverArgs {
            max_width: None,
            max_height: None,
            quality: None,
        };
        assert!(args.resize(90).is_none());

        let args = RecoverArgs {
            max_width: Some(640.0),
            max_height: None,
            quality: None,
        };
        assert_eq!(args.resize(90), Some(ResizeParams {
            max_width: Some(640.0),
            max_height: None,
            quality: 90,
        }));
    }

    #[test]
    fn request_args_map_to_options() {
        let args = RequestArgs {
            kind: KindArg::CaptureVideo,
            max_count: 1,
            crop: false,
            max_duration: 30,
            allow_original: false,
            camera: CameraArg::Front,
            max_width: None,
            max_height: None,
            quality: Some(80),
            allow_capture: false,
            allow_gif: true,
        };
        let options = args.options();
        assert_eq!(RequestKind::from(args.kind), RequestKind::CaptureVideo);
        assert_eq!(options.max_video_duration_secs, 30);
        assert_eq!(options.preferred_capture_device, CameraDevice::Front);
        assert_eq!(options.image_quality, Some(80));
        assert!(options.allow_gif);
        assert!(options.validate().is_ok());
    }
}
