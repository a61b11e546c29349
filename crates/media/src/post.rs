//! Turns raw selection records into the artifacts handed to the caller.
//!
//! Images: the precedence-resolved path, passed through the resizer.
//! Videos: the resolved path plus a cover frame that goes through the same
//! resize step as a still image.
//!
//! Failure handling depends on the call shape. A single-record call fails
//! as a whole when its record fails. In a batch, a failing record degrades
//! to its unprocessed path and the rest of the batch is unaffected. A
//! failing cover extraction never fails anything; the asset just has no
//! cover.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

#[cfg(feature = "metrics")]
use picker_metrics::{counter, labels, post_processing as pp_metrics};

use crate::{
    error::Result,
    frame::{COVER_FRAME_OFFSET, FrameExtractor},
    record::{ResizeParams, SelectionRecord},
    resize::ImageResizer,
};

/// A processed video: the file itself and an optional cover still.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAsset {
    pub video_path: PathBuf,
    pub cover_path: Option<PathBuf>,
}

pub struct ResultPostProcessor {
    resizer: Arc<dyn ImageResizer>,
    frames: Arc<dyn FrameExtractor>,
    cover_offset: Duration,
}

impl ResultPostProcessor {
    pub fn new(resizer: Arc<dyn ImageResizer>, frames: Arc<dyn FrameExtractor>) -> Self {
        Self {
            resizer,
            frames,
            cover_offset: COVER_FRAME_OFFSET,
        }
    }

    #[must_use]
    pub fn with_cover_offset(mut self, offset: Duration) -> Self {
        self.cover_offset = offset;
        self
    }

    /// Precedence-resolved path of `record`, resized per `params`.
    pub async fn resolve_image_path(
        &self,
        record: &SelectionRecord,
        params: ResizeParams,
    ) -> Result<PathBuf> {
        self.resizer
            .resize_if_needed(record.resolved_path(), params)
            .await
    }

    /// Resolve every record. See the module docs for the failure rules.
    pub async fn process_images(
        &self,
        records: &[SelectionRecord],
        params: ResizeParams,
    ) -> Result<Vec<PathBuf>> {
        if let [single] = records {
            return Ok(vec![self.resolve_image_path(single, params).await?]);
        }

        let mut paths = Vec::with_capacity(records.len());
        for record in records {
            match self.resolve_image_path(record, params).await {
                Ok(path) => paths.push(path),
                Err(e) => {
                    let fallback = record.resolved_path().to_path_buf();
                    warn!(
                        path = %fallback.display(),
                        error = %e,
                        "resize failed, keeping unprocessed image"
                    );
                    #[cfg(feature = "metrics")]
                    counter!(pp_metrics::FAILURES_TOTAL, labels::STAGE => "resize").increment(1);
                    paths.push(fallback);
                },
            }
        }
        Ok(paths)
    }

    /// Resolve a video and derive its cover.
    pub async fn resolve_video_asset(
        &self,
        record: &SelectionRecord,
        params: ResizeParams,
    ) -> VideoAsset {
        let video_path = record.resolved_path().to_path_buf();
        let cover_path = match self.cover_for(&video_path, params).await {
            Ok(cover) => Some(cover),
            Err(e) => {
                warn!(video = %video_path.display(), error = %e, "no cover frame for video");
                #[cfg(feature = "metrics")]
                counter!(pp_metrics::FAILURES_TOTAL, labels::STAGE => "cover").increment(1);
                None
            },
        };
        VideoAsset {
            video_path,
            cover_path,
        }
    }

    /// Resolve every video record, dropping those longer than
    /// `max_duration_secs` (0 = unlimited).
    pub async fn process_videos(
        &self,
        records: &[SelectionRecord],
        params: ResizeParams,
        max_duration_secs: u32,
    ) -> Vec<VideoAsset> {
        let mut assets = Vec::with_capacity(records.len());
        for record in records {
            if record.exceeds_duration(max_duration_secs) {
                warn!(
                    path = %record.resolved_path().display(),
                    duration_ms = record.duration_ms,
                    max_secs = max_duration_secs,
                    "dropping video over the duration limit"
                );
                #[cfg(feature = "metrics")]
                counter!(pp_metrics::FILTERED_TOTAL).increment(1);
                continue;
            }
            assets.push(self.resolve_video_asset(record, params).await);
        }
        assets
    }

    async fn cover_for(&self, video: &Path, params: ResizeParams) -> Result<PathBuf> {
        let frame = self.frames.extract_frame(video, self.cover_offset).await?;
        self.resizer.resize_if_needed(&frame, params).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::{FakeFrameExtractor, FakeResizer},
    };

    fn processor(resizer: FakeResizer, frames: FakeFrameExtractor) -> ResultPostProcessor {
        ResultPostProcessor::new(Arc::new(resizer), Arc::new(frames))
    }

    fn scaled() -> ResizeParams {
        ResizeParams {
            max_width: Some(100.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn image_path_uses_precedence_then_resize() {
        let post = processor(FakeResizer::new(), FakeFrameExtractor::new());
        let record = SelectionRecord {
            compressed_path: Some("/a".into()),
            cut_path: Some("/b".into()),
            ..SelectionRecord::from_path("/raw")
        };
        let out = post.resolve_image_path(&record, scaled()).await.unwrap();
        assert_eq!(out, PathBuf::from("/a.scaled"));
    }

    #[tokio::test]
    async fn single_record_failure_fails_the_call() {
        let post = processor(
            FakeResizer::new().failing_on("/x.jpg"),
            FakeFrameExtractor::new(),
        );
        let res = post
            .process_images(&[SelectionRecord::from_path("/x.jpg")], scaled())
            .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn batch_failure_degrades_only_that_item() {
        let post = processor(
            FakeResizer::new().failing_on("/y.jpg"),
            FakeFrameExtractor::new(),
        );
        let out = post
            .process_images(
                &[
                    SelectionRecord::from_path("/x.jpg"),
                    SelectionRecord::from_path("/y.jpg"),
                ],
                scaled(),
            )
            .await
            .unwrap();
        assert_eq!(out, vec![
            PathBuf::from("/x.jpg.scaled"),
            PathBuf::from("/y.jpg")
        ]);
    }

    #[tokio::test]
    async fn video_cover_goes_through_resize() {
        let frames = FakeFrameExtractor::new();
        let post = processor(FakeResizer::new(), frames.clone());
        let asset = post
            .resolve_video_asset(&SelectionRecord::from_path("/v.mp4"), scaled())
            .await;
        assert_eq!(asset.video_path, PathBuf::from("/v.mp4"));
        assert_eq!(asset.cover_path, Some(PathBuf::from("/v.mp4.cover.jpg.scaled")));
        assert_eq!(frames.calls(), vec![(PathBuf::from("/v.mp4"), COVER_FRAME_OFFSET)]);
    }

    #[tokio::test]
    async fn cover_failure_is_not_fatal() {
        let post = processor(FakeResizer::new(), FakeFrameExtractor::new().failing());
        let asset = post
            .resolve_video_asset(&SelectionRecord::from_path("/v.mp4"), scaled())
            .await;
        assert_eq!(asset.video_path, Path::new("/v.mp4"));
        assert!(asset.cover_path.is_none());
    }

    #[tokio::test]
    async fn long_videos_are_filtered() {
        let post = processor(FakeResizer::new(), FakeFrameExtractor::new())
            .with_cover_offset(Duration::from_millis(500));
        let short = SelectionRecord {
            duration_ms: Some(10_000),
            ..SelectionRecord::from_path("/short.mp4")
        };
        let long = SelectionRecord {
            duration_ms: Some(90_000),
            ..SelectionRecord::from_path("/long.mp4")
        };
        let assets = post
            .process_videos(&[short, long], ResizeParams::default(), 30)
            .await;
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].video_path, PathBuf::from("/short.mp4"));
    }

    #[test]
    fn video_asset_wire_names() {
        let asset = VideoAsset {
            video_path: "/v.mp4".into(),
            cover_path: None,
        };
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["videoPath"], "/v.mp4");
        assert!(json["coverPath"].is_null());
    }
}
