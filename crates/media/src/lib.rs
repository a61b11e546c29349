//! Post-processing of picker results: selection-path precedence, image
//! resizing, video cover extraction and the video duration filter.

pub mod error;
pub mod frame;
pub mod image_ops;
pub mod post;
pub mod record;
pub mod resize;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use {
    error::{Error, Result},
    frame::{COVER_FRAME_OFFSET, FfmpegFrameExtractor, FrameExtractor},
    post::{ResultPostProcessor, VideoAsset},
    record::{ResizeParams, SelectionRecord},
    resize::{FsImageResizer, ImageResizer},
};
