//! Filesystem-level resizing: read a picked file, write a scaled copy.

use std::path::{Path, PathBuf};

use {async_trait::async_trait, tracing::debug};

use crate::{
    error::{Context, Result},
    image_ops,
    record::ResizeParams,
};

/// Produces the file handed back to the caller for a still image.
#[async_trait]
pub trait ImageResizer: Send + Sync {
    /// Returns `source` itself when nothing needs to change, otherwise the
    /// path of a new scaled copy. The source file is never modified.
    async fn resize_if_needed(&self, source: &Path, params: ResizeParams) -> Result<PathBuf>;
}

/// Writes `<stem>---<uuid>.jpg` copies into an output directory. Every call
/// gets a fresh name, so sources sharing a stem never collide.
pub struct FsImageResizer {
    output_dir: PathBuf,
}

impl FsImageResizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn scaled_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        self.output_dir
            .join(format!("{stem}---{}.jpg", uuid::Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl ImageResizer for FsImageResizer {
    async fn resize_if_needed(&self, source: &Path, params: ResizeParams) -> Result<PathBuf> {
        if params.is_noop() {
            return Ok(source.to_path_buf());
        }

        let source = source.to_path_buf();
        let target = self.scaled_path(&source);
        let output_dir = self.output_dir.clone();

        tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            let data = std::fs::read(&source)
                .with_context(|| format!("failed to read {}", source.display()))?;
            let meta = image_ops::get_image_metadata(&data)?;
            let (w, h) =
                image_ops::scaled_dimensions(meta.width, meta.height, params.max_width, params.max_height);

            if (w, h) == (meta.width, meta.height) && params.quality >= 100 {
                debug!(path = %source.display(), "image already within bounds");
                return Ok(source);
            }

            let img = image_ops::resize_to_bounds(
                image_ops::decode(&data)?,
                params.max_width,
                params.max_height,
            );
            let jpeg = image_ops::encode_jpeg_with_quality(&img, params.quality)?;

            std::fs::create_dir_all(&output_dir)?;
            std::fs::write(&target, jpeg)?;
            debug!(
                from = %source.display(),
                to = %target.display(),
                width = w,
                height = h,
                quality = params.quality,
                "wrote scaled image"
            );
            Ok(target)
        })
        .await?
    }
}
