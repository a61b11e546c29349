//! Pure image operations: metadata probing, bounded resizing and JPEG
//! encoding. No filesystem access; see [`crate::resize`] for that.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, imageops::FilterType};

use crate::error::{Context, Result};

#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
}

/// Read dimensions and format without fully decoding the image.
pub fn get_image_metadata(data: &[u8]) -> Result<ImageMetadata> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("failed to guess image format")?;

    let format = reader.format();
    let (width, height) = reader
        .into_dimensions()
        .context("failed to read image dimensions")?;

    Ok(ImageMetadata {
        width,
        height,
        format,
    })
}

/// Fit `(width, height)` inside the optional bounds, preserving aspect
/// ratio. Never upscales. Non-positive or non-finite bounds are ignored.
#[must_use]
pub fn scaled_dimensions(
    width: u32,
    height: u32,
    max_width: Option<f64>,
    max_height: Option<f64>,
) -> (u32, u32) {
    let usable = |bound: Option<f64>| bound.filter(|b| b.is_finite() && *b > 0.0);
    let w_ratio = usable(max_width).map_or(1.0, |m| m / f64::from(width));
    let h_ratio = usable(max_height).map_or(1.0, |m| m / f64::from(height));
    let ratio = w_ratio.min(h_ratio).min(1.0);

    if ratio >= 1.0 {
        return (width, height);
    }
    let new_w = (f64::from(width) * ratio).round().max(1.0) as u32;
    let new_h = (f64::from(height) * ratio).round().max(1.0) as u32;
    (new_w, new_h)
}

pub fn decode(data: &[u8]) -> Result<DynamicImage> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("failed to guess image format")?
        .decode()
        .context("failed to decode image")
}

/// Downscale `img` to fit the bounds. Returns the input unchanged when it
/// already fits.
#[must_use]
pub fn resize_to_bounds(
    img: DynamicImage,
    max_width: Option<f64>,
    max_height: Option<f64>,
) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (new_w, new_h) = scaled_dimensions(width, height, max_width, max_height);
    if (new_w, new_h) == (width, height) {
        return img;
    }
    img.resize_exact(new_w, new_h, FilterType::Lanczos3)
}

/// Encode as JPEG with the given quality (clamped to 1–100).
pub fn encode_jpeg_with_quality(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut output = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
        &mut output,
        quality.clamp(1, 100),
    );
    // JPEG has no alpha channel.
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .context("failed to encode as JPEG")?;
    Ok(output.into_inner())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod tests {
    use {super::*, rstest::rstest};

    // 1x1 red pixel JPEG
    pub(crate) const TINY_JPEG: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43, 0x00, 0x08, 0x06, 0x06, 0x07, 0x06,
        0x05, 0x08, 0x07, 0x07, 0x07, 0x09, 0x09, 0x08, 0x0A, 0x0C, 0x14, 0x0D, 0x0C, 0x0B, 0x0B,
        0x0C, 0x19, 0x12, 0x13, 0x0F, 0x14, 0x1D, 0x1A, 0x1F, 0x1E, 0x1D, 0x1A, 0x1C, 0x1C, 0x20,
        0x24, 0x2E, 0x27, 0x20, 0x22, 0x2C, 0x23, 0x1C, 0x1C, 0x28, 0x37, 0x29, 0x2C, 0x30, 0x31,
        0x34, 0x34, 0x34, 0x1F, 0x27, 0x39, 0x3D, 0x38, 0x32, 0x3C, 0x2E, 0x33, 0x34, 0x32, 0xFF,
        0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00,
        0x1F, 0x00, 0x00, 0x01, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
        0xFF, 0xC4, 0x00, 0xB5, 0x10, 0x00, 0x02, 0x01, 0x03, 0x03, 0x02, 0x04, 0x03, 0x05, 0x05,
        0x04, 0x04, 0x00, 0x00, 0x01, 0x7D, 0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21,
        0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08,
        0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A,
        0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37,
        0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56,
        0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75,
        0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93,
        0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9,
        0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6,
        0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
        0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
        0xF8, 0xF9, 0xFA, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0xFB, 0xD5,
        0xDB, 0x20, 0xA8, 0xBA, 0xA3, 0xE8, 0xEB, 0xEC, 0x00, 0x3C, 0xF4, 0x76, 0x19, 0xE8, 0x78,
        0xAD, 0x99, 0xA0, 0x19, 0xE0, 0xD0, 0x6A, 0x40, 0x23, 0x9C, 0xD0, 0x07, 0xFF, 0xD9,
    ];

    #[test]
    fn reads_metadata() {
        let meta = get_image_metadata(TINY_JPEG).unwrap();
        assert_eq!((meta.width, meta.height), (1, 1));
        assert_eq!(meta.format, Some(ImageFormat::Jpeg));
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode(b"definitely not an image").is_err());
    }

    #[rstest]
    #[case((4000, 3000), Some(1000.0), None, (1000, 750))]
    #[case((4000, 3000), None, Some(300.0), (400, 300))]
    #[case((4000, 3000), Some(1000.0), Some(300.0), (400, 300))]
    #[case((800, 600), Some(1000.0), Some(1000.0), (800, 600))]
    #[case((800, 600), Some(0.0), Some(f64::NAN), (800, 600))]
    #[case((1000, 10), Some(10.0), None, (10, 1))]
    fn fits_inside_bounds(
        #[case] dims: (u32, u32),
        #[case] max_w: Option<f64>,
        #[case] max_h: Option<f64>,
        #[case] expected: (u32, u32),
    ) {
        assert_eq!(scaled_dimensions(dims.0, dims.1, max_w, max_h), expected);
    }

    #[test]
    fn resize_and_encode() {
        let img = DynamicImage::new_rgb8(64, 32);
        let small = resize_to_bounds(img, Some(16.0), None);
        assert_eq!(small.dimensions(), (16, 8));

        let jpeg = encode_jpeg_with_quality(&small, 70).unwrap();
        let meta = get_image_metadata(&jpeg).unwrap();
        assert_eq!((meta.width, meta.height), (16, 8));
    }
}
