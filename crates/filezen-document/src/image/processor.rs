// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, scale, and encode one in-memory image using the
// `image` crate.

use filezen_core::error::{FileZenError, Result};
use filezen_core::types::TargetFormat;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, enabling
/// method chaining:
///
/// ```ignore
/// let bytes = ImageProcessor::from_bytes(&input)?
///     .scale_by(0.5)
///     .encode(TargetFormat::Png, 100)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, WebP, BMP, GIF).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            FileZenError::CorruptDocument(format!("failed to decode image: {err}"))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an RGB buffer, such as a rendered page.
    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            image: DynamicImage::ImageRgb8(image),
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Scale both sides by `ratio`, rounding to the nearest pixel and never
    /// below one pixel. A ratio of 1.0 leaves the image untouched.
    #[instrument(skip(self), fields(ratio))]
    pub fn scale_by(self, ratio: f32) -> Self {
        if (ratio - 1.0).abs() < f32::EPSILON {
            return self;
        }
        let width = ((self.image.width() as f32 * ratio).round() as u32).max(1);
        let height = ((self.image.height() as f32 * ratio).round() as u32).max(1);
        self.resize_exact(width, height)
    }

    /// Shrink so the longest side is at most `max_dimension`, preserving
    /// aspect ratio. Images already within bounds are left untouched.
    pub fn fit_within(self, max_dimension: u32) -> Self {
        if self.image.width() <= max_dimension && self.image.height() <= max_dimension {
            return self;
        }
        let resized = self
            .image
            .resize(max_dimension, max_dimension, FilterType::Lanczos3);
        debug!(
            new_w = resized.width(),
            new_h = resized.height(),
            "Fit within bounds"
        );
        Self { image: resized }
    }

    /// Resize the image to exactly `width` x `height`, ignoring aspect ratio.
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        let resized = self
            .image
            .resize_exact(width, height, FilterType::Lanczos3);
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode into `format`. `quality` (1-100) only affects lossy formats.
    pub fn encode(&self, format: TargetFormat, quality: u8) -> Result<Vec<u8>> {
        match format {
            TargetFormat::Jpeg => self.to_jpeg_bytes(quality),
            TargetFormat::Png => encode_to_format(&self.image, ImageFormat::Png),
            // The WebP and BMP encoders take 8-bit RGB or RGBA only.
            TargetFormat::Webp => encode_to_format(&self.eight_bit(), ImageFormat::WebP),
            TargetFormat::Bmp => encode_to_format(&self.eight_bit(), ImageFormat::Bmp),
        }
    }

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as baseline JPEG bytes with the given
    /// quality (1-100). Alpha is discarded.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|err| FileZenError::Encoding(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    fn eight_bit(&self) -> DynamicImage {
        if self.has_alpha() {
            DynamicImage::ImageRgba8(self.image.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(self.image.to_rgb8())
        }
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| FileZenError::Encoding(format!("image encoding failed: {err}")))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    #[test]
    fn scale_by_rounds_dimensions() {
        let processor = ImageProcessor::from_rgb(gradient(101, 50)).scale_by(0.5);
        assert_eq!((processor.width(), processor.height()), (51, 25));
    }

    #[test]
    fn fit_within_preserves_aspect() {
        let processor = ImageProcessor::from_rgb(gradient(400, 200)).fit_within(100);
        assert_eq!((processor.width(), processor.height()), (100, 50));
    }

    #[test]
    fn fit_within_never_upscales() {
        let processor = ImageProcessor::from_rgb(gradient(40, 20)).fit_within(100);
        assert_eq!((processor.width(), processor.height()), (40, 20));
    }

    #[test]
    fn every_format_decodes_back() {
        let processor = ImageProcessor::from_rgb(gradient(32, 16));
        for format in [
            TargetFormat::Jpeg,
            TargetFormat::Png,
            TargetFormat::Webp,
            TargetFormat::Bmp,
        ] {
            let bytes = processor.encode(format, 80).unwrap();
            let decoded = ImageProcessor::from_bytes(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (32, 16), "{format:?}");
        }
    }

    #[test]
    fn alpha_survives_webp() {
        let rgba = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 40]));
        let processor = ImageProcessor {
            image: DynamicImage::ImageRgba8(rgba),
        };
        let bytes = processor.encode(TargetFormat::Webp, 100).unwrap();
        assert!(ImageProcessor::from_bytes(&bytes).unwrap().has_alpha());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ImageProcessor::from_bytes(b"not an image").is_err());
    }
}
