// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image codec: encode rendered surfaces, and transcode standalone images
// between formats within a quality-derived size ceiling.

use filezen_core::error::Result;
use filezen_core::types::TargetFormat;
use tracing::{debug, instrument};

use super::processor::ImageProcessor;
use crate::raster::RasterSurface;

const MIB: u64 = 1024 * 1024;

/// Lowest JPEG quality the size-budget search will step down to.
const MIN_SEARCH_QUALITY: u8 = 10;
const SEARCH_STEP: u8 = 10;

/// Byte ceiling for a transcode at `quality_percent` (clamped to 10..=100).
///
/// 100 allows 10 MiB; below that the ceiling is `quality / 20` MiB. The curve
/// is non-decreasing, so asking for more quality never tightens the budget.
pub fn size_ceiling_bytes(quality_percent: u8) -> u64 {
    let quality = u64::from(quality_percent.clamp(10, 100));
    if quality == 100 {
        10 * MIB
    } else {
        quality * MIB / 20
    }
}

/// Knobs for [`ImageCodec::transcode`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscodeOptions {
    pub target: TargetFormat,
    /// Coarse quality on the 10..=100 scale.
    pub quality_percent: u8,
    /// Linear scale applied to both sides, in (0, 1].
    pub resize_scale: f32,
    /// Optional cap on the longest side, applied after `resize_scale`.
    pub max_dimension: Option<u32>,
}

/// Output of a transcode.
#[derive(Debug, Clone)]
pub struct Transcoded {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Lossy quality actually used; `None` for lossless formats.
    pub quality_used: Option<u8>,
    /// Whether `bytes` fits under [`size_ceiling_bytes`].
    pub within_ceiling: bool,
}

/// Stateless façade over [`ImageProcessor`] for the two codec roles.
pub struct ImageCodec;

impl ImageCodec {
    /// Encode a rendered page, consuming its pixel buffer. `quality` is a unit
    /// fraction in (0, 1] and only affects lossy formats.
    #[instrument(skip_all, fields(page = surface.page_index(), ?format, quality))]
    pub fn encode_surface(
        surface: RasterSurface,
        format: TargetFormat,
        quality: f32,
    ) -> Result<Vec<u8>> {
        let processor = ImageProcessor::from_rgb(surface.into_rgb());
        let bytes = processor.encode(format, unit_to_percent(quality))?;
        debug!(output_bytes = bytes.len(), "surface encoded");
        Ok(bytes)
    }

    /// Decode arbitrary raster bytes, resize, and re-encode into
    /// `options.target`.
    ///
    /// For JPEG, quality steps down from the requested value until the output
    /// fits the size ceiling; if nothing fits, the smallest attempt is kept.
    /// PNG, WebP, and BMP are encoded once, ignoring quality.
    #[instrument(skip_all, fields(input_bytes = input.len(), target = ?options.target, quality = options.quality_percent))]
    pub fn transcode(input: &[u8], options: &TranscodeOptions) -> Result<Transcoded> {
        let mut processor = ImageProcessor::from_bytes(input)?.scale_by(options.resize_scale);
        if let Some(max_dimension) = options.max_dimension {
            processor = processor.fit_within(max_dimension);
        }

        let ceiling = size_ceiling_bytes(options.quality_percent);
        let (width, height) = (processor.width(), processor.height());

        if !options.target.is_lossy() {
            let bytes = processor.encode(options.target, 100)?;
            let within_ceiling = bytes.len() as u64 <= ceiling;
            return Ok(Transcoded {
                bytes,
                width,
                height,
                quality_used: None,
                within_ceiling,
            });
        }

        let mut quality = options.quality_percent.clamp(MIN_SEARCH_QUALITY, 100);
        let mut bytes = processor.encode(options.target, quality)?;
        let mut quality_used = quality;
        while bytes.len() as u64 > ceiling && quality > MIN_SEARCH_QUALITY {
            quality = quality.saturating_sub(SEARCH_STEP).max(MIN_SEARCH_QUALITY);
            let attempt = processor.encode(options.target, quality)?;
            if attempt.len() < bytes.len() || attempt.len() as u64 <= ceiling {
                bytes = attempt;
                quality_used = quality;
            }
        }

        let within_ceiling = bytes.len() as u64 <= ceiling;
        debug!(output_bytes = bytes.len(), quality_used, within_ceiling, "image transcoded");

        Ok(Transcoded {
            bytes,
            width,
            height,
            quality_used: Some(quality_used),
            within_ceiling,
        })
    }
}

fn unit_to_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::pages::PageSize;
    use image::{Rgb, RgbImage};

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 3) as u8, 90]));
        ImageProcessor::from_rgb(image).to_png_bytes().unwrap()
    }

    fn options(target: TargetFormat, quality_percent: u8) -> TranscodeOptions {
        TranscodeOptions {
            target,
            quality_percent,
            resize_scale: 1.0,
            max_dimension: None,
        }
    }

    #[test]
    fn ceiling_is_monotonic() {
        let mut previous = 0;
        for quality in 10..=100u8 {
            let ceiling = size_ceiling_bytes(quality);
            assert!(ceiling >= previous, "ceiling dropped at quality {quality}");
            previous = ceiling;
        }
        assert_eq!(size_ceiling_bytes(100), 10 * MIB);
        assert_eq!(size_ceiling_bytes(20), MIB);
    }

    #[test]
    fn same_format_preserves_dimensions() {
        let input = png_fixture(64, 48);
        let out = ImageCodec::transcode(&input, &options(TargetFormat::Png, 100)).unwrap();
        assert_eq!((out.width, out.height), (64, 48));
        assert_eq!(out.quality_used, None);
        let decoded = ImageProcessor::from_bytes(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn resize_scale_applies_to_both_sides() {
        let input = png_fixture(64, 48);
        let mut opts = options(TargetFormat::Jpeg, 80);
        opts.resize_scale = 0.25;
        let out = ImageCodec::transcode(&input, &opts).unwrap();
        assert_eq!((out.width, out.height), (16, 12));
        assert_eq!(out.quality_used, Some(80));
        assert!(out.within_ceiling);
    }

    #[test]
    fn max_dimension_caps_longest_side() {
        let input = png_fixture(200, 100);
        let mut opts = options(TargetFormat::Webp, 50);
        opts.max_dimension = Some(50);
        let out = ImageCodec::transcode(&input, &opts).unwrap();
        assert_eq!((out.width, out.height), (50, 25));
    }

    #[test]
    fn lossless_targets_ignore_quality() {
        let input = png_fixture(32, 32);
        let low = ImageCodec::transcode(&input, &options(TargetFormat::Png, 10)).unwrap();
        let high = ImageCodec::transcode(&input, &options(TargetFormat::Png, 100)).unwrap();
        assert_eq!(low.bytes, high.bytes);
    }

    #[test]
    fn surface_encodes_as_jpeg() {
        let surface =
            RasterSurface::new(0, PageSize::new(10.0, 10.0), RgbImage::new(15, 15)).unwrap();
        let bytes = ImageCodec::encode_surface(surface, TargetFormat::Jpeg, 0.6).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn surface_buffer_moves_into_the_encoder() {
        let surface =
            RasterSurface::new(3, PageSize::new(20.0, 10.0), RgbImage::new(40, 20)).unwrap();
        let dimensions = surface.as_rgb().dimensions();
        let bytes = ImageCodec::encode_surface(surface, TargetFormat::Png, 1.0).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), dimensions);
    }
}
