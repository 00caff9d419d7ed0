// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterize-Compress: re-render every page as one JPEG and rebuild the PDF.

use filezen_core::error::Result;
use filezen_core::types::{
    InputArtifact, JobKind, MediaKind, OutputArtifact, RasterizeSettings, SizeReport, TargetFormat,
};
use filezen_document::integrity::seal;
use filezen_document::{ImageCodec, PageSize, PdfDocument, Rect};
use tracing::{info, instrument, warn};

use super::raster_specs;
use crate::job::{JobContext, TransformJob, require_pdf, require_single, take_single};

/// Shrinks a PDF by replacing each page with a lossy raster of itself.
///
/// Every page is rasterised, including pages that are already a single image.
#[derive(Debug, Clone)]
pub struct CompressJob {
    settings: RasterizeSettings,
}

impl CompressJob {
    pub fn new(settings: RasterizeSettings) -> Self {
        Self { settings }
    }
}

impl TransformJob for CompressJob {
    fn kind(&self) -> JobKind {
        JobKind::Compress
    }

    fn requires_renderer(&self) -> bool {
        true
    }

    fn validate(&self, inputs: &[InputArtifact]) -> Result<()> {
        require_single(self.kind(), inputs)?;
        require_pdf(&inputs[0])?;
        self.settings.validate()
    }

    #[instrument(skip_all, fields(scale = self.settings.scale, quality = self.settings.quality))]
    fn run(self: Box<Self>, inputs: Vec<InputArtifact>, ctx: &mut JobContext) -> Result<OutputArtifact> {
        let input = take_single(inputs)?;
        let RasterizeSettings { scale, quality } = self.settings;

        let source = PdfDocument::open(input.bytes())?;
        let page_count = source.page_count();
        ctx.limits().check_page_count(page_count)?;
        ctx.begin(page_count);

        let specs = raster_specs(&source.page_sizes()?, scale, ctx)?;
        let renderer = ctx.renderer()?;
        let mut output = PdfDocument::empty();

        ctx.checkpoint()?;
        renderer.render_pages(input.bytes(), &specs, &mut |surface| {
            ctx.checkpoint()?;
            let (width_px, height_px) = (surface.width(), surface.height());
            let jpeg = ImageCodec::encode_surface(surface, TargetFormat::Jpeg, quality)?;

            // Logical size is pixels over scale, so print size matches the source.
            let logical = PageSize::new(width_px as f32 / scale, height_px as f32 / scale);
            let page = output.add_page(logical)?;
            let image = output.embed_jpeg(jpeg, width_px, height_px)?;
            output.draw_image(page, image, Rect::full_page(logical))?;

            ctx.advance();
            Ok(())
        })?;

        ctx.checkpoint()?;
        output.compress_streams();
        let bytes = output.serialize()?;

        let report = SizeReport::new(input.len() as u64, bytes.len() as u64);
        if report.grew() {
            warn!(ratio = report.ratio(), "compressed output is larger than the input");
        } else {
            info!(pages = page_count, ratio = report.ratio(), "PDF compressed");
        }

        Ok(seal(
            bytes,
            format!("{}-compressed.pdf", input.stem()),
            MediaKind::Pdf,
        ))
    }
}
