// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-Export: render every page to an image and bundle them in a ZIP.

use std::io::{Cursor, Write};

use filezen_core::error::{FileZenError, Result};
use filezen_core::types::{InputArtifact, JobKind, MediaKind, OutputArtifact, PageExportSettings};
use filezen_document::integrity::seal;
use filezen_document::{ImageCodec, PdfDocument};
use tracing::{debug, info, instrument};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::raster_specs;
use crate::job::{JobContext, TransformJob, require_pdf, require_single, take_single};

/// Renders pages at `settings.scale` and stores them as
/// `<stem>-page-<n>.<ext>` entries, in page order.
#[derive(Debug, Clone)]
pub struct ExportPagesJob {
    settings: PageExportSettings,
}

impl ExportPagesJob {
    pub fn new(settings: PageExportSettings) -> Self {
        Self { settings }
    }
}

impl TransformJob for ExportPagesJob {
    fn kind(&self) -> JobKind {
        JobKind::ExportPages
    }

    fn requires_renderer(&self) -> bool {
        true
    }

    fn validate(&self, inputs: &[InputArtifact]) -> Result<()> {
        require_single(self.kind(), inputs)?;
        require_pdf(&inputs[0])?;
        self.settings.validate()
    }

    #[instrument(skip_all, fields(scale = self.settings.scale, format = ?self.settings.format))]
    fn run(self: Box<Self>, inputs: Vec<InputArtifact>, ctx: &mut JobContext) -> Result<OutputArtifact> {
        let input = take_single(inputs)?;
        let PageExportSettings {
            scale,
            quality,
            format,
        } = self.settings;

        let source = PdfDocument::open(input.bytes())?;
        let page_count = source.page_count();
        ctx.limits().check_page_count(page_count)?;
        ctx.begin(page_count);

        let specs = raster_specs(&source.page_sizes()?, scale, ctx)?;
        let renderer = ctx.renderer()?;
        let stem = input.stem();
        let mut archive = ZipWriter::new(Cursor::new(Vec::new()));

        ctx.checkpoint()?;
        renderer.render_pages(input.bytes(), &specs, &mut |surface| {
            ctx.checkpoint()?;
            let page_number = surface.page_index() + 1;
            let encoded = ImageCodec::encode_surface(surface, format, quality)?;
            let name = format!("{stem}-page-{page_number}.{}", format.extension());
            // Image payloads are already compressed.
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            archive.start_file(name.as_str(), options).map_err(archive_error)?;
            archive.write_all(&encoded)?;
            debug!(entry = %name, bytes = encoded.len(), "page exported");
            ctx.advance();
            Ok(())
        })?;

        ctx.checkpoint()?;
        let bytes = archive.finish().map_err(archive_error)?.into_inner();
        info!(pages = page_count, output_bytes = bytes.len(), "pages exported");

        Ok(seal(bytes, format!("{stem}-pages.zip"), MediaKind::Zip))
    }
}

fn archive_error(err: zip::result::ZipError) -> FileZenError {
    FileZenError::Encoding(format!("failed to write ZIP archive: {err}"))
}
