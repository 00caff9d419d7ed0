// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDFium-backed page renderer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use filezen_core::error::{FileZenError, Result};
use image::imageops::FilterType;
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::{PageRasterSpec, PageRenderer, RasterSurface, RendererProvider};

/// Binds the PDFium shared library on first use.
#[derive(Debug, Clone, Default)]
pub struct PdfiumProvider {
    /// Directory searched before the system library path.
    library_dir: Option<PathBuf>,
}

impl PdfiumProvider {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }
}

impl RendererProvider for PdfiumProvider {
    #[instrument(skip_all)]
    fn initialise(&self) -> Result<Arc<dyn PageRenderer>> {
        let local = self
            .library_dir
            .as_ref()
            .map(|dir| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)));

        let bindings = match local {
            Some(Ok(bindings)) => bindings,
            Some(Err(err)) => {
                warn!(%err, "local PDFium library not usable, trying system library");
                Pdfium::bind_to_system_library().map_err(unavailable)?
            }
            None => Pdfium::bind_to_system_library().map_err(unavailable)?,
        };

        info!("PDFium bound");
        Ok(Arc::new(PdfiumRenderer {
            pdfium: Pdfium::new(bindings),
        }))
    }
}

fn unavailable(err: PdfiumError) -> FileZenError {
    FileZenError::RendererUnavailable(format!("failed to bind PDFium: {err}"))
}

/// Renders pages through a bound PDFium instance.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
}

impl PageRenderer for PdfiumRenderer {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    #[instrument(skip_all, fields(pages = specs.len()))]
    fn render_pages(
        &self,
        pdf: &[u8],
        specs: &[PageRasterSpec],
        sink: &mut dyn FnMut(RasterSurface) -> Result<()>,
    ) -> Result<()> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|err| FileZenError::CorruptDocument(format!("PDFium cannot open document: {err}")))?;

        let wanted: HashMap<usize, &PageRasterSpec> =
            specs.iter().map(|spec| (spec.page_index, spec)).collect();
        let mut rendered = 0usize;

        for (index, page) in document.pages().iter().enumerate() {
            let Some(spec) = wanted.get(&index) else {
                continue;
            };

            let config = PdfRenderConfig::new()
                .set_target_width(spec.target.width as i32)
                .set_maximum_height(spec.target.height as i32);
            let bitmap = page.render_with_config(&config).map_err(|err| {
                FileZenError::Content(format!("failed to render page {}: {err}", index + 1))
            })?;

            let mut image = bitmap.as_image();
            if image.width() != spec.target.width || image.height() != spec.target.height {
                image = image.resize_exact(spec.target.width, spec.target.height, FilterType::Triangle);
            }

            debug!(page = index + 1, width = image.width(), height = image.height(), "page rendered");
            sink(RasterSurface::new(index, spec.page_size, image.to_rgb8())?)?;
            rendered += 1;
        }

        if rendered != specs.len() {
            return Err(FileZenError::Content(format!(
                "PDFium rendered {rendered} of {} requested pages",
                specs.len()
            )));
        }
        Ok(())
    }
}
