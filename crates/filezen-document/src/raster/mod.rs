// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster surfaces and the page-renderer capability.
//
// Rendering is a capability behind the `PageRenderer` trait. The production
// renderer is PDFium (behind the `pdfium` feature); a `RendererProvider`
// performs the one-time, possibly slow, library initialisation.

#[cfg(feature = "pdfium")]
pub mod pdfium;

use std::sync::Arc;

use filezen_core::error::{FileZenError, Result};
use image::RgbImage;

use crate::pdf::pages::PageSize;

/// Pixel dimensions of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    /// Pixel dimensions for `page` rendered at `scale`, each side rounded to
    /// the nearest pixel. A side that rounds to zero is a content error.
    pub fn for_page(page: PageSize, scale: f32) -> Result<Self> {
        let width = (page.width * scale).round();
        let height = (page.height * scale).round();

        if !(width.is_finite() && height.is_finite()) || width < 1.0 || height < 1.0 {
            return Err(FileZenError::Content(format!(
                "page of {}x{} points renders to an empty surface at scale {scale}",
                page.width, page.height
            )));
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// What to render for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRasterSpec {
    /// 0-based page index.
    pub page_index: usize,
    /// Logical page size in points.
    pub page_size: PageSize,
    /// Exact bitmap size the renderer must produce.
    pub target: PixelSize,
}

/// An opaque RGB bitmap of one rendered page.
pub struct RasterSurface {
    page_index: usize,
    page_size: PageSize,
    image: RgbImage,
}

impl RasterSurface {
    pub fn new(page_index: usize, page_size: PageSize, image: RgbImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FileZenError::Content(format!(
                "page {} rendered to an empty surface",
                page_index + 1
            )));
        }
        Ok(Self {
            page_index,
            page_size,
            image,
        })
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Logical size of the source page in points.
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_rgb(self) -> RgbImage {
        self.image
    }
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("page_index", &self.page_index)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

/// Renders PDF pages to opaque RGB surfaces.
///
/// Surfaces are handed to `sink` one at a time, in ascending page order, so
/// at most one page bitmap needs to be alive at once. `specs` is sorted by
/// page index. When `sink` returns an
/// error, rendering stops and the error is returned unchanged.
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    fn render_pages(
        &self,
        pdf: &[u8],
        specs: &[PageRasterSpec],
        sink: &mut dyn FnMut(RasterSurface) -> Result<()>,
    ) -> Result<()>;
}

/// One-time initialisation of a page renderer.
pub trait RendererProvider: Send + Sync {
    /// Bind and initialise the renderer. Called at most once per pipeline.
    fn initialise(&self) -> Result<Arc<dyn PageRenderer>>;
}

/// A provider wrapping a renderer that needs no initialisation.
#[derive(Clone)]
pub struct ReadyRenderer(Arc<dyn PageRenderer>);

impl ReadyRenderer {
    pub fn new(renderer: impl PageRenderer + 'static) -> Self {
        Self(Arc::new(renderer))
    }
}

impl RendererProvider for ReadyRenderer {
    fn initialise(&self) -> Result<Arc<dyn PageRenderer>> {
        Ok(Arc::clone(&self.0))
    }
}
