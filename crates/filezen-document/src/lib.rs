// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// filezen-document: collaborator adapters for the FileZen pipeline.
//
// Provides the PDF document handle (open, inspect, copy pages, build image
// pages, encrypt, decrypt, serialise), the raster surface and page renderer
// capability, the image codec (encode surfaces, transcode images within a size
// budget), and SHA-256 fingerprinting of artifacts.

pub mod image;
pub mod integrity;
pub mod pdf;
pub mod raster;

// Re-export the primary structs so callers can use `filezen_document::PdfDocument` etc.
pub use image::codec::{ImageCodec, TranscodeOptions, Transcoded};
pub use image::processor::ImageProcessor;
pub use pdf::document::{ImageRef, PageRef, PdfDocument};
pub use pdf::pages::{PageSize, Rect};
pub use raster::{PageRasterSpec, PageRenderer, PixelSize, RasterSurface, ReadyRenderer, RendererProvider};

#[cfg(feature = "pdfium")]
pub use raster::pdfium::{PdfiumProvider, PdfiumRenderer};
