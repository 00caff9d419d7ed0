// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use filezen_core::error::{FileZenError, Result};
use filezen_core::types::{InputArtifact, MediaKind};
use filezen_document::{PageRasterSpec, PageRenderer, RasterSurface, RendererProvider};
use image::{Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, Stream, dictionary};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// -- PDF fixtures -------------------------------------------------------------

/// A PDF whose pages have the given (width, height) MediaBoxes, each with a
/// short text line.
pub fn pdf_with_pages(sizes: &[(f32, f32)]) -> Vec<u8> {
    build_pdf(sizes, |index| {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Page {}", index + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        content.encode().unwrap_or_default()
    })
}

pub fn letter_pdf(pages: usize) -> Vec<u8> {
    pdf_with_pages(&vec![(612.0, 792.0); pages])
}

/// One letter page carrying tens of thousands of uncompressed filled
/// rectangles.
pub fn vector_heavy_pdf() -> Vec<u8> {
    build_pdf(&[(612.0, 792.0)], |_| {
        let mut ops = String::new();
        for i in 0..20_000u32 {
            let x = (i % 100) as f32 * 6.1;
            let y = (i / 100) as f32 * 3.9;
            let shade = (i % 255) as f32 / 255.0;
            ops.push_str(&format!(
                "{shade:.3} {:.3} 0.5 rg {x:.2} {y:.2} 5.75 3.5 re f\n",
                1.0 - shade
            ));
        }
        ops.into_bytes()
    })
}

/// `letter_pdf(pages)` encrypted the way many producers ship files: RC4 with
/// an empty user password and `owner_password` for the owner role.
pub fn owner_locked_pdf(pages: usize, owner_password: &str) -> Vec<u8> {
    let mut doc = Document::load_mem(&letter_pdf(pages)).unwrap();
    let id = Object::string_literal("fixture-file-id!");
    doc.trailer.set("ID", vec![id.clone(), id]);
    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password,
        user_password: "",
        key_length: 128,
        permissions: Permissions::PRINTABLE,
    };
    let state = EncryptionState::try_from(version).unwrap();
    doc.encrypt(&state).unwrap();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// The text drawn on each page, in page order.
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = doc.get_and_decode_page_content(page_id).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| op.operands.first()?.as_str().ok())
                .map(|text| String::from_utf8_lossy(text).into_owned())
                .collect()
        })
        .collect()
}

fn build_pdf(sizes: &[(f32, f32)], content_for: impl Fn(usize) -> Vec<u8>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::with_capacity(sizes.len());
    for (index, &(width, height)) in sizes.iter().enumerate() {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_for(index)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => sizes.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn pdf_input(name: &str, bytes: Vec<u8>) -> InputArtifact {
    InputArtifact::new(name, MediaKind::Pdf, bytes)
}

pub fn png_input(name: &str, width: u32, height: u32) -> InputArtifact {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 5 % 256) as u8, (y * 3 % 256) as u8, 120])
    });
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    InputArtifact::new(name, MediaKind::Png, bytes)
}

// -- Renderers ----------------------------------------------------------------

/// Produces plain white surfaces of exactly the requested size.
pub struct BlankRenderer;

impl PageRenderer for BlankRenderer {
    fn name(&self) -> &'static str {
        "blank"
    }

    fn render_pages(
        &self,
        pdf: &[u8],
        specs: &[PageRasterSpec],
        sink: &mut dyn FnMut(RasterSurface) -> Result<()>,
    ) -> Result<()> {
        if !pdf.starts_with(b"%PDF") {
            return Err(FileZenError::CorruptDocument("not a PDF".into()));
        }
        for spec in specs {
            let image = RgbImage::from_pixel(
                spec.target.width,
                spec.target.height,
                Rgb([255, 255, 255]),
            );
            sink(RasterSurface::new(spec.page_index, spec.page_size, image)?)?;
        }
        Ok(())
    }
}

/// Counts how often the driver asks for initialisation.
#[derive(Clone, Default)]
pub struct CountingProvider {
    pub initialised: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn count(&self) -> usize {
        self.initialised.load(Ordering::SeqCst)
    }
}

impl RendererProvider for CountingProvider {
    fn initialise(&self) -> Result<Arc<dyn PageRenderer>> {
        self.initialised.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(BlankRenderer))
    }
}

/// Simulates a host where the rendering library cannot be bound.
pub struct MissingLibraryProvider;

impl RendererProvider for MissingLibraryProvider {
    fn initialise(&self) -> Result<Arc<dyn PageRenderer>> {
        Err(FileZenError::RendererUnavailable(
            "libpdfium not found".into(),
        ))
    }
}
