// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF document handle: open, inspect, assemble, encrypt, decrypt, and
// serialise PDF documents using the `lopdf` crate.

use std::collections::{BTreeMap, HashSet};

use filezen_core::error::{FileZenError, Result};
use filezen_core::types::{Credential, PermissionSet};
use lopdf::content::{Content, Operation};
use lopdf::xref::XrefEntry;
use lopdf::{Dictionary, Document, Object, ObjectId, Reader, Stream, dictionary};
use tracing::{debug, info, instrument, warn};

use super::pages::{self, PageCopier, PageSize, Rect};
use super::security;

/// Handle to a page added with [`PdfDocument::add_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef(ObjectId);

/// Handle to an image embedded with [`PdfDocument::embed_jpeg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    id: ObjectId,
    width_px: u32,
    height_px: u32,
}

impl ImageRef {
    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    /// Resource name used to reference the image from content streams.
    fn resource_name(&self) -> String {
        format!("Im{}", self.id.0)
    }
}

/// An in-memory, page-addressable PDF.
///
/// Pages are addressed by 0-based index in visual order. Mutating operations
/// take `&mut self`, so a document can never be serialised while a page copy
/// into it is still in flight.
pub struct PdfDocument {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// Create an empty document with a catalog and an empty page tree, ready
    /// to be used as an assembly target.
    pub fn empty() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self { document }
    }

    /// Open a PDF from raw bytes.
    ///
    /// A document encrypted with an empty user password opens transparently.
    /// Any other encrypted document fails with
    /// [`FileZenError::Authentication`].
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn open(data: &[u8]) -> Result<Self> {
        let mut document = load(data)?;

        if document.is_encrypted() {
            // lopdf decrypts at load time when the empty user password works.
            if document.encryption_state.is_none() {
                return Err(FileZenError::Authentication(
                    "document is password protected".into(),
                ));
            }
            security::strip_encryption(&mut document);
        }

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Open a PDF, supplying `credential` as the decryption password.
    ///
    /// Either the user or the owner password is accepted. Documents that are
    /// not encrypted open unchanged.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn open_with_password(data: &[u8], credential: &Credential) -> Result<Self> {
        let mut document = load(data)?;

        if document.is_encrypted() {
            if document.encryption_state.is_some() {
                document
                    .authenticate_password(credential.expose())
                    .map_err(security::map_decryption_error)?;
            } else {
                document = parse_encrypted_objects(data, document);
                document
                    .decrypt(credential.expose())
                    .map_err(security::map_decryption_error)?;
            }
            security::strip_encryption(&mut document);
            info!("PDF decrypted");
        }

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Logical size of the page at `index` (0-based).
    pub fn page_size(&self, index: usize) -> Result<PageSize> {
        let page_id = self.page_id(index)?;
        pages::page_size(&self.document, page_id)
    }

    /// Logical sizes of every page, in order.
    pub fn page_sizes(&self) -> Result<Vec<PageSize>> {
        self.page_ids()
            .into_iter()
            .map(|page_id| pages::page_size(&self.document, page_id))
            .collect()
    }

    pub fn is_encrypted(&self) -> bool {
        self.document.is_encrypted()
    }

    /// Page object ids in visual order.
    fn page_ids(&self) -> Vec<ObjectId> {
        // lopdf keys pages by 1-indexed page number, already sorted.
        self.document.get_pages().into_values().collect()
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        let page_ids = self.page_ids();
        page_ids.get(index).copied().ok_or_else(|| {
            FileZenError::InputValidation(format!(
                "page {} out of range (document has {} pages)",
                index,
                page_ids.len()
            ))
        })
    }

    // -- Assembly -------------------------------------------------------------

    /// Append copies of `source`'s pages at `indices` to the end of this
    /// document, in the order given.
    #[instrument(skip_all, fields(count = indices.len()))]
    pub fn copy_pages_from(&mut self, source: &PdfDocument, indices: &[usize]) -> Result<()> {
        let source_ids = source.page_ids();
        let pages_id = pages::pages_root(&self.document)?;
        let mut copier = PageCopier::new(&source.document);

        for &index in indices {
            let page_id = *source_ids.get(index).ok_or_else(|| {
                FileZenError::InputValidation(format!(
                    "page {} out of range (source has {} pages)",
                    index,
                    source_ids.len()
                ))
            })?;
            let new_id = copier.copy_page(&mut self.document, page_id, pages_id)?;
            pages::append_to_page_tree(&mut self.document, pages_id, new_id)?;
        }

        debug!(pages = self.page_count(), "pages copied");
        Ok(())
    }

    /// Append every page of `source`, preserving its order.
    pub fn copy_all_pages_from(&mut self, source: &PdfDocument) -> Result<()> {
        let indices: Vec<usize> = (0..source.page_count()).collect();
        self.copy_pages_from(source, &indices)
    }

    /// Append a blank page of the given size.
    pub fn add_page(&mut self, size: PageSize) -> Result<PageRef> {
        let pages_id = pages::pages_root(&self.document)?;
        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::from(size.width),
                Object::from(size.height),
            ],
            "Resources" => Dictionary::new(),
        });
        pages::append_to_page_tree(&mut self.document, pages_id, page_id)?;
        Ok(PageRef(page_id))
    }

    /// Embed baseline JPEG bytes as an image XObject without re-encoding.
    pub fn embed_jpeg(&mut self, jpeg: Vec<u8>, width_px: u32, height_px: u32) -> Result<ImageRef> {
        if width_px == 0 || height_px == 0 {
            return Err(FileZenError::Content(format!(
                "cannot embed a {width_px}x{height_px} image"
            )));
        }

        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width_px),
            "Height" => i64::from(height_px),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        let id = self.document.add_object(Stream::new(dict, jpeg));

        Ok(ImageRef {
            id,
            width_px,
            height_px,
        })
    }

    /// Paint `image` into `rect` on `page`.
    pub fn draw_image(&mut self, page: PageRef, image: ImageRef, rect: Rect) -> Result<()> {
        let name = image.resource_name();
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::from(rect.width),
                        0.into(),
                        0.into(),
                        Object::from(rect.height),
                        Object::from(rect.x),
                        Object::from(rect.y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content.encode().map_err(|err| {
            FileZenError::Content(format!("failed to encode page content: {err}"))
        })?;
        let content_id = self.document.add_object(Stream::new(Dictionary::new(), encoded));

        let Ok(Object::Dictionary(page_dict)) = self.document.get_object_mut(page.0) else {
            return Err(FileZenError::Content("page object is not a dictionary".into()));
        };

        if !page_dict.has(b"Resources") {
            page_dict.set("Resources", Dictionary::new());
        }
        let Ok(Object::Dictionary(resources)) = page_dict.get_mut(b"Resources") else {
            return Err(FileZenError::Content("page resources must be inline".into()));
        };
        if !resources.has(b"XObject") {
            resources.set("XObject", Dictionary::new());
        }
        let Ok(Object::Dictionary(xobjects)) = resources.get_mut(b"XObject") else {
            return Err(FileZenError::Content("page XObjects must be inline".into()));
        };
        xobjects.set(name, Object::Reference(image.id));

        if page_dict.has(b"Contents") {
            if let Ok(contents) = page_dict.get_mut(b"Contents") {
                match contents {
                    Object::Array(streams) => streams.push(Object::Reference(content_id)),
                    existing => {
                        let previous = existing.clone();
                        *existing = Object::Array(vec![previous, Object::Reference(content_id)]);
                    }
                }
            }
        } else {
            page_dict.set("Contents", Object::Reference(content_id));
        }

        Ok(())
    }

    // -- Security -------------------------------------------------------------

    /// Encrypt the document with `credential` as both the user and the owner
    /// password, granting only `permissions`.
    #[instrument(skip_all)]
    pub fn encrypt(&mut self, credential: &Credential, permissions: &PermissionSet) -> Result<()> {
        if credential.is_empty() {
            return Err(FileZenError::InputValidation("a password is required".into()));
        }
        if self.document.is_encrypted() {
            return Err(FileZenError::InputValidation(
                "document is already encrypted".into(),
            ));
        }
        security::encrypt(&mut self.document, credential, permissions)?;
        info!(?permissions, "PDF encrypted");
        Ok(())
    }

    /// Permission flags recorded in an encrypted PDF, read without a password.
    /// `None` when the document is not encrypted.
    pub fn inspect_permissions(data: &[u8]) -> Result<Option<PermissionSet>> {
        let document = load(data)?;
        Ok(security::read_permissions(&document))
    }

    // -- Output ---------------------------------------------------------------

    /// Compress uncompressed content streams with Flate. Streams that already
    /// carry a filter (such as embedded JPEGs) are left untouched.
    pub fn compress_streams(&mut self) {
        self.document.compress();
    }

    /// Serialise the document to PDF bytes.
    #[instrument(skip_all, fields(pages = self.page_count()))]
    pub fn serialize(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            FileZenError::Content(format!("failed to serialise PDF: {err}"))
        })?;
        debug!(output_bytes = output.len(), "PDF serialised");
        Ok(output)
    }
}

/// Parse raw bytes, classifying failures into the error taxonomy.
fn load(data: &[u8]) -> Result<Document> {
    if !data.starts_with(b"%PDF-") && !data.windows(5).take(1024).any(|w| w == b"%PDF-") {
        return Err(FileZenError::CorruptDocument("missing %PDF header".into()));
    }
    Document::load_mem(data).map_err(|err| match err {
        lopdf::Error::Decryption(detail) => {
            FileZenError::Authentication(format!("cannot decrypt document: {detail}"))
        }
        other => FileZenError::CorruptDocument(format!("failed to load PDF from memory: {other}")),
    })
}

/// lopdf leaves the indirect objects of a file it could not open with the
/// empty user password unparsed. Read them from the cross-reference table so
/// `decrypt` has something to work on.
fn parse_encrypted_objects(data: &[u8], document: Document) -> Document {
    let start = data.windows(5).position(|w| w == b"%PDF-").unwrap_or(0);
    let reader = Reader {
        buffer: &data[start..],
        document,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };

    let mut parsed = Vec::new();
    for (&number, entry) in &reader.document.reference_table.entries {
        let XrefEntry::Normal { generation, .. } = *entry else {
            continue;
        };
        let id = (number, generation);
        if reader.document.objects.contains_key(&id) {
            continue;
        }
        match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => parsed.push((id, object)),
            Err(err) => warn!(object = number, %err, "skipping unreadable object"),
        }
    }

    let mut document = reader.document;
    debug!(objects = parsed.len(), "encrypted objects parsed");
    document.objects.extend(parsed);
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};

    fn two_page_pdf() -> Vec<u8> {
        let mut doc = PdfDocument::empty();
        doc.add_page(PageSize::new(612.0, 792.0)).unwrap();
        doc.add_page(PageSize::new(842.0, 595.0)).unwrap();
        doc.serialize().unwrap()
    }

    /// A two-page document whose pages each show one line of text.
    fn labelled_pdf() -> PdfDocument {
        let mut doc = PdfDocument::empty();
        for label in ["first", "second"] {
            let page = doc.add_page(PageSize::new(612.0, 792.0)).unwrap();
            let content = format!("BT 72 700 Td ({label}) Tj ET");
            let content_id = doc
                .document
                .add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            if let Ok(Object::Dictionary(page)) = doc.document.get_object_mut(page.0) {
                page.set("Contents", Object::Reference(content_id));
            }
        }
        doc
    }

    fn labels(doc: &PdfDocument) -> Vec<String> {
        doc.page_ids()
            .into_iter()
            .map(|id| {
                let content = doc.document.get_and_decode_page_content(id).unwrap();
                content
                    .operations
                    .iter()
                    .filter(|op| op.operator == "Tj")
                    .map(|op| String::from_utf8_lossy(op.operands[0].as_str().unwrap()).into_owned())
                    .collect()
            })
            .collect()
    }

    /// RC4 encryption as other producers write it: an empty user password and
    /// a separate owner password.
    fn owner_locked(mut doc: PdfDocument) -> Vec<u8> {
        let id = Object::string_literal("0123456789abcdef");
        doc.document.trailer.set("ID", vec![id.clone(), id]);
        let version = EncryptionVersion::V2 {
            document: &doc.document,
            owner_password: "owner",
            user_password: "",
            key_length: 128,
            permissions: Permissions::PRINTABLE,
        };
        let state = EncryptionState::try_from(version).unwrap();
        doc.document.encrypt(&state).unwrap();
        doc.serialize().unwrap()
    }

    #[test]
    fn empty_document_has_no_pages() {
        let doc = PdfDocument::empty();
        assert_eq!(doc.page_count(), 0);
    }

    #[test]
    fn added_pages_round_trip() {
        let doc = PdfDocument::open(&two_page_pdf()).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(
            doc.page_sizes().unwrap(),
            vec![PageSize::new(612.0, 792.0), PageSize::new(842.0, 595.0)]
        );
    }

    #[test]
    fn garbage_is_corrupt() {
        let result = PdfDocument::open(b"definitely not a pdf");
        assert!(matches!(result, Err(FileZenError::CorruptDocument(_))));
    }

    #[test]
    fn out_of_range_page_rejected() {
        let doc = PdfDocument::open(&two_page_pdf()).unwrap();
        assert!(doc.page_size(2).is_err());
    }

    #[test]
    fn copy_preserves_requested_order() {
        let source = PdfDocument::open(&two_page_pdf()).unwrap();
        let mut target = PdfDocument::empty();
        target.copy_pages_from(&source, &[1, 0]).unwrap();
        assert_eq!(
            target.page_sizes().unwrap(),
            vec![PageSize::new(842.0, 595.0), PageSize::new(612.0, 792.0)]
        );
    }

    #[test]
    fn drawn_image_is_registered_on_page() {
        let mut doc = PdfDocument::empty();
        let page = doc.add_page(PageSize::new(100.0, 50.0)).unwrap();
        // A JPEG header is all the embedder needs; nothing decodes it here.
        let image = doc.embed_jpeg(vec![0xFF, 0xD8, 0xFF, 0xD9], 200, 100).unwrap();
        doc.draw_image(page, image, Rect::full_page(PageSize::new(100.0, 50.0)))
            .unwrap();

        let page_dict = doc.document.get_dictionary(page.0).unwrap();
        let resources = page_dict.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert!(xobjects.has(image.resource_name().as_bytes()));
        assert!(page_dict.has(b"Contents"));
    }

    #[test]
    fn zero_sized_image_rejected() {
        let mut doc = PdfDocument::empty();
        assert!(matches!(
            doc.embed_jpeg(vec![0xFF, 0xD8], 0, 10),
            Err(FileZenError::Content(_))
        ));
    }

    #[test]
    fn empty_password_rejected_before_encryption() {
        let mut doc = PdfDocument::open(&two_page_pdf()).unwrap();
        let result = doc.encrypt(&Credential::new(""), &PermissionSet::default());
        assert!(matches!(result, Err(FileZenError::InputValidation(_))));
    }

    #[test]
    fn password_protected_document_round_trips() {
        let mut doc = labelled_pdf();
        doc.encrypt(&Credential::new("s3cret"), &PermissionSet::default())
            .unwrap();
        let protected = doc.serialize().unwrap();

        assert!(matches!(
            PdfDocument::open(&protected),
            Err(FileZenError::Authentication(_))
        ));
        assert!(matches!(
            PdfDocument::open_with_password(&protected, &Credential::new("wrong")),
            Err(FileZenError::Authentication(_))
        ));

        let mut unlocked =
            PdfDocument::open_with_password(&protected, &Credential::new("s3cret")).unwrap();
        assert!(!unlocked.is_encrypted());
        assert_eq!(labels(&unlocked), vec!["first", "second"]);

        let reopened = PdfDocument::open(&unlocked.serialize().unwrap()).unwrap();
        assert_eq!(labels(&reopened), vec!["first", "second"]);
    }

    #[test]
    fn empty_user_password_opens_without_double_decryption() {
        let locked = owner_locked(labelled_pdf());

        let doc = PdfDocument::open(&locked).unwrap();
        assert!(!doc.is_encrypted());
        assert_eq!(labels(&doc), vec!["first", "second"]);
    }

    #[test]
    fn owner_password_unlocks_empty_user_password_document() {
        let locked = owner_locked(labelled_pdf());

        let mut doc = PdfDocument::open_with_password(&locked, &Credential::new("owner")).unwrap();
        assert_eq!(labels(&doc), vec!["first", "second"]);
        let reopened = PdfDocument::open(&doc.serialize().unwrap()).unwrap();
        assert_eq!(PdfDocument::inspect_permissions(&doc.serialize().unwrap()).unwrap(), None);
        assert_eq!(labels(&reopened), vec!["first", "second"]);

        assert!(matches!(
            PdfDocument::open_with_password(&locked, &Credential::new("guess")),
            Err(FileZenError::Authentication(_))
        ));
    }
}
