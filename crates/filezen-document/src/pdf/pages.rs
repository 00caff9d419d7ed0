// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry and page-tree plumbing over `lopdf` objects: effective page
// boxes with inheritance, and cross-document page copying.

use std::collections::HashMap;

use filezen_core::error::{FileZenError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::warn;

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against malformed page trees whose /Parent chain loops.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when a page carries no usable /MediaBox.
const FALLBACK_SIZE: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

/// Logical page dimensions in PDF points (1/72 inch), after /Rotate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions agree with `other` within `tolerance` points.
    pub fn approx_eq(&self, other: &PageSize, tolerance: f32) -> bool {
        (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// A placement rectangle in page space, origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// The rectangle covering a whole page.
    pub fn full_page(size: PageSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width,
            height: size.height,
        }
    }
}

// -- Geometry -----------------------------------------------------------------

/// Look up `key` on the page or the nearest ancestor that defines it.
pub(crate) fn inherited<'a>(
    document: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = document.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Compute the displayed size of a page: its /CropBox clipped to the
/// /MediaBox, swapped for 90 and 270 degree rotations.
pub(crate) fn page_size(document: &Document, page_id: ObjectId) -> Result<PageSize> {
    let page = document.get_dictionary(page_id).map_err(|err| {
        FileZenError::CorruptDocument(format!("cannot read page object {page_id:?}: {err}"))
    })?;

    let media = inherited(document, page, b"MediaBox").and_then(|obj| read_box(document, obj));
    let crop = inherited(document, page, b"CropBox").and_then(|obj| read_box(document, obj));
    let size = match (media, crop) {
        (Some(media), Some(crop)) => media.intersect(&crop).size(),
        (Some(media), None) => media.size(),
        (None, _) => {
            warn!(?page_id, "page has no usable MediaBox, assuming US Letter");
            FALLBACK_SIZE
        }
    };

    let rotation = inherited(document, page, b"Rotate")
        .and_then(|obj| resolve(document, obj))
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0)
        .rem_euclid(360);

    if rotation == 90 || rotation == 270 {
        Ok(PageSize::new(size.height, size.width))
    } else {
        Ok(size)
    }
}

/// A page boundary box with normalised corners.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageBox {
    left: f32,
    bottom: f32,
    right: f32,
    top: f32,
}

impl PageBox {
    /// Overlap of two boxes. Disjoint boxes give an empty box.
    fn intersect(&self, other: &PageBox) -> PageBox {
        let left = self.left.max(other.left);
        let bottom = self.bottom.max(other.bottom);
        PageBox {
            left,
            bottom,
            right: self.right.min(other.right).max(left),
            top: self.top.min(other.top).max(bottom),
        }
    }

    fn size(&self) -> PageSize {
        PageSize::new(self.right - self.left, self.top - self.bottom)
    }
}

/// Parse a `[x0 y0 x1 y1]` rectangle.
fn read_box(document: &Document, object: &Object) -> Option<PageBox> {
    let values = resolve(document, object)?.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut coords = [0.0f32; 4];
    for (slot, value) in coords.iter_mut().zip(values) {
        *slot = number(resolve(document, value)?)?;
    }
    Some(PageBox {
        left: coords[0].min(coords[2]),
        bottom: coords[1].min(coords[3]),
        right: coords[0].max(coords[2]),
        top: coords[1].max(coords[3]),
    })
}

/// Whether `dict` is a /Page or /Pages node.
fn is_page_tree_node(dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(name) if name == b"Page" || name == b"Pages"
    )
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

// -- Page tree ----------------------------------------------------------------

/// Resolve the object id of the document's root /Pages node.
pub(crate) fn pages_root(document: &Document) -> Result<ObjectId> {
    document
        .catalog()
        .map_err(|err| FileZenError::CorruptDocument(format!("no catalog: {err}")))
        .and_then(|catalog| {
            catalog
                .get(b"Pages")
                .map_err(|err| FileZenError::CorruptDocument(format!("no /Pages: {err}")))
                .and_then(|pages_ref| match pages_ref {
                    Object::Reference(id) => Ok(*id),
                    _ => Err(FileZenError::CorruptDocument(
                        "/Pages is not a reference".to_string(),
                    )),
                })
        })
}

/// Append an existing page object to the end of the root /Kids array.
pub(crate) fn append_to_page_tree(
    document: &mut Document,
    pages_id: ObjectId,
    page_id: ObjectId,
) -> Result<()> {
    let Ok(Object::Dictionary(pages_dict)) = document.get_object_mut(pages_id) else {
        return Err(FileZenError::CorruptDocument(
            "/Pages root is not a dictionary".into(),
        ));
    };

    match pages_dict.get_mut(b"Kids") {
        Ok(Object::Array(kids)) => kids.push(Object::Reference(page_id)),
        _ => pages_dict.set("Kids", vec![Object::Reference(page_id)]),
    }

    let count = pages_dict
        .get(b"Count")
        .ok()
        .and_then(|count| count.as_i64().ok())
        .unwrap_or(0);
    pages_dict.set("Count", Object::Integer(count + 1));

    Ok(())
}

// -- Cross-document copying ---------------------------------------------------

/// Copies pages, and everything they reference, from one document into
/// another.
///
/// Each source object is copied at most once per copier, so resources shared
/// between pages (fonts, images) stay shared in the target, and reference
/// cycles such as an annotation's /P back-pointer terminate.
pub(crate) struct PageCopier<'a> {
    source: &'a Document,
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> PageCopier<'a> {
    pub(crate) fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: HashMap::new(),
        }
    }

    /// Copy one page under the target's `/Pages` node `parent`, returning its
    /// new id. Inherited attributes are flattened onto the copy because the
    /// source ancestors are not carried across.
    pub(crate) fn copy_page(
        &mut self,
        target: &mut Document,
        page_id: ObjectId,
        parent: ObjectId,
    ) -> Result<ObjectId> {
        let page = self.source.get_dictionary(page_id).map_err(|err| {
            FileZenError::CorruptDocument(format!("cannot read page object {page_id:?}: {err}"))
        })?;

        let mut flattened = page.clone();
        for key in INHERITABLE_KEYS {
            if !flattened.has(key)
                && let Some(value) = inherited(self.source, page, key)
            {
                flattened.set(key.to_vec(), value.clone());
            }
        }

        let new_id = match self.copied.get(&page_id) {
            Some(id) => *id,
            None => {
                let id = target.new_object_id();
                self.copied.insert(page_id, id);
                id
            }
        };

        let mut cloned = self.clone_dictionary(target, &flattened)?;
        cloned.set("Parent", Object::Reference(parent));
        target.objects.insert(new_id, Object::Dictionary(cloned));
        Ok(new_id)
    }

    fn clone_object(&mut self, target: &mut Document, object: &Object) -> Result<Object> {
        match object {
            Object::Reference(id) => Ok(Object::Reference(self.clone_reference(target, *id)?)),
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.clone_dictionary(target, dict)?)),
            Object::Array(items) => {
                let mut cloned = Vec::with_capacity(items.len());
                for item in items {
                    cloned.push(self.clone_object(target, item)?);
                }
                Ok(Object::Array(cloned))
            }
            Object::Stream(stream) => {
                let dict = self.clone_dictionary(target, &stream.dict)?;
                Ok(Object::Stream(Stream::new(dict, stream.content.clone())))
            }
            other => Ok(other.clone()),
        }
    }

    /// Page tree /Parent links are skipped: `copy_page` patches the page's
    /// own parent, and the source tree would drag every other page along.
    /// Other parent chains, such as form field hierarchies, are copied.
    fn clone_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Result<Dictionary> {
        let skip_parent = is_page_tree_node(dict);
        let mut cloned = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" && (skip_parent || self.is_page_tree_reference(value)) {
                continue;
            }
            cloned.set(key.clone(), self.clone_object(target, value)?);
        }
        Ok(cloned)
    }

    fn is_page_tree_reference(&self, value: &Object) -> bool {
        value
            .as_reference()
            .and_then(|id| self.source.get_dictionary(id))
            .is_ok_and(is_page_tree_node)
    }

    fn clone_reference(&mut self, target: &mut Document, id: ObjectId) -> Result<ObjectId> {
        if let Some(existing) = self.copied.get(&id) {
            return Ok(*existing);
        }

        // Reserve the id first so cycles back to `id` resolve to it.
        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);

        let cloned = match self.source.get_object(id) {
            Ok(referenced) => self.clone_object(target, referenced)?,
            Err(err) => {
                warn!(?id, %err, "cannot resolve reference, using Null");
                Object::Null
            }
        };
        target.objects.insert(new_id, cloned);
        Ok(new_id)
    }
}
