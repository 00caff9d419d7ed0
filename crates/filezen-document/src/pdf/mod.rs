// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: the page-addressable document handle and its helpers.

pub mod document;
pub mod pages;
pub mod security;

pub use document::PdfDocument;
pub use pages::PageSize;
