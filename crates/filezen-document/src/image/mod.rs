// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: decode, resize, and re-encode raster images.

pub mod codec;
pub mod processor;

pub use codec::{ImageCodec, TranscodeOptions, Transcoded};
pub use processor::ImageProcessor;
