// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job variants: one module per tool.

pub mod compress;
pub mod export;
pub mod merge;
pub mod protect;
pub mod reformat;
pub mod unlock;

pub use compress::CompressJob;
pub use export::ExportPagesJob;
pub use merge::MergeJob;
pub use protect::ProtectJob;
pub use reformat::ReformatJob;
pub use unlock::UnlockJob;

use filezen_core::error::Result;
use filezen_document::{PageSize, PixelSize, PageRasterSpec};

use crate::job::JobContext;

/// Raster specs for every page at `scale`, checked against the surface limit.
pub(crate) fn raster_specs(
    page_sizes: &[PageSize],
    scale: f32,
    ctx: &JobContext,
) -> Result<Vec<PageRasterSpec>> {
    page_sizes
        .iter()
        .enumerate()
        .map(|(page_index, &page_size)| {
            let target = PixelSize::for_page(page_size, scale)?;
            ctx.limits().check_surface(target.width, target.height)?;
            Ok(PageRasterSpec {
                page_index,
                page_size,
                target,
            })
        })
        .collect()
}
