// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Merge: concatenate the pages of several PDFs, in input order.

use filezen_core::error::{FileZenError, Result};
use filezen_core::types::{InputArtifact, JobKind, MediaKind, OutputArtifact};
use filezen_document::PdfDocument;
use filezen_document::integrity::seal;
use tracing::{debug, info, instrument};

use crate::job::{JobContext, TransformJob, require_pdf};

const MERGED_FILENAME: &str = "merged.pdf";

/// Appends every page of every input, preserving both file and page order.
/// One progress unit per source file.
#[derive(Debug, Clone, Default)]
pub struct MergeJob;

impl MergeJob {
    pub fn new() -> Self {
        Self
    }
}

impl TransformJob for MergeJob {
    fn kind(&self) -> JobKind {
        JobKind::Merge
    }

    fn validate(&self, inputs: &[InputArtifact]) -> Result<()> {
        if inputs.len() < 2 {
            return Err(FileZenError::InputValidation(format!(
                "merge needs at least 2 PDFs, got {}",
                inputs.len()
            )));
        }
        inputs.iter().try_for_each(require_pdf)
    }

    #[instrument(skip_all, fields(sources = inputs.len()))]
    fn run(self: Box<Self>, inputs: Vec<InputArtifact>, ctx: &mut JobContext) -> Result<OutputArtifact> {
        ctx.begin(inputs.len());
        let mut output = PdfDocument::empty();

        for input in &inputs {
            ctx.checkpoint()?;
            let source = PdfDocument::open(input.bytes()).map_err(|err| match err {
                FileZenError::Authentication(_) => FileZenError::Authentication(format!(
                    "'{}' is password protected; unlock it before merging",
                    input.name()
                )),
                other => other,
            })?;
            output.copy_all_pages_from(&source)?;
            ctx.limits().check_page_count(output.page_count())?;
            debug!(source = input.name(), pages = source.page_count(), "source appended");
            ctx.advance();
        }

        ctx.checkpoint()?;
        let bytes = output.serialize()?;
        info!(pages = output.page_count(), output_bytes = bytes.len(), "PDFs merged");

        Ok(seal(bytes, MERGED_FILENAME, MediaKind::Pdf))
    }
}
