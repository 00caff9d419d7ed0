// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Protect: encrypt a PDF with a password.

use filezen_core::error::{FileZenError, Result};
use filezen_core::types::{InputArtifact, JobKind, MediaKind, OutputArtifact, ProtectSettings};
use filezen_document::PdfDocument;
use filezen_document::integrity::seal;
use tracing::{info, instrument};

use crate::job::{JobContext, TransformJob, require_pdf, require_single, take_single};

/// Encrypts with one password as both the user and the owner secret.
#[derive(Debug, Clone)]
pub struct ProtectJob {
    settings: ProtectSettings,
}

impl ProtectJob {
    pub fn new(settings: ProtectSettings) -> Self {
        Self { settings }
    }
}

impl TransformJob for ProtectJob {
    fn kind(&self) -> JobKind {
        JobKind::Protect
    }

    fn validate(&self, inputs: &[InputArtifact]) -> Result<()> {
        if self.settings.credential.is_empty() {
            return Err(FileZenError::InputValidation("a password is required".into()));
        }
        require_single(self.kind(), inputs)?;
        require_pdf(&inputs[0])
    }

    #[instrument(skip_all, fields(input_bytes = inputs.first().map(InputArtifact::len)))]
    fn run(self: Box<Self>, inputs: Vec<InputArtifact>, ctx: &mut JobContext) -> Result<OutputArtifact> {
        let input = take_single(inputs)?;
        ctx.begin(1);

        let mut document = PdfDocument::open(input.bytes()).map_err(|err| match err {
            FileZenError::Authentication(_) => FileZenError::Authentication(
                "this PDF already has a password; unlock it first".into(),
            ),
            other => other,
        })?;
        document.encrypt(&self.settings.credential, &self.settings.permissions)?;

        ctx.checkpoint()?;
        let bytes = document.serialize()?;
        ctx.advance();
        info!(pages = document.page_count(), "PDF protected");

        Ok(seal(
            bytes,
            format!("{}-protected.pdf", input.stem()),
            MediaKind::Pdf,
        ))
    }
}
