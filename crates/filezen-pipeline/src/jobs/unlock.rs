// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unlock: decrypt a password-protected PDF.

use filezen_core::error::{FileZenError, Result};
use filezen_core::types::{Credential, InputArtifact, JobKind, MediaKind, OutputArtifact};
use filezen_document::PdfDocument;
use filezen_document::integrity::seal;
use tracing::{info, instrument};

use crate::job::{JobContext, TransformJob, require_pdf, require_single, take_single};

/// Opens with the supplied password and re-serialises without encryption.
/// A wrong password is an authentication error, never a corrupt-document one.
#[derive(Debug, Clone)]
pub struct UnlockJob {
    credential: Credential,
}

impl UnlockJob {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

impl TransformJob for UnlockJob {
    fn kind(&self) -> JobKind {
        JobKind::Unlock
    }

    fn validate(&self, inputs: &[InputArtifact]) -> Result<()> {
        if self.credential.is_empty() {
            return Err(FileZenError::InputValidation(
                "enter the password to unlock this PDF".into(),
            ));
        }
        require_single(self.kind(), inputs)?;
        require_pdf(&inputs[0])
    }

    #[instrument(skip_all)]
    fn run(self: Box<Self>, inputs: Vec<InputArtifact>, ctx: &mut JobContext) -> Result<OutputArtifact> {
        let input = take_single(inputs)?;
        ctx.begin(1);

        let mut document = PdfDocument::open_with_password(input.bytes(), &self.credential)?;

        ctx.checkpoint()?;
        let bytes = document.serialize()?;
        ctx.advance();
        info!(pages = document.page_count(), "PDF unlocked");

        Ok(seal(
            bytes,
            format!("{}-unlocked.pdf", input.stem()),
            MediaKind::Pdf,
        ))
    }
}
