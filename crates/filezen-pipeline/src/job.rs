// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The transformation job contract and the per-run context handed to it.

use std::sync::Arc;

use filezen_core::config::ResourceLimits;
use filezen_core::error::{FileZenError, Result};
use filezen_core::types::{InputArtifact, JobKind, MediaKind, OutputArtifact};
use filezen_document::PageRenderer;

use crate::cancel::CancelToken;
use crate::progress::ProgressReporter;

/// One file transformation. A job value is consumed by a single run.
pub trait TransformJob: Send + 'static {
    fn kind(&self) -> JobKind;

    /// Whether the page renderer must be ready before `run` starts.
    fn requires_renderer(&self) -> bool {
        false
    }

    /// Reject bad inputs or settings. Runs before any document I/O.
    fn validate(&self, inputs: &[InputArtifact]) -> Result<()>;

    /// Perform the transformation on a worker thread.
    fn run(self: Box<Self>, inputs: Vec<InputArtifact>, ctx: &mut JobContext) -> Result<OutputArtifact>;
}

/// Everything a running job may touch besides its inputs.
pub struct JobContext {
    progress: ProgressReporter,
    cancel: CancelToken,
    renderer: Option<Arc<dyn PageRenderer>>,
    limits: ResourceLimits,
}

impl JobContext {
    pub fn new(
        progress: ProgressReporter,
        cancel: CancelToken,
        renderer: Option<Arc<dyn PageRenderer>>,
        limits: ResourceLimits,
    ) -> Self {
        Self {
            progress,
            cancel,
            renderer,
            limits,
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn progress(&mut self) -> &mut ProgressReporter {
        &mut self.progress
    }

    /// Declare the number of progress units this run will report.
    pub fn begin(&mut self, total_units: usize) {
        self.progress
            .begin(u32::try_from(total_units).unwrap_or(u32::MAX));
    }

    pub fn advance(&mut self) {
        self.progress.advance();
    }

    /// Fail with `Cancelled` if the caller has fired the token.
    pub fn checkpoint(&self) -> Result<()> {
        self.cancel.checkpoint()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// The ready renderer. Only jobs that declared `requires_renderer` get
    /// one.
    pub fn renderer(&self) -> Result<Arc<dyn PageRenderer>> {
        self.renderer.clone().ok_or_else(|| {
            FileZenError::RendererUnavailable("this job was started without a renderer".into())
        })
    }
}

// -- Shared input checks ------------------------------------------------------

/// Fail unless exactly one input was supplied.
pub(crate) fn require_single(kind: JobKind, inputs: &[InputArtifact]) -> Result<()> {
    if inputs.len() != 1 {
        return Err(FileZenError::InputValidation(format!(
            "{kind} takes exactly one input, got {}",
            inputs.len()
        )));
    }
    Ok(())
}

/// Fail unless `input` is a non-empty payload declared as `expected`, and its
/// leading bytes do not identify it as something else.
pub(crate) fn require_media(input: &InputArtifact, expected: impl Fn(MediaKind) -> bool) -> Result<()> {
    if input.is_empty() {
        return Err(FileZenError::InputValidation(format!(
            "'{}' is empty",
            input.name()
        )));
    }
    if !expected(input.media_kind()) {
        return Err(FileZenError::InputValidation(format!(
            "'{}' is {}, which this tool does not accept",
            input.name(),
            input.media_kind().mime_type()
        )));
    }
    if let Some(sniffed) = MediaKind::sniff(input.bytes())
        && sniffed != input.media_kind()
    {
        return Err(FileZenError::InputValidation(format!(
            "'{}' is declared as {} but contains {}",
            input.name(),
            input.media_kind().mime_type(),
            sniffed.mime_type()
        )));
    }
    Ok(())
}

pub(crate) fn require_pdf(input: &InputArtifact) -> Result<()> {
    require_media(input, |kind| kind == MediaKind::Pdf)
}

/// Take the single input out of `inputs`.
pub(crate) fn take_single(inputs: Vec<InputArtifact>) -> Result<InputArtifact> {
    inputs
        .into_iter()
        .next()
        .ok_or_else(|| FileZenError::InputValidation("no input supplied".into()))
}
