// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image-Reformat: convert an image between raster formats.

use filezen_core::error::Result;
use filezen_core::types::{CompressionSettings, InputArtifact, JobKind, MediaKind, OutputArtifact};
use filezen_document::integrity::seal;
use filezen_document::{ImageCodec, TranscodeOptions};
use tracing::{info, instrument, warn};

use crate::job::{JobContext, TransformJob, require_media, require_single, take_single};

/// Decodes, optionally resizes, and re-encodes into the target format.
#[derive(Debug, Clone)]
pub struct ReformatJob {
    settings: CompressionSettings,
}

impl ReformatJob {
    pub fn new(settings: CompressionSettings) -> Self {
        Self { settings }
    }
}

impl TransformJob for ReformatJob {
    fn kind(&self) -> JobKind {
        JobKind::Reformat
    }

    fn validate(&self, inputs: &[InputArtifact]) -> Result<()> {
        require_single(self.kind(), inputs)?;
        require_media(&inputs[0], |kind| kind.is_image())?;
        self.settings.validate()
    }

    #[instrument(skip_all, fields(target = ?self.settings.target_format, quality = self.settings.quality_percent()))]
    fn run(self: Box<Self>, inputs: Vec<InputArtifact>, ctx: &mut JobContext) -> Result<OutputArtifact> {
        let input = take_single(inputs)?;
        ctx.begin(1);

        let options = TranscodeOptions {
            target: self.settings.target_format,
            quality_percent: self.settings.quality_percent(),
            resize_scale: self.settings.resize_scale,
            max_dimension: self.settings.max_dimension,
        };
        let transcoded = ImageCodec::transcode(input.bytes(), &options)?;
        ctx.limits()
            .check_surface(transcoded.width, transcoded.height)?;

        if !transcoded.within_ceiling {
            warn!(
                output_bytes = transcoded.bytes.len(),
                "output exceeds the size ceiling for the requested quality"
            );
        }

        ctx.checkpoint()?;
        ctx.advance();
        info!(
            width = transcoded.width,
            height = transcoded.height,
            output_bytes = transcoded.bytes.len(),
            "image converted"
        );

        let target: MediaKind = self.settings.target_format.media_kind();
        Ok(seal(
            transcoded.bytes,
            format!("{}.{}", input.stem(), target.extension()),
            target,
        ))
    }
}
