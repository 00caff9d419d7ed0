// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Driver behaviour: renderer lifecycle, cancellation, limits, and the image
// converter.

mod common;

use common::*;
use filezen_core::config::ResourceLimits;
use filezen_core::error::{ErrorKind, FileZenError};
use filezen_core::types::{
    CompressionSettings, Credential, InputArtifact, MediaKind, RasterizeSettings, ResizePreset, TargetFormat,
};
use filezen_core::EngineConfig;
use filezen_pipeline::{CancelToken, JobRunner, PipelineDriver, ReformatJob, RunnerState};

fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory(bytes).unwrap();
    (image.width(), image.height())
}

#[tokio::test]
async fn renderer_initialises_once_across_jobs() {
    init_tracing();
    let provider = CountingProvider::default();
    let driver = PipelineDriver::new(EngineConfig::default(), provider.clone()).unwrap();

    let first = driver
        .compress_pdf(pdf_input("a.pdf", letter_pdf(1)), RasterizeSettings::default())
        .start();
    let second = driver
        .compress_pdf(pdf_input("b.pdf", letter_pdf(2)), RasterizeSettings::default())
        .start();
    let (first, second) = tokio::join!(first.wait(), second.wait());
    first.unwrap();
    second.unwrap();

    driver
        .export_pages(pdf_input("c.pdf", letter_pdf(1)), Default::default())
        .run()
        .await
        .unwrap();

    assert_eq!(provider.count(), 1);
}

#[tokio::test]
async fn merge_never_touches_the_renderer() {
    let provider = CountingProvider::default();
    let driver = PipelineDriver::new(EngineConfig::default(), provider.clone()).unwrap();

    driver
        .merge_pdfs(vec![
            pdf_input("a.pdf", letter_pdf(1)),
            pdf_input("b.pdf", letter_pdf(1)),
        ])
        .run()
        .await
        .unwrap();

    assert_eq!(provider.count(), 0);
}

#[tokio::test]
async fn missing_renderer_fails_only_rendering_jobs() {
    let driver = PipelineDriver::new(EngineConfig::default(), MissingLibraryProvider).unwrap();

    let err = driver
        .compress_pdf(pdf_input("a.pdf", letter_pdf(1)), RasterizeSettings::default())
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);

    driver
        .protect_pdf(pdf_input("a.pdf", letter_pdf(1)), Credential::new("pw"))
        .run()
        .await
        .unwrap();
}

#[tokio::test]
async fn driver_without_renderer_reports_unavailable() {
    let driver = PipelineDriver::without_renderer(EngineConfig::default()).unwrap();
    let err = driver
        .export_pages(pdf_input("a.pdf", letter_pdf(1)), Default::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, FileZenError::RendererUnavailable(_)));
}

#[tokio::test]
async fn cancelled_before_start_yields_cancelled() {
    let driver = PipelineDriver::new(EngineConfig::default(), CountingProvider::default()).unwrap();
    let token = CancelToken::new();
    token.cancel();

    let err = driver
        .compress_pdf(pdf_input("a.pdf", letter_pdf(2)), RasterizeSettings::default())
        .with_cancel_token(token)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, FileZenError::Cancelled));
}

#[tokio::test]
async fn cancel_between_pages_stops_the_job() {
    let driver = PipelineDriver::new(EngineConfig::default(), CountingProvider::default()).unwrap();
    let token = CancelToken::new();
    let trigger = token.clone();

    let err = driver
        .compress_pdf(pdf_input("a.pdf", letter_pdf(4)), RasterizeSettings::default())
        .with_cancel_token(token)
        .on_progress(move |state| {
            if state.completed == 1 {
                trigger.cancel();
            }
        })
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, FileZenError::Cancelled));
}

#[tokio::test]
async fn oversized_input_is_resource_exhaustion() {
    let config = EngineConfig {
        limits: ResourceLimits {
            max_input_bytes: 128,
            ..ResourceLimits::default()
        },
        ..EngineConfig::default()
    };
    let driver = PipelineDriver::without_renderer(config).unwrap();

    let err = driver
        .merge_pdfs(vec![
            pdf_input("a.pdf", letter_pdf(1)),
            pdf_input("b.pdf", letter_pdf(1)),
        ])
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, FileZenError::ResourceExhausted(_)), "{err:?}");
}

#[tokio::test]
async fn page_and_surface_limits_apply_to_rasterising_jobs() {
    let pages_capped = EngineConfig {
        limits: ResourceLimits {
            max_pages: 2,
            ..ResourceLimits::default()
        },
        ..EngineConfig::default()
    };
    let driver = PipelineDriver::new(pages_capped, CountingProvider::default()).unwrap();
    let err = driver
        .compress_pdf(pdf_input("a.pdf", letter_pdf(3)), RasterizeSettings::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, FileZenError::ResourceExhausted(_)));

    let surface_capped = EngineConfig {
        limits: ResourceLimits {
            max_surface_pixels: 10_000,
            ..ResourceLimits::default()
        },
        ..EngineConfig::default()
    };
    let driver = PipelineDriver::new(surface_capped, CountingProvider::default()).unwrap();
    let err = driver
        .export_pages(pdf_input("a.pdf", letter_pdf(1)), Default::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, FileZenError::ResourceExhausted(_)));
}

#[test]
fn invalid_config_is_rejected() {
    let config = EngineConfig {
        compression: RasterizeSettings {
            scale: 0.0,
            quality: 0.6,
        },
        ..EngineConfig::default()
    };
    assert!(matches!(
        PipelineDriver::without_renderer(config),
        Err(FileZenError::InputValidation(_))
    ));
}

#[tokio::test]
async fn same_format_at_full_quality_keeps_dimensions() {
    let driver = PipelineDriver::without_renderer(EngineConfig::default()).unwrap();
    let output = driver
        .reformat_image(
            png_input("photo.png", 120, 80),
            CompressionSettings::new(TargetFormat::Png).with_quality_percent(100),
        )
        .run()
        .await
        .unwrap();

    assert_eq!(output.filename(), "photo.png");
    assert_eq!(output.media_kind(), MediaKind::Png);
    assert_eq!(decoded_dimensions(output.bytes()), (120, 80));
}

#[tokio::test]
async fn resize_preset_scales_both_sides() {
    let driver = PipelineDriver::without_renderer(EngineConfig::default()).unwrap();
    let output = driver
        .reformat_image(
            png_input("photo.png", 120, 80),
            CompressionSettings::new(TargetFormat::Jpeg).with_preset(ResizePreset::Half),
        )
        .run()
        .await
        .unwrap();

    assert_eq!(output.filename(), "photo.jpg");
    assert_eq!(output.media_kind(), MediaKind::Jpeg);
    assert_eq!(decoded_dimensions(output.bytes()), (60, 40));
}

#[tokio::test]
async fn reformat_rejects_pdf_input() {
    let driver = PipelineDriver::without_renderer(EngineConfig::default()).unwrap();
    let err = driver
        .reformat_image(
            pdf_input("a.pdf", letter_pdf(1)),
            CompressionSettings::default(),
        )
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, FileZenError::InputValidation(_)));
}

#[tokio::test]
async fn mislabelled_input_is_rejected() {
    let driver = PipelineDriver::without_renderer(EngineConfig::default()).unwrap();
    let png = png_input("photo.png", 8, 8);
    let mislabelled = InputArtifact::new("photo.pdf", MediaKind::Pdf, png.bytes().to_vec());

    let err = driver
        .merge_pdfs(vec![mislabelled, pdf_input("b.pdf", letter_pdf(1))])
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, FileZenError::InputValidation(_)));
}

#[tokio::test]
async fn runner_surfaces_a_humanised_failure() {
    let driver = PipelineDriver::without_renderer(EngineConfig::default()).unwrap();
    let mut runner = JobRunner::new(ReformatJob::new(CompressionSettings::default()));
    runner
        .select_input(InputArtifact::new("junk.png", MediaKind::Png, b"not an image".to_vec()))
        .unwrap();

    match runner.run(&driver).await.unwrap() {
        RunnerState::Failed { kind, error, inputs } => {
            assert_eq!(*kind, ErrorKind::CorruptDocument);
            assert!(!error.message.is_empty());
            assert_eq!(inputs.len(), 1);
        }
        other => panic!("unexpected state {other:?}"),
    }
}
