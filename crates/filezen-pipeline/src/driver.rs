// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline driver: the invocation surface for every tool.
//
// The driver owns the engine configuration and the renderer capability. A
// renderer is initialised at most once, on a blocking worker, the first time
// a job that needs it is started; later jobs reuse it. Each job then runs on
// its own blocking worker so interactive callers are never stalled by rendering
// or encoding.

use std::sync::Arc;

use filezen_core::config::EngineConfig;
use filezen_core::error::{FileZenError, Result};
use filezen_core::types::{
    CompressionSettings, Credential, InputArtifact, JobId, JobKind, OutputArtifact,
    PageExportSettings, ProgressState, ProtectSettings, RasterizeSettings,
};
use filezen_document::{PageRenderer, RendererProvider};
use tokio::sync::{OnceCell, watch};
use tokio::task::{self, JoinError, JoinHandle};
use tracing::{Instrument, Span, info, info_span, warn};

use crate::cancel::CancelToken;
use crate::job::{JobContext, TransformJob};
use crate::jobs::{CompressJob, ExportPagesJob, MergeJob, ProtectJob, ReformatJob, UnlockJob};
use crate::progress::{ProgressObserver, ProgressReporter};

/// Runs transformation jobs. Cheap to clone; clones share one renderer.
#[derive(Clone)]
pub struct PipelineDriver {
    inner: Arc<DriverInner>,
}

struct DriverInner {
    config: EngineConfig,
    provider: Arc<dyn RendererProvider>,
    renderer: OnceCell<Arc<dyn PageRenderer>>,
}

impl PipelineDriver {
    /// Create a driver that will initialise its renderer through `provider`.
    pub fn new(config: EngineConfig, provider: impl RendererProvider + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(DriverInner {
                config,
                provider: Arc::new(provider),
                renderer: OnceCell::new(),
            }),
        })
    }

    /// A driver for hosts without a page renderer. Jobs that need one fail
    /// with `RendererUnavailable`; merge, protect, unlock, and image
    /// conversion work normally.
    pub fn without_renderer(config: EngineConfig) -> Result<Self> {
        Self::new(config, NoRenderer)
    }

    /// A driver backed by PDFium, looked up in `renderer_library_dir` first.
    #[cfg(feature = "pdfium")]
    pub fn with_pdfium(config: EngineConfig) -> Result<Self> {
        let provider = filezen_document::PdfiumProvider::new(
            config.renderer_library_dir.as_ref().map(std::path::PathBuf::from),
        );
        Self::new(config, provider)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Wait for the renderer to be ready, initialising it on first call.
    pub async fn renderer(&self) -> Result<Arc<dyn PageRenderer>> {
        self.inner.ensure_renderer().await
    }

    /// Prepare `job` over `inputs`. Nothing runs until [`PreparedJob::start`].
    pub fn prepare(&self, job: impl TransformJob, inputs: Vec<InputArtifact>) -> PreparedJob {
        PreparedJob {
            driver: Arc::clone(&self.inner),
            job: Box::new(job),
            inputs,
            observer: None,
            cancel: CancelToken::new(),
        }
    }

    /// Start `job` immediately. Must be called from within a Tokio runtime.
    pub fn submit(&self, job: impl TransformJob, inputs: Vec<InputArtifact>) -> JobHandle {
        self.prepare(job, inputs).start()
    }

    // -- Entry points ---------------------------------------------------------

    /// Rasterize-Compress one PDF.
    pub fn compress_pdf(&self, input: InputArtifact, settings: RasterizeSettings) -> PreparedJob {
        self.prepare(CompressJob::new(settings), vec![input])
    }

    /// Merge PDFs in the order given.
    pub fn merge_pdfs(&self, inputs: Vec<InputArtifact>) -> PreparedJob {
        self.prepare(MergeJob::new(), inputs)
    }

    /// Encrypt one PDF, granting the configured permissions.
    pub fn protect_pdf(&self, input: InputArtifact, credential: Credential) -> PreparedJob {
        let settings = ProtectSettings {
            credential,
            permissions: self.inner.config.permissions,
        };
        self.prepare(ProtectJob::new(settings), vec![input])
    }

    /// Decrypt one PDF.
    pub fn unlock_pdf(&self, input: InputArtifact, credential: Credential) -> PreparedJob {
        self.prepare(UnlockJob::new(credential), vec![input])
    }

    /// Convert one image to another format.
    pub fn reformat_image(&self, input: InputArtifact, settings: CompressionSettings) -> PreparedJob {
        self.prepare(ReformatJob::new(settings), vec![input])
    }

    /// Render every page of one PDF into a ZIP of images.
    pub fn export_pages(&self, input: InputArtifact, settings: PageExportSettings) -> PreparedJob {
        self.prepare(ExportPagesJob::new(settings), vec![input])
    }
}

impl DriverInner {
    async fn ensure_renderer(&self) -> Result<Arc<dyn PageRenderer>> {
        let renderer = self
            .renderer
            .get_or_try_init(|| async {
                let provider = Arc::clone(&self.provider);
                info!("initialising page renderer");
                task::spawn_blocking(move || provider.initialise())
                    .await
                    .map_err(worker_failure)?
            })
            .await?;
        Ok(Arc::clone(renderer))
    }
}

/// A job with its inputs, ready to start. Attach observers before starting so
/// no progress update is missed.
pub struct PreparedJob {
    driver: Arc<DriverInner>,
    job: Box<dyn TransformJob>,
    inputs: Vec<InputArtifact>,
    observer: Option<ProgressObserver>,
    cancel: CancelToken,
}

impl PreparedJob {
    pub fn kind(&self) -> JobKind {
        self.job.kind()
    }

    /// Call `observer` after every completed unit, in order, before the job
    /// resolves.
    pub fn on_progress(mut self, observer: impl Fn(ProgressState) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Use a caller-owned cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Spawn the job. Must be called from within a Tokio runtime.
    pub fn start(self) -> JobHandle {
        let id = JobId::new();
        let kind = self.job.kind();
        let (reporter, progress) = ProgressReporter::new(self.observer);
        let span = info_span!("job", job_id = %id, kind = %kind);

        let task = tokio::spawn(
            execute(self.driver, self.job, self.inputs, reporter, self.cancel.clone()).instrument(span),
        );

        JobHandle {
            id,
            kind,
            progress,
            cancel: self.cancel,
            task,
        }
    }

    /// Start the job and wait for its result.
    pub async fn run(self) -> Result<OutputArtifact> {
        self.start().wait().await
    }
}

/// A started job.
pub struct JobHandle {
    id: JobId,
    kind: JobKind,
    progress: watch::Receiver<ProgressState>,
    cancel: CancelToken,
    task: JoinHandle<Result<OutputArtifact>>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Latest progress. Each receiver sees the newest state, not every step.
    pub fn progress(&self) -> watch::Receiver<ProgressState> {
        self.progress.clone()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Ask the job to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the job's single terminal outcome.
    pub async fn wait(self) -> Result<OutputArtifact> {
        self.task.await.map_err(worker_failure)?
    }
}

async fn execute(
    driver: Arc<DriverInner>,
    job: Box<dyn TransformJob>,
    inputs: Vec<InputArtifact>,
    reporter: ProgressReporter,
    cancel: CancelToken,
) -> Result<OutputArtifact> {
    let result = prepare_and_run(&driver, job, inputs, reporter, cancel).await;
    match &result {
        Ok(output) => info!(
            filename = output.filename(),
            output_bytes = output.len(),
            sha256 = output.sha256(),
            "job succeeded"
        ),
        Err(err) => warn!(kind = ?err.kind(), error = %err, "job failed"),
    }
    result
}

async fn prepare_and_run(
    driver: &DriverInner,
    job: Box<dyn TransformJob>,
    inputs: Vec<InputArtifact>,
    reporter: ProgressReporter,
    cancel: CancelToken,
) -> Result<OutputArtifact> {
    job.validate(&inputs)?;
    let limits = driver.config.limits;
    for input in &inputs {
        limits.check_input_len(input.name(), input.len())?;
    }

    let renderer = if job.requires_renderer() {
        Some(driver.ensure_renderer().await?)
    } else {
        None
    };
    cancel.checkpoint()?;

    let span = Span::current();
    task::spawn_blocking(move || -> Result<OutputArtifact> {
        let _entered = span.enter();
        let mut ctx = JobContext::new(reporter, cancel, renderer, limits);
        let output = job.run(inputs, &mut ctx)?;
        ctx.progress().complete();
        Ok(output)
    })
    .await
    .map_err(worker_failure)?
}

/// A worker that panicked or was torn down left no usable output.
fn worker_failure(err: JoinError) -> FileZenError {
    if err.is_cancelled() {
        FileZenError::Cancelled
    } else {
        FileZenError::ResourceExhausted(format!("job worker stopped unexpectedly: {err}"))
    }
}

/// Provider for hosts that cannot render pages.
struct NoRenderer;

impl RendererProvider for NoRenderer {
    fn initialise(&self) -> Result<Arc<dyn PageRenderer>> {
        Err(FileZenError::RendererUnavailable(
            "no page renderer is configured".into(),
        ))
    }
}
