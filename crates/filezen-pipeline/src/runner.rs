// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job runner: the select / run / result flow shared by every tool page.

use filezen_core::error::{ErrorKind, FileZenError, Result};
use filezen_core::human_errors::{HumanError, humanize_error};
use filezen_core::types::{InputArtifact, JobKind, OutputArtifact, ProgressState};
use tracing::debug;

use crate::driver::{JobHandle, PipelineDriver};
use crate::job::TransformJob;

/// Where a tool page is in its lifecycle.
#[derive(Debug, Clone)]
pub enum RunnerState {
    /// Nothing selected.
    Idle,
    /// Inputs selected, not started.
    Ready { inputs: Vec<InputArtifact> },
    Running { progress: ProgressState },
    Succeeded(OutputArtifact),
    /// The inputs are kept so the same files can be retried, for example
    /// after re-entering a password.
    Failed {
        kind: ErrorKind,
        error: HumanError,
        inputs: Vec<InputArtifact>,
    },
}

impl RunnerState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready { .. } => "ready",
            Self::Running { .. } => "running",
            Self::Succeeded(_) => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

/// State machine for one tool, parameterised by the job variant it runs.
///
/// `job` is a template: each start runs a fresh clone of it, so settings can
/// be changed between runs with [`JobRunner::set_job`].
pub struct JobRunner<J: TransformJob + Clone> {
    job: J,
    state: RunnerState,
    /// Inputs of the run in flight, restored into `Failed` on error.
    in_flight: Vec<InputArtifact>,
}

impl<J: TransformJob + Clone> JobRunner<J> {
    pub fn new(job: J) -> Self {
        Self {
            job,
            state: RunnerState::Idle,
            in_flight: Vec::new(),
        }
    }

    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    pub fn kind(&self) -> JobKind {
        self.job.kind()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunnerState::Running { .. })
    }

    /// Replace the job template, e.g. with new settings or a new password.
    pub fn set_job(&mut self, job: J) -> Result<()> {
        self.ensure_idle_for("change settings")?;
        self.job = job;
        Ok(())
    }

    /// Add one input. Merge accumulates inputs; every other tool replaces
    /// the current selection.
    pub fn select_input(&mut self, input: InputArtifact) -> Result<()> {
        self.ensure_idle_for("select a file")?;
        let accumulates = self.job.kind() == JobKind::Merge;
        let inputs = match std::mem::replace(&mut self.state, RunnerState::Idle) {
            RunnerState::Ready { mut inputs } if accumulates => {
                inputs.push(input);
                inputs
            }
            _ => vec![input],
        };
        self.state = RunnerState::Ready { inputs };
        Ok(())
    }

    /// Replace the whole selection.
    pub fn select_inputs(&mut self, inputs: Vec<InputArtifact>) -> Result<()> {
        self.ensure_idle_for("select files")?;
        self.state = if inputs.is_empty() {
            RunnerState::Idle
        } else {
            RunnerState::Ready { inputs }
        };
        Ok(())
    }

    /// Drop the selection or the last result.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_idle_for("clear")?;
        self.state = RunnerState::Idle;
        Ok(())
    }

    /// Return to `Ready` with the inputs of a failed run.
    pub fn retry(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, RunnerState::Idle) {
            RunnerState::Failed { inputs, .. } => {
                self.state = RunnerState::Ready { inputs };
                Ok(())
            }
            other => {
                let name = other.name();
                self.state = other;
                Err(invalid_transition("retry", name))
            }
        }
    }

    /// Start the selected inputs on `driver`.
    pub fn start(&mut self, driver: &PipelineDriver) -> Result<JobHandle> {
        let inputs = match std::mem::replace(&mut self.state, RunnerState::Idle) {
            RunnerState::Ready { inputs } => inputs,
            other => {
                let name = other.name();
                self.state = other;
                return Err(invalid_transition("start", name));
            }
        };

        self.in_flight = inputs.clone();
        self.state = RunnerState::Running {
            progress: ProgressState::default(),
        };
        debug!(kind = %self.job.kind(), inputs = inputs.len(), "runner started");
        Ok(driver.submit(self.job.clone(), inputs))
    }

    /// Record a progress update. Updates that move backwards are ignored.
    pub fn progress(&mut self, update: ProgressState) -> Result<()> {
        match &mut self.state {
            RunnerState::Running { progress } => {
                if update.completed >= progress.completed {
                    *progress = update;
                }
                Ok(())
            }
            other => Err(invalid_transition("report progress", other.name())),
        }
    }

    /// Record the terminal outcome of the running job.
    pub fn finish(&mut self, result: Result<OutputArtifact>) -> Result<()> {
        if !self.is_running() {
            return Err(invalid_transition("finish", self.state.name()));
        }
        let inputs = std::mem::take(&mut self.in_flight);
        self.state = match result {
            Ok(output) => RunnerState::Succeeded(output),
            Err(err) => RunnerState::Failed {
                kind: err.kind(),
                error: humanize_error(&err),
                inputs,
            },
        };
        Ok(())
    }

    /// Start, follow progress, and record the outcome.
    pub async fn run(&mut self, driver: &PipelineDriver) -> Result<&RunnerState> {
        let handle = self.start(driver)?;
        let mut progress = handle.progress();
        let outcome = handle.wait();
        tokio::pin!(outcome);

        let result = loop {
            tokio::select! {
                result = &mut outcome => break result,
                changed = progress.changed() => {
                    if changed.is_err() {
                        break (&mut outcome).await;
                    }
                    let update = *progress.borrow_and_update();
                    self.progress(update)?;
                }
            }
        };

        self.finish(result)?;
        Ok(&self.state)
    }

    fn ensure_idle_for(&self, action: &str) -> Result<()> {
        if self.is_running() {
            return Err(invalid_transition(action, "running"));
        }
        Ok(())
    }
}

fn invalid_transition(action: &str, state: &str) -> FileZenError {
    FileZenError::InputValidation(format!("cannot {action} while {state}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filezen_core::EngineConfig;
    use filezen_core::types::MediaKind;
    use filezen_document::{PageSize, PdfDocument};

    use crate::jobs::MergeJob;

    fn one_page_pdf(name: &str) -> InputArtifact {
        let mut doc = PdfDocument::empty();
        doc.add_page(PageSize::new(612.0, 792.0)).unwrap();
        InputArtifact::new(name, MediaKind::Pdf, doc.serialize().unwrap())
    }

    #[test]
    fn merge_accumulates_selection() {
        let mut runner = JobRunner::new(MergeJob::new());
        runner.select_input(one_page_pdf("a.pdf")).unwrap();
        runner.select_input(one_page_pdf("b.pdf")).unwrap();
        match runner.state() {
            RunnerState::Ready { inputs } => assert_eq!(inputs.len(), 2),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn cannot_start_from_idle() {
        let driver = PipelineDriver::without_renderer(EngineConfig::default()).unwrap();
        let mut runner = JobRunner::new(MergeJob::new());
        assert!(matches!(
            runner.start(&driver),
            Err(FileZenError::InputValidation(_))
        ));
        assert!(matches!(runner.state(), RunnerState::Idle));
    }

    #[test]
    fn progress_outside_running_rejected() {
        let mut runner = JobRunner::new(MergeJob::new());
        assert!(runner.progress(ProgressState::new(2)).is_err());
        assert!(runner.finish(Err(FileZenError::Cancelled)).is_err());
    }

    #[tokio::test]
    async fn run_succeeds_and_clears() {
        let driver = PipelineDriver::without_renderer(EngineConfig::default()).unwrap();
        let mut runner = JobRunner::new(MergeJob::new());
        runner
            .select_inputs(vec![one_page_pdf("a.pdf"), one_page_pdf("b.pdf")])
            .unwrap();

        let state = runner.run(&driver).await.unwrap();
        match state {
            RunnerState::Succeeded(output) => assert_eq!(output.filename(), "merged.pdf"),
            other => panic!("unexpected state {other:?}"),
        }

        runner.clear().unwrap();
        assert!(matches!(runner.state(), RunnerState::Idle));
    }

    #[tokio::test]
    async fn failed_run_can_be_retried() {
        let driver = PipelineDriver::without_renderer(EngineConfig::default()).unwrap();
        let mut runner = JobRunner::new(MergeJob::new());
        runner.select_input(one_page_pdf("only.pdf")).unwrap();

        match runner.run(&driver).await.unwrap() {
            RunnerState::Failed { kind, inputs, .. } => {
                assert_eq!(*kind, ErrorKind::InputValidation);
                assert_eq!(inputs.len(), 1);
            }
            other => panic!("unexpected state {other:?}"),
        }

        runner.retry().unwrap();
        runner.select_input(one_page_pdf("second.pdf")).unwrap();
        assert!(matches!(
            runner.run(&driver).await.unwrap(),
            RunnerState::Succeeded(_)
        ));
    }
}
