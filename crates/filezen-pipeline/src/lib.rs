// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// filezen-pipeline: transformation jobs and the driver that runs them.
//
// Every tool is a `TransformJob`: it validates its inputs before any document
// I/O, reports progress in units, checks for cancellation between units, and
// produces exactly one `OutputArtifact` or one terminal error. The
// `PipelineDriver` owns renderer readiness and worker offload; the
// `JobRunner` is the select/run/result state machine shared by every tool.

pub mod cancel;
pub mod driver;
pub mod job;
pub mod jobs;
pub mod progress;
pub mod runner;

pub use cancel::CancelToken;
pub use driver::{JobHandle, PipelineDriver, PreparedJob};
pub use job::{JobContext, TransformJob};
pub use jobs::{CompressJob, ExportPagesJob, MergeJob, ProtectJob, ReformatJob, UnlockJob};
pub use progress::{ProgressObserver, ProgressReporter};
pub use runner::{JobRunner, RunnerState};
