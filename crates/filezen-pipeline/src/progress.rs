// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress reporting for one job.

use std::sync::Arc;

use filezen_core::types::ProgressState;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Synchronous progress callback. Invoked on the job's worker, in order, once
/// per completed unit.
pub type ProgressObserver = Arc<dyn Fn(ProgressState) + Send + Sync>;

/// Publishes a job's [`ProgressState`].
///
/// `completed` never decreases: updates that would move it backwards are
/// dropped. The latest state is always available through the watch channel;
/// the optional observer sees every accepted update.
pub struct ProgressReporter {
    state: ProgressState,
    sender: watch::Sender<ProgressState>,
    observer: Option<ProgressObserver>,
}

impl ProgressReporter {
    pub fn new(observer: Option<ProgressObserver>) -> (Self, watch::Receiver<ProgressState>) {
        let state = ProgressState::default();
        let (sender, receiver) = watch::channel(state);
        (
            Self {
                state,
                sender,
                observer,
            },
            receiver,
        )
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    /// Declare the unit count. Does not notify the observer, since no unit
    /// has completed yet.
    pub fn begin(&mut self, total: u32) {
        let completed = self.state.completed;
        self.state = ProgressState::new(total);
        self.state.completed = completed.min(self.state.total);
        debug!(total = self.state.total, "progress started");
        self.sender.send_replace(self.state);
    }

    /// Record that `completed` units are done.
    pub fn report(&mut self, completed: u32) {
        let completed = completed.min(self.state.total);
        if completed <= self.state.completed {
            trace!(
                completed,
                current = self.state.completed,
                "non-advancing progress dropped"
            );
            return;
        }
        self.state.completed = completed;
        self.sender.send_replace(self.state);
        if let Some(observer) = &self.observer {
            observer(self.state);
        }
    }

    /// Record one more completed unit.
    pub fn advance(&mut self) {
        self.report(self.state.completed.saturating_add(1));
    }

    /// Mark every unit complete, notifying only if that changes anything.
    pub fn complete(&mut self) {
        self.report(self.state.total);
    }
}
