//! Per-session result store.
//!
//! A [`SummarySession`] remembers the latest successful summary and the state
//! of the current (or last) run. Each caller owns its own session, so two
//! sessions never see each other's results. Runs on one session are
//! serialized: a second run waits until the first one finishes.

use crate::output::FinalSummary;
use crate::summarize::RunState;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct SessionState {
    state: RunState,
    latest: Option<FinalSummary>,
}

/// Result store for one user session.
#[derive(Debug, Default)]
pub struct SummarySession {
    inner: Mutex<SessionState>,
    run_lock: tokio::sync::Mutex<()>,
}

impl SummarySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The summary of the last run that reached [`RunState::Done`].
    pub fn latest(&self) -> Option<FinalSummary> {
        self.lock().latest.clone()
    }

    /// State of the current run, or of the last one if none is active.
    pub fn state(&self) -> RunState {
        self.lock().state
    }

    /// Whether a run currently holds this session.
    pub fn is_busy(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    pub(crate) fn set_state(&self, state: RunState) {
        self.lock().state = state;
    }

    /// Replace the stored summary. Only called once a run is `Done`.
    pub(crate) fn store(&self, summary: FinalSummary) {
        self.lock().latest = Some(summary);
    }

    /// Wait for exclusive use of the session. Hold the guard for the whole run.
    pub(crate) async fn begin_run(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.run_lock.lock().await
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // State is plain data; a panic mid-update cannot leave it torn.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
