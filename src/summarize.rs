//! Run orchestration: extraction, then map, then reduce.
//!
//! [`Summarizer`] owns the two backends (a [`TextExtractor`] and a
//! [`ChatClient`]) and drives one run through the state machine
//!
//! ```text
//! Idle ──► Extracting ──► Mapping ──► Reducing ──► Done
//!               │             │           │
//!               └─────────────┴───────────┴──────► Failed
//! ```
//!
//! Every transition is reported to the run's progress callback and recorded
//! on the [`SummarySession`]. The session's stored summary is only replaced
//! when a run reaches `Done`.

use crate::config::{validate_api_key, PageRange, RunConfig, DEFAULT_API_KEY_ENV};
use crate::error::{PdfSumError, RunFailure};
use crate::output::{RunStats, SummaryOutput};
use crate::pipeline::chat::{ChatClient, LlmChatClient};
use crate::pipeline::extract::{PdfiumExtractor, TextExtractor};
use crate::pipeline::input::Document;
use crate::pipeline::{map, reduce};
use crate::progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
use crate::session::SummarySession;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Lifecycle state of a summary run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Extracting,
    Mapping,
    Reducing,
    Done,
    Failed,
}

impl RunState {
    /// Present participle used in failure messages ("failed while mapping").
    pub fn verb(&self) -> &'static str {
        match self {
            RunState::Idle => "starting",
            RunState::Extracting => "extracting text",
            RunState::Mapping => "mapping",
            RunState::Reducing => "reducing",
            RunState::Done => "finishing",
            RunState::Failed => "failing",
        }
    }

    /// `Done` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Extracting => "extracting",
            RunState::Mapping => "mapping",
            RunState::Reducing => "reducing",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-run hooks: a progress observer and a cancellation token.
#[derive(Clone)]
pub struct RunControl {
    pub progress: ProgressCallback,
    pub cancel: CancellationToken,
}

impl Default for RunControl {
    fn default() -> Self {
        Self {
            progress: Arc::new(NoopProgressCallback),
            cancel: CancellationToken::new(),
        }
    }
}

impl RunControl {
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A clone of the run's token; cancelling it stops the run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl fmt::Debug for RunControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunControl")
            .field("progress", &"<dyn SummaryProgressCallback>")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// The summary pipeline over a pair of backends.
#[derive(Debug)]
pub struct Summarizer<E, C> {
    extractor: E,
    client: C,
}

impl<E: TextExtractor, C: ChatClient> Summarizer<E, C> {
    pub fn new(extractor: E, client: C) -> Self {
        Self { extractor, client }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Summarise `range` of `document`.
    ///
    /// The document is consumed and released (with any staged temp file)
    /// when the run ends. On failure the returned [`RunFailure`] names the
    /// state the run was in; the session keeps its previous summary.
    pub async fn run(
        &self,
        document: Document,
        range: PageRange,
        config: &RunConfig,
        session: &SummarySession,
        control: &RunControl,
    ) -> Result<SummaryOutput, RunFailure> {
        let _run = session.begin_run().await;
        let total_start = Instant::now();
        let progress = control.progress.as_ref();
        let cancel = &control.cancel;

        session.set_state(RunState::Idle);
        if let Err(e) = config.validate() {
            // Nothing has started yet; the session stays idle.
            let failure = RunFailure::new(RunState::Idle, e);
            warn!("{}", failure);
            progress.on_run_failed(RunState::Idle, &failure.error.to_string());
            return Err(failure);
        }
        info!(
            "Starting summary of pages {} ({} → {})",
            range, config.map_model, config.reduce_model
        );

        // ── Extract ──────────────────────────────────────────────────────
        transition(session, progress, RunState::Extracting);
        let extract_start = Instant::now();
        let pages = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PdfSumError::Cancelled),
            result = self.extractor.extract(&document, range) => result.map_err(PdfSumError::from),
        }
        .map_err(|e| fail(session, progress, RunState::Extracting, e))?;
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        // Text is in memory from here on.
        drop(document);
        info!(
            "Extracted {} pages in {}ms",
            pages.len(),
            extract_duration_ms
        );

        // ── Map ──────────────────────────────────────────────────────────
        transition(session, progress, RunState::Mapping);
        progress.on_map_start(pages.len());
        let map_start = Instant::now();
        let summaries = map::map_summarize(&self.client, &pages, config, progress, cancel)
            .await
            .map_err(|e| fail(session, progress, RunState::Mapping, e))?;
        let map_duration_ms = map_start.elapsed().as_millis() as u64;

        // ── Reduce ───────────────────────────────────────────────────────
        transition(session, progress, RunState::Reducing);
        let reduce_start = Instant::now();
        let summary = reduce::reduce_summarize(&self.client, &summaries, config, cancel)
            .await
            .map_err(|e| fail(session, progress, RunState::Reducing, e))?;
        let reduce_duration_ms = reduce_start.elapsed().as_millis() as u64;

        // ── Done ─────────────────────────────────────────────────────────
        session.store(summary.clone());
        transition(session, progress, RunState::Done);

        let stats = RunStats {
            pages: summaries.len(),
            extract_duration_ms,
            map_duration_ms,
            reduce_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Summary complete: {} pages, {}ms total",
            stats.pages, stats.total_duration_ms
        );

        Ok(SummaryOutput {
            summary,
            page_range: range,
            stats,
        })
    }
}

impl Summarizer<PdfiumExtractor, LlmChatClient> {
    /// Production pipeline: pdfium extraction and OpenAI chat models, with
    /// the key read from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, PdfSumError> {
        Self::from_env_with(DEFAULT_API_KEY_ENV, "openai")
    }

    /// Like [`Summarizer::from_env`] with a custom key variable and provider.
    pub fn from_env_with(api_key_env: &str, provider: &str) -> Result<Self, PdfSumError> {
        validate_api_key(api_key_env)?;
        let client = LlmChatClient::new(provider)?;
        Ok(Self::new(PdfiumExtractor::new(), client))
    }
}

fn transition(session: &SummarySession, progress: &dyn SummaryProgressCallback, state: RunState) {
    info!("Run state → {}", state);
    session.set_state(state);
    progress.on_state_change(state);
}

fn fail(
    session: &SummarySession,
    progress: &dyn SummaryProgressCallback,
    stage: RunState,
    error: PdfSumError,
) -> RunFailure {
    let failure = RunFailure::new(stage, error);
    warn!("{}", failure);
    progress.on_run_failed(stage, &failure.error.to_string());
    transition(session, progress, RunState::Failed);
    failure
}
