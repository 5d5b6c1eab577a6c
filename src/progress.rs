//! Progress-callback trait for summary-run events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::summarize::RunControl`] to receive events as the pipeline moves
//! through its stages and summarises each page.
//!
//! The core only owns the notification contract; rendering (a terminal bar,
//! a web socket, a GUI widget) belongs to the caller.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfsum::{RunControl, SummaryProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct LastFraction(Mutex<f32>);
//!
//! impl SummaryProgressCallback for LastFraction {
//!     fn on_progress(&self, fraction: f32) {
//!         *self.0.lock().unwrap() = fraction;
//!     }
//! }
//!
//! let control = RunControl::default()
//!     .with_progress(Arc::new(LastFraction::default()));
//! ```

use crate::summarize::RunState;
use std::sync::Arc;

/// Called by the summary pipeline as a run advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: with map
/// concurrency above 1 the pipeline is polled from a multi-threaded runtime.
/// Events are still delivered in page order.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called on every state transition, including the final `Done` or
    /// `Failed`.
    fn on_state_change(&self, state: RunState) {
        let _ = state;
    }

    /// Called once extraction succeeded, before the first map call.
    ///
    /// # Arguments
    /// * `total_pages`: number of pages that will be summarised
    fn on_map_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Fractional map completion, `(index + 1) / total_pages`, reported after
    /// each page summary.
    fn on_progress(&self, fraction: f32) {
        let _ = fraction;
    }

    /// Called after each page summary, right before [`Self::on_progress`].
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: pages in this run
    /// * `summary_len`: byte length of the page summary
    fn on_page_summarized(&self, page_num: usize, total_pages: usize, summary_len: usize) {
        let _ = (page_num, total_pages, summary_len);
    }

    /// Called when the run stops with an error.
    ///
    /// # Arguments
    /// * `stage`: state the run was in when it failed
    /// * `error`: human-readable error description
    fn on_run_failed(&self, stage: RunState, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::summarize::RunControl`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        states: Mutex<Vec<RunState>>,
        fractions: Mutex<Vec<f32>>,
    }

    impl SummaryProgressCallback for TrackingCallback {
        fn on_state_change(&self, state: RunState) {
            self.states.lock().unwrap().push(state);
        }

        fn on_progress(&self, fraction: f32) {
            self.fractions.lock().unwrap().push(fraction);
        }

        fn on_page_summarized(&self, _page_num: usize, _total_pages: usize, _len: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_state_change(RunState::Extracting);
        cb.on_map_start(3);
        cb.on_page_summarized(1, 3, 42);
        cb.on_progress(1.0 / 3.0);
        cb.on_run_failed(RunState::Mapping, "boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_state_change(RunState::Mapping);
        tracker.on_page_summarized(1, 2, 10);
        tracker.on_progress(0.5);
        tracker.on_page_summarized(2, 2, 12);
        tracker.on_progress(1.0);

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(*tracker.states.lock().unwrap(), vec![RunState::Mapping]);
        assert_eq!(*tracker.fractions.lock().unwrap(), vec![0.5, 1.0]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_progress(0.25);
    }
}
