//! Map stage: summarise every extracted page independently.
//!
//! ## Ordering
//!
//! The reduce stage concatenates summaries positionally, so the output must
//! follow page order. With `concurrency > 1` calls run in parallel through
//! `StreamExt::buffered`, which yields results in submission order, so
//! progress events and the returned [`SummarySet`] stay in page order.
//!
//! ## Failure policy
//!
//! Fail-fast: the first page that fails aborts the stage, in-flight calls
//! are dropped, and the summaries gathered so far are discarded. There is no
//! skip-and-continue mode.

use crate::config::RunConfig;
use crate::error::PdfSumError;
use crate::pipeline::chat::{complete_with_timeout, ChatClient, ChatRequest};
use crate::pipeline::extract::PageText;
use crate::progress::SummaryProgressCallback;
use crate::prompts::build_prompt;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The summary of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed page number.
    pub page_num: usize,
    pub summary: String,
}

/// Per-page summaries in ascending page order, one per [`PageText`] entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySet {
    summaries: Vec<PageSummary>,
}

impl SummarySet {
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageSummary> {
        self.summaries.iter()
    }

    /// Summary texts in page order.
    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.summaries.iter().map(|s| s.summary.as_str())
    }
}

impl From<Vec<PageSummary>> for SummarySet {
    /// Sorts by page number; callers may hand summaries over in any order.
    fn from(mut summaries: Vec<PageSummary>) -> Self {
        summaries.sort_by_key(|s| s.page_num);
        Self { summaries }
    }
}

/// Summarise each page of `pages` with the run's map model.
///
/// After every page, `progress` receives `on_page_summarized` followed by
/// `on_progress((index + 1) / total)`. `cancel` is checked before each page
/// is submitted and raced against every in-flight call.
pub async fn map_summarize<C: ChatClient>(
    client: &C,
    pages: &PageText,
    config: &RunConfig,
    progress: &dyn SummaryProgressCallback,
    cancel: &CancellationToken,
) -> Result<SummarySet, PdfSumError> {
    let total_pages = pages.len();
    let timeout = Duration::from_secs(config.chat_timeout_secs);
    info!(
        "Map step: {} pages with {} (concurrency {})",
        total_pages, config.map_model, config.concurrency
    );

    let calls = pages.iter().map(|(page_num, text)| async move {
        if cancel.is_cancelled() {
            return Err(PdfSumError::Cancelled);
        }
        let prompt = build_prompt(&config.map_template, text, config.map_max_words)?;
        let request = ChatRequest {
            prompt: &prompt,
            system_message: config.system_message_text(),
            model: config.map_model,
            max_tokens: config.map_max_tokens,
            temperature: config.temperature,
        };
        let summary = complete_with_timeout(client, request, timeout)
            .await
            .map_err(|e| {
                warn!("Map summary #{} failed: {}", page_num, e);
                PdfSumError::from(e)
            })?;
        Ok::<_, PdfSumError>(PageSummary { page_num, summary })
    });

    let mut results = std::pin::pin!(stream::iter(calls).buffered(config.concurrency.max(1)));
    let mut summaries = Vec::with_capacity(total_pages);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Map step cancelled after {}/{} pages", summaries.len(), total_pages);
                return Err(PdfSumError::Cancelled);
            }
            next = results.next() => next,
        };
        let Some(result) = next else { break };
        let page = result?;

        let index = summaries.len();
        debug!("Map summary #{}: {}", page.page_num, page.summary);
        info!(
            "Map summary #{} done ({}/{})",
            page.page_num,
            index + 1,
            total_pages
        );
        progress.on_page_summarized(page.page_num, total_pages, page.summary.len());
        progress.on_progress((index + 1) as f32 / total_pages as f32);
        summaries.push(page);
    }

    Ok(SummarySet { summaries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatApiError;
    use crate::progress::NoopProgressCallback;
    use std::sync::Mutex;

    /// Records every prompt and answers with it.
    struct EchoClient {
        calls: Mutex<Vec<String>>,
    }

    impl EchoClient {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChatClient for EchoClient {
        async fn complete(&self, request: ChatRequest<'_>) -> Result<String, ChatApiError> {
            self.calls.lock().unwrap().push(request.prompt.to_string());
            Ok(format!("summary of [{}]", request.prompt))
        }
    }

    fn pages(n: usize) -> PageText {
        (1..=n).map(|p| (p, format!("page {p}"))).collect()
    }

    fn config() -> RunConfig {
        RunConfig::builder()
            .map_template("{max_words}:{text}")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn one_summary_per_page_in_order() {
        let client = EchoClient::new();
        let set = map_summarize(
            &client,
            &pages(3),
            &config(),
            &NoopProgressCallback,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.texts().collect::<Vec<_>>(),
            vec![
                "summary of [150:page 1]",
                "summary of [150:page 2]",
                "summary of [150:page 3]"
            ]
        );
        assert_eq!(client.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_calls() {
        let client = EchoClient::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = map_summarize(&client, &pages(3), &config(), &NoopProgressCallback, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfSumError::Cancelled));
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn summary_set_from_vec_sorts_by_page() {
        let set = SummarySet::from(vec![
            PageSummary {
                page_num: 2,
                summary: "b".into(),
            },
            PageSummary {
                page_num: 1,
                summary: "a".into(),
            },
        ]);
        assert_eq!(set.texts().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
