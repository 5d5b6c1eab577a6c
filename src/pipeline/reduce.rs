//! Reduce stage: merge the page summaries into one final summary.

use crate::config::RunConfig;
use crate::error::PdfSumError;
use crate::output::FinalSummary;
use crate::pipeline::chat::{complete_with_timeout, ChatClient, ChatRequest};
use crate::pipeline::map::SummarySet;
use crate::prompts::build_prompt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Join summaries with `"\n"` and drop every `"\n\n"` sequence.
///
/// Page summaries often end with a blank line; after joining, those would
/// stack up into runs of empty lines in the reduce prompt.
pub fn join_summaries(summaries: &SummarySet) -> String {
    summaries
        .texts()
        .collect::<Vec<_>>()
        .join("\n")
        .replace("\n\n", "")
}

/// Produce the final summary from the map stage's output.
///
/// Never called with an empty set: the orchestrator only reduces after the
/// map stage produced a summary for every requested page, and an empty set
/// is rejected here as well.
pub async fn reduce_summarize<C: ChatClient>(
    client: &C,
    summaries: &SummarySet,
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<FinalSummary, PdfSumError> {
    if summaries.is_empty() {
        return Err(PdfSumError::Internal(
            "reduce step called without page summaries".into(),
        ));
    }

    let text = join_summaries(summaries);
    let prompt = build_prompt(&config.reduce_template, &text, config.reduce_max_words)?;
    debug!(
        "Reduce prompt: {} summaries, {} chars",
        summaries.len(),
        prompt.len()
    );

    let request = ChatRequest {
        prompt: &prompt,
        system_message: config.system_message_text(),
        model: config.reduce_model,
        max_tokens: Some(config.reduce_max_tokens),
        temperature: config.temperature,
    };
    let timeout = Duration::from_secs(config.chat_timeout_secs);

    let summary = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PdfSumError::Cancelled),
        result = complete_with_timeout(client, request, timeout) => result.map_err(|e| {
            warn!("Final reduce summary failed: {}", e);
            PdfSumError::from(e)
        })?,
    };

    info!("Completed final reduce summary with {}", config.reduce_model);
    Ok(FinalSummary::new(summary))
}
