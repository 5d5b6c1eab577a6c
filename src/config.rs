//! Configuration types for a summary run.
//!
//! Every knob that influences one run lives in [`RunConfig`], built via its
//! [`RunConfigBuilder`]. The config is constructed once per run and passed by
//! reference through extraction, map and reduce; no stage reads settings
//! from anywhere else.
//!
//! The page range is deliberately not part of the config: it describes the
//! document, not the summarisation, and is validated against the document's
//! page count at extraction time (see [`PageRange::validate`]).

use crate::error::{ConfigurationError, ExtractionError, PdfSumError};
use crate::prompts::{self, DEFAULT_SYS_MESSAGE, REDUCE_SUMMARY_PROMPT_TPL, SUMMARY_PROMPT_TPL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permitted `map_max_words` values.
pub const MAP_WORDS_RANGE: (u32, u32) = (50, 300);
/// Permitted `reduce_max_words` values.
pub const REDUCE_WORDS_RANGE: (u32, u32) = (100, 500);

/// Environment variable holding the provider API key.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration for one map-reduce summary run.
///
/// # Example
/// ```rust
/// use edgequake_pdfsum::{RunConfig, SummaryModel};
///
/// let config = RunConfig::builder()
///     .map_model(SummaryModel::Gpt41Nano)
///     .map_max_words(120)
///     .reduce_max_words(400)
///     .build()
///     .unwrap();
/// assert_eq!(config.reduce_max_tokens, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// System message sent with every chat call. Default: built-in message.
    pub system_message: SystemMessage,

    /// Model used for the per-page summaries. Default: `gpt-3.5-turbo`.
    pub map_model: SummaryModel,

    /// Word ceiling embedded in each map prompt. Range: 50–300. Default: 150.
    pub map_max_words: u32,

    /// Model used for the final summary. Default: `gpt-4-1106-preview`.
    pub reduce_model: SummaryModel,

    /// Word ceiling embedded in the reduce prompt. Range: 100–500. Default: 300.
    pub reduce_max_words: u32,

    /// Hard generation ceiling for the reduce call, in tokens. Default: 1024.
    ///
    /// Distinct from `reduce_max_words`: the word count is a hint inside the
    /// prompt, this one is enforced by the provider.
    pub reduce_max_tokens: usize,

    /// Generation ceiling for each map call. Default: None (provider default).
    pub map_max_tokens: Option<usize>,

    /// Sampling temperature. Default: None (provider default).
    pub temperature: Option<f32>,

    /// Number of map calls in flight at once. Default: 1 (strictly sequential).
    ///
    /// Summaries are always handed to the reduce step in page order,
    /// whatever the concurrency.
    pub concurrency: usize,

    /// Per-chat-call timeout in seconds. Default: 120.
    pub chat_timeout_secs: u64,

    /// Template for each page summary. Must contain `{text}` and `{max_words}`.
    pub map_template: String,

    /// Template for the final summary. Must contain `{text}` and `{max_words}`.
    pub reduce_template: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            system_message: SystemMessage::Default,
            map_model: SummaryModel::Gpt35Turbo,
            map_max_words: 150,
            reduce_model: SummaryModel::Gpt4Turbo,
            reduce_max_words: 300,
            reduce_max_tokens: 1024,
            map_max_tokens: None,
            temperature: None,
            concurrency: 1,
            chat_timeout_secs: 120,
            map_template: SUMMARY_PROMPT_TPL.to_string(),
            reduce_template: REDUCE_SUMMARY_PROMPT_TPL.to_string(),
        }
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check every constraint the builder enforces.
    ///
    /// Fields are public, so the orchestrator re-validates before a run
    /// starts rather than trusting that the builder was used.
    pub fn validate(&self) -> Result<(), PdfSumError> {
        check_words("Map", self.map_max_words, MAP_WORDS_RANGE)?;
        check_words("Reduce", self.reduce_max_words, REDUCE_WORDS_RANGE)?;
        if self.concurrency == 0 {
            return Err(ConfigurationError::Invalid("Concurrency must be ≥ 1".into()).into());
        }
        if self.reduce_max_tokens == 0 {
            return Err(
                ConfigurationError::Invalid("Reduce max tokens must be ≥ 1".into()).into(),
            );
        }
        if self.chat_timeout_secs == 0 {
            return Err(
                ConfigurationError::Invalid("Chat timeout must be ≥ 1 second".into()).into(),
            );
        }
        prompts::check_template(&self.map_template)?;
        prompts::check_template(&self.reduce_template)?;
        Ok(())
    }

    /// The system message text actually sent to the model.
    pub fn system_message_text(&self) -> &str {
        self.system_message.text()
    }
}

fn check_words(stage: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), ConfigurationError> {
    if value < min || value > max {
        return Err(ConfigurationError::WordsOutOfRange {
            stage,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn system_message(mut self, message: SystemMessage) -> Self {
        self.config.system_message = message;
        self
    }

    /// Shorthand for `system_message(SystemMessage::Custom(..))`.
    pub fn custom_system_message(mut self, message: impl Into<String>) -> Self {
        self.config.system_message = SystemMessage::Custom(message.into());
        self
    }

    pub fn map_model(mut self, model: SummaryModel) -> Self {
        self.config.map_model = model;
        self
    }

    pub fn map_max_words(mut self, words: u32) -> Self {
        self.config.map_max_words = words;
        self
    }

    pub fn reduce_model(mut self, model: SummaryModel) -> Self {
        self.config.reduce_model = model;
        self
    }

    pub fn reduce_max_words(mut self, words: u32) -> Self {
        self.config.reduce_max_words = words;
        self
    }

    pub fn reduce_max_tokens(mut self, n: usize) -> Self {
        self.config.reduce_max_tokens = n;
        self
    }

    pub fn map_max_tokens(mut self, n: usize) -> Self {
        self.config.map_max_tokens = Some(n);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn chat_timeout_secs(mut self, secs: u64) -> Self {
        self.config.chat_timeout_secs = secs;
        self
    }

    pub fn map_template(mut self, template: impl Into<String>) -> Self {
        self.config.map_template = template.into();
        self
    }

    pub fn reduce_template(mut self, template: impl Into<String>) -> Self {
        self.config.reduce_template = template.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, PdfSumError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The system message given to the chat model for every call of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemMessage {
    /// [`DEFAULT_SYS_MESSAGE`]. (default)
    #[default]
    Default,
    /// Caller-supplied text, sent verbatim (may be empty).
    Custom(String),
}

impl SystemMessage {
    pub fn text(&self) -> &str {
        match self {
            SystemMessage::Default => DEFAULT_SYS_MESSAGE,
            SystemMessage::Custom(s) => s,
        }
    }
}

/// Chat models a run may select for its map or reduce step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryModel {
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-4-1106-preview")]
    Gpt4Turbo,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4.1-mini")]
    Gpt41Mini,
    #[serde(rename = "gpt-4.1-nano")]
    Gpt41Nano,
}

impl SummaryModel {
    pub const ALL: [SummaryModel; 5] = [
        SummaryModel::Gpt35Turbo,
        SummaryModel::Gpt4Turbo,
        SummaryModel::Gpt4o,
        SummaryModel::Gpt41Mini,
        SummaryModel::Gpt41Nano,
    ];

    /// Provider-side model identifier.
    pub fn id(&self) -> &'static str {
        match self {
            SummaryModel::Gpt35Turbo => "gpt-3.5-turbo",
            SummaryModel::Gpt4Turbo => "gpt-4-1106-preview",
            SummaryModel::Gpt4o => "gpt-4o",
            SummaryModel::Gpt41Mini => "gpt-4.1-mini",
            SummaryModel::Gpt41Nano => "gpt-4.1-nano",
        }
    }
}

impl fmt::Display for SummaryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SummaryModel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SummaryModel::ALL
            .into_iter()
            .find(|m| m.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigurationError::UnknownModel(wanted.to_string()))
    }
}

/// Inclusive, 1-indexed page range.
///
/// Construction is unchecked; [`PageRange::validate`] runs against the real
/// page count before any text is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl Default for PageRange {
    /// Pages 1–10, the range a fresh session starts with.
    fn default() -> Self {
        Self { start: 1, end: 10 }
    }
}

impl PageRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Check `1 ≤ start ≤ end ≤ total_pages`, naming the offending bound.
    pub fn validate(&self, total_pages: usize) -> Result<(), ExtractionError> {
        if self.start > self.end {
            return Err(ExtractionError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.start < 1 || self.start > total_pages {
            return Err(ExtractionError::PageOutOfRange {
                page: self.start,
                total: total_pages,
            });
        }
        if self.end > total_pages {
            return Err(ExtractionError::PageOutOfRange {
                page: self.end,
                total: total_pages,
            });
        }
        Ok(())
    }

    /// Number of pages covered (0 when `start > end`).
    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 1-indexed page numbers in ascending order.
    pub fn pages(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for PageRange {
    type Err = ExtractionError;

    /// Parse `"3-15"` or a single page `"5"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| ExtractionError::InvalidPageNumber {
                    input: v.trim().to_string(),
                })
        };
        let range = match s.split_once('-') {
            Some((start, end)) => PageRange::new(parse(start)?, parse(end)?),
            None => {
                let page = parse(s)?;
                PageRange::new(page, page)
            }
        };
        if range.start > range.end {
            return Err(ExtractionError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        Ok(range)
    }
}

/// Read and sanity-check the provider API key from `env_var`.
///
/// Called once at process start: a missing or malformed key is fatal for the
/// process, not an error of an individual run.
pub fn validate_api_key(env_var: &str) -> Result<String, ConfigurationError> {
    let key = std::env::var(env_var).unwrap_or_default();
    check_api_key(env_var, &key)?;
    Ok(key)
}

fn check_api_key(env_var: &str, key: &str) -> Result<(), ConfigurationError> {
    if key.trim().is_empty() {
        return Err(ConfigurationError::MissingApiKey {
            var: env_var.to_string(),
        });
    }
    if key.chars().any(char::is_whitespace) {
        return Err(ConfigurationError::InvalidApiKey {
            var: env_var.to_string(),
            reason: "key contains whitespace".into(),
        });
    }
    Ok(())
}
