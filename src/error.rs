//! Error types for the edgequake-pdfsum library.
//!
//! Four error kinds mirror the four ways a summary run can go wrong:
//!
//! * [`ExtractionError`]: the PDF cannot be read or the page range is invalid.
//! * [`TemplateError`]: a prompt template is missing a placeholder.
//! * [`ChatApiError`]: the upstream chat provider rejected or failed a call.
//! * [`ConfigurationError`]: the process or the run is misconfigured
//!   (missing API key, word bound outside its range, unknown model).
//!
//! [`PdfSumError`] wraps all four so stage functions share one `Result` type,
//! and [`RunFailure`] adds the pipeline stage at which a run stopped. Callers
//! branch on [`PdfSumError::kind`] rather than on message text.

use crate::summarize::RunState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning a PDF into per-page text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The payload was read, but is not a PDF.
    #[error("Input is not a valid PDF: '{source_name}'\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Start page is after the end page.
    #[error("Invalid page range {start}-{end}: start page must not exceed end page")]
    InvalidRange { start: usize, end: usize },

    /// A page number that does not parse as a positive integer.
    #[error("Invalid page number '{input}'")]
    InvalidPageNumber { input: String },

    /// One bound of the range lies outside `1..=total`.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium could not produce text for a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    PageTextFailed { page: usize, detail: String },

    /// URL input could not be downloaded.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Staging the upload to a temporary file failed.
    #[error("Failed to stage document: {0}")]
    StagingFailed(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place libpdfium next to the binary,\n\
or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),
}

/// Failures while rendering a prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template lacks a required `{name}` placeholder.
    #[error("Prompt template is missing the required '{{{placeholder}}}' placeholder")]
    MissingPlaceholder { placeholder: &'static str },
}

/// Failures reported by (or while talking to) the chat-completion provider.
#[derive(Debug, Clone, Error)]
pub enum ChatApiError {
    /// Provider returned 401/403.
    #[error("Authentication error from provider '{provider}': {detail}")]
    Authentication { provider: String, detail: String },

    /// Provider returned 429 or a quota error.
    #[error("Rate limit or quota exceeded for provider '{provider}': {detail}")]
    RateLimited { provider: String, detail: String },

    /// Connection-level failure before a response arrived.
    #[error("Network error talking to provider '{provider}': {detail}")]
    Network { provider: String, detail: String },

    /// The call did not complete within the configured timeout.
    #[error("Chat call to '{model}' timed out after {timeout:?}")]
    Timeout {
        model: String,
        timeout: std::time::Duration,
    },

    /// The provider answered, but the answer is unusable.
    #[error("Malformed response from model '{model}': {detail}")]
    MalformedResponse { model: String, detail: String },

    /// The request itself is invalid (e.g. an empty prompt).
    #[error("Invalid chat request: {0}")]
    InvalidRequest(String),

    /// Any other non-success answer from the provider.
    #[error("LLM API error: {message}")]
    Api { message: String },
}

/// Startup or configuration problems.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// The API key environment variable is unset or empty.
    #[error("API key not found: set the {var} environment variable.")]
    MissingApiKey { var: String },

    /// The API key is present but obviously malformed.
    #[error("API key in {var} is invalid: {reason}")]
    InvalidApiKey { var: String, reason: String },

    /// The chat provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A model identifier outside the supported set.
    #[error("Unknown model '{0}'. Supported: gpt-3.5-turbo, gpt-4-1106-preview, gpt-4o, gpt-4.1-mini, gpt-4.1-nano")]
    UnknownModel(String),

    /// A word bound outside its permitted range.
    #[error("{stage} max words must be {min}–{max}, got {value}")]
    WordsOutOfRange {
        stage: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// Any other invalid setting.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// All errors returned by the edgequake-pdfsum library.
#[derive(Debug, Error)]
pub enum PdfSumError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    ChatApi(#[from] ChatApiError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The run was cancelled through its cancellation token.
    #[error("Summary run was cancelled")]
    Cancelled,

    /// Could not create or write the output summary file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`PdfSumError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Extraction,
    Template,
    ChatApi,
    Configuration,
    Cancelled,
    Io,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Extraction => "extraction",
            ErrorKind::Template => "template",
            ErrorKind::ChatApi => "chat API",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Io => "I/O",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl PdfSumError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfSumError::Extraction(_) => ErrorKind::Extraction,
            PdfSumError::Template(_) => ErrorKind::Template,
            PdfSumError::ChatApi(_) => ErrorKind::ChatApi,
            PdfSumError::Configuration(_) => ErrorKind::Configuration,
            PdfSumError::Cancelled => ErrorKind::Cancelled,
            PdfSumError::OutputWriteFailed { .. } => ErrorKind::Io,
            PdfSumError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A summary run that stopped before reaching [`RunState::Done`].
///
/// `stage` is the state the run was in when the error occurred, so the
/// message reads e.g. "Summary failed while mapping: LLM API error: ...".
#[derive(Debug, Error)]
#[error("Summary failed while {}: {error}", .stage.verb())]
pub struct RunFailure {
    pub stage: RunState,
    #[source]
    pub error: PdfSumError,
}

impl RunFailure {
    pub fn new(stage: RunState, error: impl Into<PdfSumError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
