//! # edgequake-pdfsum
//!
//! Summarise PDF documents with chat models using a map-reduce pipeline.
//!
//! A long document does not fit in one prompt, so each page is summarised on
//! its own (map) with a cheap model, and the page summaries are then merged
//! into a single summary (reduce) with a stronger model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    local file, URL download, or uploaded bytes
//!  ├─ 2. Extract  page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Map      one chat call per page, e.g. gpt-3.5-turbo
//!  ├─ 4. Reduce   one chat call over all page summaries, e.g. gpt-4-turbo
//!  └─ 5. Output   final summary, exportable as .txt or .md
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfsum::{Document, PageRange, RunConfig, RunControl, Summarizer, SummarySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fails fast when OPENAI_API_KEY is missing or malformed.
//!     let summarizer = Summarizer::from_env()?;
//!     let session = SummarySession::new();
//!
//!     let document = Document::open("report.pdf")?;
//!     let output = summarizer
//!         .run(
//!             document,
//!             PageRange::new(1, 10),
//!             &RunConfig::default(),
//!             &session,
//!             &RunControl::default(),
//!         )
//!         .await?;
//!
//!     println!("{}", output.summary);
//!     eprintln!("{} pages in {}ms", output.stats.pages, output.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsum` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfsum = { version = "0.1", default-features = false }
//! ```
//!
//! ## Models
//!
//! | Model | Typical use |
//! |-------|-------------|
//! | `gpt-3.5-turbo` | Map default, many short calls |
//! | `gpt-4-1106-preview` | Reduce default, one long call |
//! | `gpt-4o` | Higher-quality alternative for either stage |
//! | `gpt-4.1-mini`, `gpt-4.1-nano` | Cheap alternatives for the map stage |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageRange, RunConfig, RunConfigBuilder, SummaryModel, SystemMessage};
pub use error::{
    ChatApiError, ConfigurationError, ErrorKind, ExtractionError, PdfSumError, RunFailure,
    TemplateError,
};
pub use output::{
    resolve_output_path, write_summary, ExportFormat, FinalSummary, RunStats, SummaryExport,
    SummaryOutput,
};
pub use pipeline::chat::{ChatClient, ChatRequest, LlmChatClient};
pub use pipeline::extract::{DocumentMetadata, PageText, PdfiumExtractor, TextExtractor};
pub use pipeline::input::Document;
pub use pipeline::map::{PageSummary, SummarySet};
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use session::SummarySession;
pub use summarize::{RunControl, RunState, Summarizer};
