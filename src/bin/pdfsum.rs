//! CLI binary for edgequake-pdfsum.
//!
//! A thin shim over the library crate that maps CLI flags to `RunConfig`,
//! runs one summary and prints or saves the result.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfsum::config::validate_api_key;
use edgequake_pdfsum::{
    resolve_output_path, write_summary, Document, ExportFormat, LlmChatClient, PageRange,
    PdfiumExtractor, ProgressCallback, RunConfig, RunControl, RunState, Summarizer, SummaryModel,
    SummaryProgressCallback, SummarySession, SystemMessage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while extracting and reducing, and
/// a page bar while mapping.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  \
         [{bar:42.green/238}] {pos:>3}/{len} pages  \
         ⏱ {elapsed_precise}  ETA {eta_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(TICKS)
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_state_change(&self, state: RunState) {
        match state {
            RunState::Extracting => {
                self.bar.set_prefix("Extracting");
                self.bar.set_message("reading page text…");
            }
            RunState::Reducing => {
                self.bar.set_style(spinner_style());
                self.bar.set_prefix("Reducing");
                self.bar.set_message("writing the final summary…");
            }
            RunState::Done | RunState::Failed => self.bar.finish_and_clear(),
            RunState::Idle | RunState::Mapping => {}
        }
    }

    fn on_map_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_position(0);
        self.bar.set_style(bar_style());
        self.bar.set_prefix("Summarising");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Summarising {total_pages} pages…"))
        ));
    }

    fn on_page_summarized(&self, page_num: usize, total_pages: usize, summary_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{summary_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_run_failed(&self, stage: RunState, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), stage.verb(), red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise pages 1-10 (stdout)
  pdfsum report.pdf

  # Pick the page range
  pdfsum --start-page 5 --end-page 20 report.pdf

  # Save as Markdown
  pdfsum report.pdf -o summary.md

  # Save into a directory using the export file name (summary.txt / summary.md)
  pdfsum report.pdf -o out/ --format md

  # Cheaper map model, longer final summary
  pdfsum --map-model gpt-4.1-nano --reduce-words 500 report.pdf

  # Summarise a PDF from a URL
  pdfsum https://arxiv.org/pdf/1706.03762 --end-page 5

  # Inspect PDF metadata (no API key needed)
  pdfsum --inspect-only report.pdf

  # JSON output with timings
  pdfsum --json report.pdf > summary.json

MODELS:
  gpt-3.5-turbo        map default
  gpt-4-1106-preview   reduce default
  gpt-4o
  gpt-4.1-mini
  gpt-4.1-nano

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (see --api-key-env)
  PDFIUM_LIB_PATH         Path to libpdfium
  PDFSUM_*                Fallback for every flag, e.g. PDFSUM_MAP_WORDS=200
"#;

/// Summarise PDF files and URLs with chat models.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsum",
    version,
    about = "Summarise PDF files and URLs with chat models",
    long_about = "Summarise a page range of a PDF document (local file or URL). Each page is \
summarised on its own with the map model, then the page summaries are merged into one summary \
with the reduce model.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// First page to summarise (1-indexed).
    #[arg(short = 's', long, env = "PDFSUM_START_PAGE", default_value_t = 1)]
    start_page: usize,

    /// Last page to summarise (inclusive).
    #[arg(short = 'e', long, env = "PDFSUM_END_PAGE", default_value_t = 10)]
    end_page: usize,

    /// System message sent with every call. Empty string sends none.
    #[arg(long, env = "PDFSUM_SYSTEM_MESSAGE", conflicts_with = "system_message_file")]
    system_message: Option<String>,

    /// Path to a text file containing the system message.
    #[arg(long, env = "PDFSUM_SYSTEM_MESSAGE_FILE")]
    system_message_file: Option<PathBuf>,

    /// Model for the per-page summaries.
    #[arg(long, env = "PDFSUM_MAP_MODEL", default_value = "gpt-3.5-turbo")]
    map_model: SummaryModel,

    /// Word ceiling for each page summary (50–300).
    #[arg(long, env = "PDFSUM_MAP_WORDS", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(50..=300))]
    map_words: u32,

    /// Model for the final summary.
    #[arg(long, env = "PDFSUM_REDUCE_MODEL", default_value = "gpt-4-1106-preview")]
    reduce_model: SummaryModel,

    /// Word ceiling for the final summary (100–500).
    #[arg(long, env = "PDFSUM_REDUCE_WORDS", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(100..=500))]
    reduce_words: u32,

    /// Number of page summaries in flight at once.
    #[arg(short, long, env = "PDFSUM_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Sampling temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "PDFSUM_TEMPERATURE")]
    temperature: Option<f32>,

    /// Per-call chat timeout in seconds.
    #[arg(long, env = "PDFSUM_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFSUM_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFSUM_PASSWORD")]
    password: Option<String>,

    /// Write the summary to this file (or into this directory) instead of stdout.
    #[arg(short, long, env = "PDFSUM_OUTPUT")]
    output: Option<PathBuf>,

    /// Export format: txt or md. Inferred from --output when omitted.
    #[arg(long, env = "PDFSUM_FORMAT")]
    format: Option<ExportFormat>,

    /// Output structured JSON (SummaryOutput) instead of plain text.
    #[arg(long, env = "PDFSUM_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFSUM_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no summary.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSUM_QUIET")]
    quiet: bool,

    /// Environment variable holding the API key.
    #[arg(long, env = "PDFSUM_API_KEY_ENV", default_value = "OPENAI_API_KEY")]
    api_key_env: String,

    /// LLM provider name.
    #[arg(long, env = "PDFSUM_PROVIDER", default_value = "openai")]
    provider: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        return inspect(&cli).await;
    }

    // ── API key check ────────────────────────────────────────────────────
    validate_api_key(&cli.api_key_env).context("API key check failed")?;
    let client = LlmChatClient::new(&cli.provider).context("Failed to set up the chat provider")?;
    let summarizer = Summarizer::new(PdfiumExtractor::new(), client);

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli).await?;
    let range = PageRange::new(cli.start_page, cli.end_page);

    let mut document = Document::resolve(&cli.input, cli.download_timeout)
        .await
        .with_context(|| format!("Failed to open {}", cli.input))?;
    if let Some(ref password) = cli.password {
        document = document.with_password(password.clone());
    }

    let mut control = RunControl::default();
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        control = control.with_progress(cb);
    }

    // Ctrl-C stops the run at the next page boundary or in-flight call.
    let cancel = control.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    // ── Run summary ──────────────────────────────────────────────────────
    let session = SummarySession::new();
    let output = summarizer
        .run(document, range, &config, &session, &control)
        .await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(ref output_path) = cli.output {
        let (target, _) = resolve_output_path(output_path, cli.format);
        write_summary(&target, &output.summary)
            .await
            .context("Failed to save summary")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} pages  {}ms  →  {}",
                green("✔"),
                output.stats.pages,
                output.stats.total_duration_ms,
                bold(&target.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        let text = output.summary.as_str();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json && cli.output.is_none() {
        eprintln!(
            "{}",
            dim(&format!(
                "Summarised pages {} in {}ms (map {}ms, reduce {}ms)",
                output.page_range,
                output.stats.total_duration_ms,
                output.stats.map_duration_ms,
                output.stats.reduce_duration_ms,
            ))
        );
    }

    Ok(())
}

/// Print PDF metadata.
async fn inspect(cli: &Cli) -> Result<()> {
    let mut document = Document::resolve(&cli.input, cli.download_timeout)
        .await
        .with_context(|| format!("Failed to open {}", cli.input))?;
    if let Some(ref password) = cli.password {
        document = document.with_password(password.clone());
    }

    let meta = PdfiumExtractor::new()
        .inspect(&document)
        .await
        .context("Failed to inspect PDF")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
        );
        return Ok(());
    }

    println!("File:         {}", cli.input);
    if let Some(ref t) = meta.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = meta.author {
        println!("Author:       {}", a);
    }
    if let Some(ref s) = meta.subject {
        println!("Subject:      {}", s);
    }
    println!("Pages:        {}", meta.page_count);
    println!("PDF Version:  {}", meta.pdf_version);
    if let Some(ref p) = meta.producer {
        println!("Producer:     {}", p);
    }
    if let Some(ref c) = meta.creator {
        println!("Creator:      {}", c);
    }
    Ok(())
}

/// Map CLI args to `RunConfig`.
async fn build_config(cli: &Cli) -> Result<RunConfig> {
    let system_message = if let Some(ref path) = cli.system_message_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system message from {:?}", path))?;
        SystemMessage::Custom(text)
    } else if let Some(ref text) = cli.system_message {
        SystemMessage::Custom(text.clone())
    } else {
        SystemMessage::Default
    };

    let mut builder = RunConfig::builder()
        .system_message(system_message)
        .map_model(cli.map_model)
        .map_max_words(cli.map_words)
        .reduce_model(cli.reduce_model)
        .reduce_max_words(cli.reduce_words)
        .concurrency(cli.concurrency)
        .chat_timeout_secs(cli.api_timeout);

    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }

    builder.build().context("Invalid configuration")
}
