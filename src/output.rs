//! Run results and summary export.
//!
//! A finished run yields a [`SummaryOutput`]: the [`FinalSummary`] plus
//! timing stats. The summary can be exported as plain text or Markdown; both
//! formats carry byte-identical content and differ only in file name and
//! MIME type.

use crate::config::PageRange;
use crate::error::PdfSumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The reduce stage's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalSummary(String);

impl FinalSummary {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Package the summary for download in `format`.
    pub fn export(&self, format: ExportFormat) -> SummaryExport {
        SummaryExport {
            file_name: format.file_name(),
            mime: format.mime(),
            content: self.0.as_bytes().to_vec(),
        }
    }
}

impl fmt::Display for FinalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Download formats offered for a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// `summary.txt`, `text/plain`. (default)
    #[default]
    Text,
    /// `summary.md`, `text/markdown`.
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Text => "summary.txt",
            ExportFormat::Markdown => "summary.md",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain",
            ExportFormat::Markdown => "text/markdown",
        }
    }

    /// Infer the format from a path's extension (`.txt`, `.md`, `.markdown`).
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Text),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            other => Err(format!("unknown export format '{other}' (expected txt or md)")),
        }
    }
}

/// A summary packaged for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryExport {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub content: Vec<u8>,
}

/// Timing and volume figures for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages summarised in the map step.
    pub pages: usize,
    pub extract_duration_ms: u64,
    pub map_duration_ms: u64,
    pub reduce_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: FinalSummary,
    pub page_range: PageRange,
    pub stats: RunStats,
}

/// Where a summary requested at `path` is saved, and in which format.
///
/// `path` names a directory when it already is one, ends with a path
/// separator, or has no extension while `format` is given. A directory
/// receives the export's file name (`summary.txt` / `summary.md`); it is
/// created by [`write_summary`]. Without an explicit `format`, the format is
/// inferred from the file extension.
pub fn resolve_output_path(path: &Path, format: Option<ExportFormat>) -> (PathBuf, ExportFormat) {
    let trailing_separator = path
        .as_os_str()
        .to_str()
        .is_some_and(|s| s.ends_with(std::path::is_separator));
    let is_dir = path.is_dir()
        || trailing_separator
        || (format.is_some() && path.extension().is_none());

    let format = format
        .or_else(|| (!is_dir).then(|| ExportFormat::from_path(path)).flatten())
        .unwrap_or_default();

    if is_dir {
        (path.join(format.file_name()), format)
    } else {
        (path.to_path_buf(), format)
    }
}

/// Write `summary` to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_summary(path: impl AsRef<Path>, summary: &FinalSummary) -> Result<(), PdfSumError> {
    let path = path.as_ref();
    let write_err = |source| PdfSumError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, summary.as_str())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_share_content() {
        let summary = FinalSummary::new("# Title\n\nBody with *emphasis*.");
        let txt = summary.export(ExportFormat::Text);
        let md = summary.export(ExportFormat::Markdown);

        assert_eq!(txt.content, md.content);
        assert_eq!(txt.content, summary.as_str().as_bytes());
        assert_eq!((txt.file_name, txt.mime), ("summary.txt", "text/plain"));
        assert_eq!((md.file_name, md.mime), ("summary.md", "text/markdown"));
    }

    #[test]
    fn format_from_path_and_str() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/summary.md")),
            Some(ExportFormat::Markdown)
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("notes.TXT")),
            Some(ExportFormat::Text)
        );
        assert_eq!(ExportFormat::from_path(Path::new("summary")), None);
        assert_eq!("markdown".parse::<ExportFormat>(), Ok(ExportFormat::Markdown));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn final_summary_serialises_as_string() {
        let json = serde_json::to_string(&FinalSummary::new("hi")).unwrap();
        assert_eq!(json, "\"hi\"");
    }

    #[tokio::test]
    async fn write_summary_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/summary.md");
        let summary = FinalSummary::new("final text");

        write_summary(&path, &summary).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "final text");
        assert!(!dir.path().join("nested/out/summary.md.tmp").exists());
    }

    #[test]
    fn output_path_resolution() {
        let (path, format) = resolve_output_path(Path::new("out/"), Some(ExportFormat::Markdown));
        assert_eq!(path, Path::new("out/").join("summary.md"));
        assert_eq!(format, ExportFormat::Markdown);

        let (path, _) = resolve_output_path(Path::new("out"), Some(ExportFormat::Text));
        assert_eq!(path, Path::new("out").join("summary.txt"));

        let (path, format) = resolve_output_path(Path::new("notes/final.md"), None);
        assert_eq!(path, Path::new("notes/final.md"));
        assert_eq!(format, ExportFormat::Markdown);

        let (path, format) = resolve_output_path(Path::new("summary"), None);
        assert_eq!(path, Path::new("summary"));
        assert_eq!(format, ExportFormat::Text);
    }

    #[tokio::test]
    async fn missing_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let requested = dir.path().join("out/");
        let (target, _) = resolve_output_path(&requested, Some(ExportFormat::Markdown));

        write_summary(&target, &FinalSummary::new("body")).await.unwrap();

        let saved = dir.path().join("out").join("summary.md");
        assert!(dir.path().join("out").is_dir());
        assert_eq!(std::fs::read_to_string(saved).unwrap(), "body");
    }

    #[test]
    fn write_summary_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        std::fs::write(&path, "stale").unwrap();

        tokio_test::block_on(write_summary(&path, &FinalSummary::new("fresh"))).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
    }
}
