//! Input resolution: turn a path, URL, or uploaded bytes into a [`Document`].
//!
//! pdfium reads from the file system, so uploads and downloads are staged in
//! a temporary file owned by the `Document`. The file is removed when the
//! `Document` is dropped, which the orchestrator does as soon as a run ends
//! (successfully or not). We validate the PDF magic bytes (`%PDF`) up front
//! so callers get a meaningful error rather than a pdfium failure.

use crate::error::ExtractionError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF ready to be read by a [`crate::pipeline::extract::TextExtractor`].
#[derive(Debug)]
pub struct Document {
    backing: Backing,
    password: Option<String>,
}

#[derive(Debug)]
enum Backing {
    /// Caller-owned file; never removed by us.
    Local(PathBuf),
    /// Upload or download staged in a temp file; removed on drop.
    Staged(NamedTempFile),
}

impl Document {
    /// Open a local PDF, validating existence, permissions and magic bytes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExtractionError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(ExtractionError::FileNotFound { path });
        }

        match std::fs::File::open(&path) {
            Ok(f) => {
                // A short or unreadable header is rejected like any other non-PDF.
                let mut head = Vec::with_capacity(PDF_MAGIC.len());
                let _ = f.take(PDF_MAGIC.len() as u64).read_to_end(&mut head);
                check_magic(&path.display().to_string(), &head)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(ExtractionError::PermissionDenied { path });
            }
            Err(_) => {
                return Err(ExtractionError::FileNotFound { path });
            }
        }

        debug!("Resolved local PDF: {}", path.display());
        Ok(Self {
            backing: Backing::Local(path),
            password: None,
        })
    }

    /// Stage an uploaded PDF payload in a temporary file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractionError> {
        check_magic("upload", bytes)?;

        let mut tmp = NamedTempFile::new()
            .map_err(|e| ExtractionError::StagingFailed(format!("tempfile: {e}")))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| ExtractionError::StagingFailed(format!("tempfile write: {e}")))?;

        debug!(
            "Staged {} byte upload at {}",
            bytes.len(),
            tmp.path().display()
        );
        Ok(Self {
            backing: Backing::Staged(tmp),
            password: None,
        })
    }

    /// Download a PDF over HTTP(S) and stage it in a temporary file.
    pub async fn download(url: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        info!("Downloading PDF from: {}", url);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                ExtractionError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(ExtractionError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExtractionError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        check_magic(url, &bytes)?;
        let document = Self::from_bytes(&bytes)?;
        info!("Downloaded {} bytes to: {}", bytes.len(), document.path().display());
        Ok(document)
    }

    /// Resolve a CLI-style input: HTTP(S) URLs are downloaded, anything else
    /// is opened as a local path.
    pub async fn resolve(input: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        if is_url(input) {
            Self::download(input, timeout_secs).await
        } else {
            Self::open(input)
        }
    }

    /// Attach the user password for an encrypted PDF.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Path of the readable file backing this document.
    pub fn path(&self) -> &Path {
        match &self.backing {
            Backing::Local(p) => p,
            Backing::Staged(tmp) => tmp.path(),
        }
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Whether the backing file is a temporary copy owned by this document.
    pub fn is_staged(&self) -> bool {
        matches!(self.backing, Backing::Staged(_))
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn check_magic(source_name: &str, bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        return Err(ExtractionError::NotAPdf {
            source_name: source_name.to_string(),
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        });
    }
    Ok(())
}
