//! Text extraction: pull the plain text of a page range out of a PDF.
//!
//! [`TextExtractor`] is the seam the orchestrator depends on; the production
//! implementation is [`PdfiumExtractor`].
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to call from async contexts. Loading and reading a
//! document therefore runs on Tokio's blocking pool so worker threads never
//! stall on a large PDF.

use crate::config::PageRange;
use crate::error::ExtractionError;
use crate::pipeline::input::Document;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extracted text keyed by 1-indexed page number, in ascending page order.
///
/// Built once by an extractor; there is no API to modify it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pages: BTreeMap<usize, String>,
}

impl PageText {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, page_num: usize) -> Option<&str> {
        self.pages.get(&page_num).map(String::as_str)
    }

    /// Page numbers in ascending order.
    pub fn page_numbers(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages.keys().copied()
    }

    /// `(page_num, text)` pairs in ascending page order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.pages.iter().map(|(p, t)| (*p, t.as_str()))
    }
}

impl FromIterator<(usize, String)> for PageText {
    fn from_iter<I: IntoIterator<Item = (usize, String)>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

/// Something that can read the text of a page range out of a [`Document`].
///
/// Implementations must validate `range` against the document's page count
/// before reading any page, failing with
/// [`ExtractionError::InvalidRange`] or [`ExtractionError::PageOutOfRange`].
pub trait TextExtractor: Send + Sync {
    fn extract(
        &self,
        document: &Document,
        range: PageRange,
    ) -> impl Future<Output = Result<PageText, ExtractionError>> + Send;
}

/// PDF metadata, available without extracting any text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// [`TextExtractor`] backed by pdfium.
///
/// The library is located, in order, at: the explicit path given to
/// [`PdfiumExtractor::with_library`], `$PDFIUM_LIB_PATH`, the current
/// directory, then the system library search path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    /// Read document metadata without extracting page text.
    pub async fn inspect(&self, document: &Document) -> Result<DocumentMetadata, ExtractionError> {
        let path = document.path().to_path_buf();
        let password = document.password().map(str::to_string);
        let lib = self.library_path.clone();

        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium(lib.as_deref())?;
            inspect_blocking(&pdfium, &path, password.as_deref())
        })
        .await
        .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("Inspect task panicked: {e}")))?
    }
}

impl TextExtractor for PdfiumExtractor {
    async fn extract(
        &self,
        document: &Document,
        range: PageRange,
    ) -> Result<PageText, ExtractionError> {
        let path = document.path().to_path_buf();
        let password = document.password().map(str::to_string);
        let lib = self.library_path.clone();

        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium(lib.as_deref())?;
            extract_blocking(&pdfium, &path, password.as_deref(), range)
        })
        .await
        .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("Extract task panicked: {e}")))?
    }
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, ExtractionError> {
    let env_path = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);

    let bindings = match library_path.map(Path::to_path_buf).or(env_path) {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, ExtractionError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                ExtractionError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                ExtractionError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            ExtractionError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Blocking implementation of page-text extraction.
fn extract_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
    password: Option<&str>,
    range: PageRange,
) -> Result<PageText, ExtractionError> {
    let document = open_document(pdfium, pdf_path, password)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    range.validate(total_pages)?;

    let mut texts = Vec::with_capacity(range.len());
    for (page_num, index) in page_indices(range) {
        let page = pages.get(index).map_err(|e| ExtractionError::PageTextFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;

        let text = page
            .text()
            .map_err(|e| ExtractionError::PageTextFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?
            .all();
        debug!("Extracted page {} → {} chars", page_num, text.len());
        texts.push((page_num, text));
    }

    Ok(texts.into_iter().collect())
}

/// `(page_num, pdfium index)` for each page of an already validated range.
///
/// Only these pages are loaded; pages before `range.start` are never touched.
fn page_indices(range: PageRange) -> impl Iterator<Item = (usize, u16)> {
    range.pages().map(|page_num| (page_num, (page_num - 1) as u16))
}

/// Blocking implementation of metadata extraction.
fn inspect_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, ExtractionError> {
    let document = open_document(pdfium, pdf_path, password)?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_text_is_ordered_by_page() {
        let text: PageText = vec![
            (7, "seven".to_string()),
            (5, "five".to_string()),
            (6, "six".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(text.len(), 3);
        assert_eq!(text.page_numbers().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert_eq!(
            text.iter().map(|(_, t)| t).collect::<Vec<_>>(),
            vec!["five", "six", "seven"]
        );
        assert_eq!(text.get(6), Some("six"));
        assert_eq!(text.get(8), None);
    }

    #[test]
    fn only_requested_pages_are_indexed() {
        let indices: Vec<_> = page_indices(PageRange::new(480, 481)).collect();
        assert_eq!(indices, vec![(480, 479), (481, 480)]);

        let first: Vec<_> = page_indices(PageRange::new(1, 1)).collect();
        assert_eq!(first, vec![(1, 0)]);
    }

    #[test]
    fn page_text_keys_are_unique() {
        let text: PageText = vec![(1, "a".to_string()), (1, "b".to_string())]
            .into_iter()
            .collect();
        assert_eq!(text.len(), 1);
    }
}
