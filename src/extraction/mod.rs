// Page-tagged text extraction
// Turns a source document into one text stream with `--- Page N ---` sentinels


use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use fancy_regex::Regex;
use tracing::{debug, warn};

use crate::{RagError, Result};

static PAGE_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n?(--- Page (\d+) ---)\n?").expect("page marker regex is valid")
});

/// Text produced by a document source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentText {
    /// One entry per page, in reading order
    Paged(Vec<String>),
    /// A single block with no page structure (bibliographic records)
    Unpaged(String),
}

/// A source that can produce its text, either page by page or as one block
pub trait PaginatedDocument {
    /// Identifier stored as the chunk source (file name, `PMID:<id>`)
    fn document_id(&self) -> String;

    /// Read the document text
    ///
    /// # Errors
    /// Returns `RagError::Extraction` when the source cannot be opened or parsed
    fn read_text(&self) -> Result<DocumentText>;
}

/// A page marker located inside a page-tagged text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMarker {
    /// Page number carried by the marker
    pub page: u32,
    /// Byte range of the whole marker, including its surrounding newlines
    pub range: Range<usize>,
    /// Byte range of the `--- Page N ---` label alone
    pub label: Range<usize>,
}

/// Format the sentinel inserted before a page's text
#[inline]
pub fn page_marker(page: usize) -> String {
    format!("\n--- Page {} ---\n", page)
}

/// Concatenate pages, preceding each one with its marker (pages are numbered from 1)
#[inline]
pub fn tag_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let capacity = pages.iter().map(|p| p.as_ref().len() + 20).sum();
    let mut tagged = String::with_capacity(capacity);
    for (index, page) in pages.iter().enumerate() {
        tagged.push_str(&page_marker(index + 1));
        tagged.push_str(page.as_ref());
    }
    tagged
}

/// Read a document and produce its page-tagged text
///
/// Unpaginated sources are returned as-is, without markers.
///
/// # Errors
/// Propagates the source's `RagError::Extraction`
#[inline]
pub fn page_tagged_text<D: PaginatedDocument + ?Sized>(document: &D) -> Result<String> {
    match document.read_text()? {
        DocumentText::Paged(pages) => {
            debug!(
                "Tagging {} pages for '{}'",
                pages.len(),
                document.document_id()
            );
            Ok(tag_pages(&pages))
        }
        DocumentText::Unpaged(text) => Ok(text),
    }
}

/// Locate every page marker in a page-tagged text, in order
#[inline]
pub fn find_page_markers(text: &str) -> Vec<PageMarker> {
    PAGE_MARKER_REGEX
        .captures_iter(text)
        .flatten()
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let label = captures.get(1)?;
            let page = captures.get(2)?.as_str().parse().ok()?;
            Some(PageMarker {
                page,
                range: whole.range(),
                label: label.range(),
            })
        })
        .collect()
}

/// Remove every page marker, leaving a single newline where each one stood
#[inline]
pub fn strip_page_markers(text: &str) -> String {
    PAGE_MARKER_REGEX.replace_all(text, "\n").into_owned()
}

/// A PDF file on disk
#[derive(Debug, Clone)]
pub struct PdfDocument {
    path: PathBuf,
    file_name: String,
}

impl PdfDocument {
    #[inline]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self { path, file_name }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PaginatedDocument for PdfDocument {
    #[inline]
    fn document_id(&self) -> String {
        self.file_name.clone()
    }

    #[inline]
    fn read_text(&self) -> Result<DocumentText> {
        // pdf-extract panics on some malformed inputs
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_by_pages(&self.path)
        }));

        let message = match outcome {
            Ok(Ok(pages)) => {
                debug!("{} has {} pages", self.file_name, pages.len());
                return Ok(DocumentText::Paged(pages));
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "PDF reader panicked".to_string()),
        };

        warn!("Failed to read PDF '{}': {}", self.file_name, message);
        Err(RagError::Extraction {
            document: self.file_name.clone(),
            message,
        })
    }
}
