#[cfg(test)]
mod tests;

pub mod sections;
pub mod splitter;

use std::ops::Range;

use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extraction::{PageMarker, PaginatedDocument, find_page_markers, page_tagged_text};
use crate::{RagError, Result};

pub use sections::{Section, split_into_sections};
pub use splitter::split_text;

/// Section label for chunks produced by the fallback splitter
pub const UNKNOWN_SECTION: &str = "Unknown";

/// Separators tried from coarsest to finest by the fallback splitter
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Provenance attached to every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Document id: a file name or `PMID:<id>`
    pub source: String,
    /// `"N"` or `"N-M"`
    #[serde(rename = "page(s)")]
    pub pages: String,
    /// Heading title, or `"Unknown"` for fallback windows
    pub section: String,
}

/// A retrievable unit of a document, free of page markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Configuration for the fallback splitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum window length in characters
    pub chunk_size: usize,
    /// Characters carried from the tail of one window into the next
    pub chunk_overlap: usize,
    #[serde(skip, default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: default_separators(),
        }
    }
}

fn default_separators() -> Vec<String> {
    DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect()
}

/// Chunk one document's page-tagged text
///
/// Heading-delimited sections are used when any heading is detected; otherwise the
/// whole text goes through the fallback splitter and every chunk is labelled
/// `"Unknown"`. Chunks that are empty once markers are removed are dropped.
#[inline]
pub fn chunk_document(document_id: &str, tagged_text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let markers = find_page_markers(tagged_text);
    let sections = split_into_sections(tagged_text);

    let provisional: Vec<(Range<usize>, String)> = if sections.is_empty() {
        debug!("No headings in '{}', using fallback splitter", document_id);
        split_text(tagged_text, config)
            .into_iter()
            .map(|span| (span, UNKNOWN_SECTION.to_string()))
            .collect()
    } else {
        sections
            .into_iter()
            .map(|section| (section.span, section.title))
            .collect()
    };

    let chunks: Vec<Chunk> = provisional
        .into_iter()
        .filter_map(|(span, section)| {
            let text = clean_span(tagged_text, &span, &markers);
            if text.is_empty() {
                return None;
            }
            Some(Chunk {
                text,
                metadata: ChunkMetadata {
                    source: document_id.to_string(),
                    pages: resolve_pages(&span, &markers),
                    section,
                },
            })
        })
        .collect();

    debug!(
        "Chunked '{}' into {} chunks (avg {} chars)",
        document_id,
        chunks.len(),
        chunks.iter().map(|c| c.text.len()).sum::<usize>() / chunks.len().max(1)
    );

    chunks
}

/// Extract and chunk a document
///
/// # Errors
/// Returns `RagError::Extraction` when the document cannot be read and
/// `RagError::NoContent` when it yields no chunks
#[inline]
pub fn chunk_paginated<D: PaginatedDocument + ?Sized>(
    document: &D,
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>> {
    let document_id = document.document_id();
    let text = page_tagged_text(document)?;
    let chunks = chunk_document(&document_id, &text, config);
    if chunks.is_empty() {
        return Err(RagError::NoContent {
            document: document_id,
        });
    }
    Ok(chunks)
}

/// Page string for a span: the range of markers labelled inside it, or the page
/// in effect where it starts
fn resolve_pages(span: &Range<usize>, markers: &[PageMarker]) -> String {
    let inside = markers
        .iter()
        .filter(|m| m.label.start >= span.start && m.label.end <= span.end)
        .map(|m| m.page)
        .minmax();

    match inside {
        MinMaxResult::NoElements => page_at(span.start, markers).to_string(),
        MinMaxResult::OneElement(page) => page.to_string(),
        MinMaxResult::MinMax(min, max) if min == max => min.to_string(),
        MinMaxResult::MinMax(min, max) => format!("{}-{}", min, max),
    }
}

fn page_at(offset: usize, markers: &[PageMarker]) -> u32 {
    markers
        .iter()
        .take_while(|m| m.label.start < offset)
        .last()
        .map_or(1, |m| m.page)
}

/// Copy a span, replacing each marker (or fragment of one) with a newline, then trim
#[expect(clippy::string_slice, reason = "marker and span bounds are char boundaries")]
fn clean_span(text: &str, span: &Range<usize>, markers: &[PageMarker]) -> String {
    let mut cleaned = String::with_capacity(span.len());
    let mut cursor = span.start;

    for marker in markers
        .iter()
        .filter(|m| m.range.start < span.end && m.range.end > span.start)
    {
        let cut_start = marker.range.start.max(span.start);
        cleaned.push_str(&text[cursor..cut_start]);
        cleaned.push('\n');
        cursor = marker.range.end.min(span.end);
    }
    cleaned.push_str(&text[cursor..span.end]);

    cleaned.trim().to_string()
}
