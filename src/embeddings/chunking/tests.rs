use super::*;
use crate::extraction::{DocumentText, tag_pages};

struct StaticDocument(DocumentText);

impl PaginatedDocument for StaticDocument {
    fn document_id(&self) -> String {
        "static.pdf".to_string()
    }

    fn read_text(&self) -> Result<DocumentText> {
        Ok(self.0.clone())
    }
}

fn small_config() -> ChunkingConfig {
    ChunkingConfig {
        chunk_size: 120,
        chunk_overlap: 30,
        ..ChunkingConfig::default()
    }
}

fn lowercase_page(page: usize) -> String {
    (0..15)
        .map(|i| format!("sentence {} on page {} has no heading.", i, page))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn heading_on_second_page() {
    let text = tag_pages(&[
        "a preface that has no heading at all.",
        "1. Introduction\n\nThe paper begins here.",
    ]);
    let chunks = chunk_document("paper.pdf", &text, &ChunkingConfig::default());

    assert_eq!(chunks.len(), 1);
    let chunk = &chunks[0];
    assert_eq!(chunk.metadata.section, "Introduction");
    assert_eq!(chunk.metadata.pages, "2");
    assert_eq!(chunk.metadata.source, "paper.pdf");
    assert_eq!(chunk.text, "1. Introduction\n\nThe paper begins here.");
    assert!(!chunk.text.contains("preface"));
}

#[test]
fn section_spanning_pages_reports_marker_range() {
    let text = tag_pages(&[
        "Methods\n\nstep one of the method.",
        "step two of the method.",
        "step three of the method.",
    ]);
    let chunks = chunk_document("paper.pdf", &text, &ChunkingConfig::default());

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].metadata.pages, "2-3");
    assert!(chunks[0].text.contains("step one"));
    assert!(chunks[0].text.contains("step three"));
}

#[test]
fn sections_without_markers_inherit_page_in_effect() {
    let text = tag_pages(&[
        "Abstract\n\nshort abstract.\n\nResults\n\nnumbers went up.",
        "Discussion\n\nthe numbers mean things.",
    ]);
    let chunks = chunk_document("paper.pdf", &text, &ChunkingConfig::default());

    let summary: Vec<(&str, &str)> = chunks
        .iter()
        .map(|c| (c.metadata.section.as_str(), c.metadata.pages.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![("Abstract", "1"), ("Results", "2"), ("Discussion", "2")]
    );
}

#[test]
fn no_headings_uses_fallback_only() {
    let pages: Vec<String> = (1..=4).map(lowercase_page).collect();
    let text = tag_pages(&pages);
    let chunks = chunk_document("notes.pdf", &text, &small_config());

    assert!(chunks.len() > 4);
    assert!(
        chunks
            .iter()
            .all(|c| c.metadata.section == UNKNOWN_SECTION)
    );
}

#[test]
fn chunk_text_never_contains_markers() {
    let pages: Vec<String> = (1..=6).map(lowercase_page).collect();
    let text = tag_pages(&pages);

    // Small windows force cuts through marker labels
    for size in [10, 17, 40, 120] {
        let config = ChunkingConfig {
            chunk_size: size,
            chunk_overlap: size / 4,
            ..ChunkingConfig::default()
        };
        for chunk in chunk_document("notes.pdf", &text, &config) {
            assert!(!chunk.text.contains("--- Page"), "marker in {:?}", chunk.text);
            assert!(!chunk.text.contains("---"), "fragment in {:?}", chunk.text);
            assert_eq!(chunk.text, chunk.text.trim());
            assert!(!chunk.text.is_empty());
        }
    }
}

#[test]
fn fallback_pages_are_ordered_ranges() {
    let pages: Vec<String> = (1..=5).map(lowercase_page).collect();
    let text = tag_pages(&pages);
    let chunks = chunk_document("notes.pdf", &text, &small_config());

    let mut last_start = 0_u32;
    for chunk in &chunks {
        let (start, end) = match chunk.metadata.pages.split_once('-') {
            Some((a, b)) => (
                a.parse::<u32>().expect("page should be numeric"),
                b.parse::<u32>().expect("page should be numeric"),
            ),
            None => {
                let page = chunk
                    .metadata
                    .pages
                    .parse::<u32>()
                    .expect("page should be numeric");
                (page, page)
            }
        };
        assert!(start >= 1 && end <= 5);
        assert!(start <= end);
        assert!(start >= last_start);
        last_start = start;
    }
    assert_eq!(chunks.first().map(|c| c.metadata.pages.as_str()), Some("1"));
}

#[test]
fn unpaged_text_defaults_to_page_one() {
    let text = "Title: Something\n\nAuthors: A Person\n\nAbstract:\nwhat we found.";
    let chunks = chunk_document("PMID:42", text, &ChunkingConfig::default());
    assert!(!chunks.is_empty());
    assert!(chunks.iter().all(|c| c.metadata.pages == "1"));
}

#[test]
fn empty_document_is_no_content() {
    let document = StaticDocument(DocumentText::Paged(vec![String::new(), "   ".to_string()]));
    match chunk_paginated(&document, &ChunkingConfig::default()) {
        Err(RagError::NoContent { document }) => assert_eq!(document, "static.pdf"),
        other => panic!("expected no content error, got {:?}", other),
    }
}

#[test]
fn paginated_document_is_chunked() {
    let document = StaticDocument(DocumentText::Paged(vec![
        "front matter.".to_string(),
        "2 Background\n\nearlier work.".to_string(),
    ]));
    let chunks =
        chunk_paginated(&document, &ChunkingConfig::default()).expect("document should chunk");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].metadata.section, "Background");
    assert_eq!(chunks[0].metadata.source, "static.pdf");
}

#[test]
fn metadata_serializes_page_key() {
    let metadata = ChunkMetadata {
        source: "paper.pdf".to_string(),
        pages: "3-4".to_string(),
        section: "Results".to_string(),
    };
    let json = serde_json::to_value(&metadata).expect("metadata should serialize");
    assert_eq!(json["page(s)"], "3-4");
}

#[test]
fn config_defaults_survive_partial_toml() {
    let config: ChunkingConfig = toml::from_str("chunk_size = 500").expect("should parse");
    assert_eq!(config.chunk_size, 500);
    assert_eq!(config.chunk_overlap, 200);
    assert_eq!(config.separators, default_separators());
}
