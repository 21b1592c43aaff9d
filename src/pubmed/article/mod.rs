// PubMed article records
// Streaming parse of efetch XML into bibliographic documents


use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use crate::extraction::{DocumentText, PaginatedDocument};
use crate::{RagError, Result};

pub const NO_TITLE: &str = "No Title";
pub const NO_ABSTRACT: &str = "No abstract available.";
pub const UNKNOWN_AUTHORS: &str = "Unknown";
pub const UNKNOWN_JOURNAL: &str = "Unknown Journal";
pub const UNKNOWN_YEAR: &str = "Unknown";

/// One article from an efetch response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubmedArticle {
    pub pmid: String,
    pub title: String,
    /// `ForeName LastName` pairs joined by ", "
    pub authors: String,
    pub journal: String,
    pub year: String,
    pub abstract_text: String,
}

impl PubmedArticle {
    /// Text indexed for the article
    #[inline]
    pub fn full_text(&self) -> String {
        format!(
            "Title: {}\n\nAuthors: {}\nJournal: {} ({})\nPMID: {}\n\nAbstract:\n{}",
            self.title, self.authors, self.journal, self.year, self.pmid, self.abstract_text
        )
    }

    /// File name used when the article is saved into a project
    #[inline]
    pub fn file_name(&self) -> String {
        format!("PMID_{}.txt", self.pmid)
    }
}

impl PaginatedDocument for PubmedArticle {
    #[inline]
    fn document_id(&self) -> String {
        format!("PMID:{}", self.pmid)
    }

    #[inline]
    fn read_text(&self) -> Result<DocumentText> {
        Ok(DocumentText::Unpaged(self.full_text()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pmid,
    Title,
    AbstractText,
    ForeName,
    LastName,
    Journal,
    Year,
}

/// Text being collected for a field, closed when the element at `depth` ends
#[derive(Debug)]
struct Capture {
    field: Field,
    depth: usize,
    label: Option<String>,
    text: String,
}

#[derive(Debug, Default)]
struct ArticleBuilder {
    pmid: Option<String>,
    title: Option<String>,
    abstract_parts: Option<Vec<String>>,
    in_abstract: bool,
    authors: Vec<String>,
    author: Option<(Option<String>, Option<String>)>,
    journal: Option<String>,
    year: Option<String>,
}

impl ArticleBuilder {
    /// Decide whether an opening element starts a capture
    fn open(&mut self, name: &str, parent: Option<&str>, label: Option<String>, depth: usize) -> Option<Capture> {
        let field = match name {
            "PMID" if self.pmid.is_none() => Field::Pmid,
            "ArticleTitle" if self.title.is_none() => Field::Title,
            "Abstract" if self.abstract_parts.is_none() => {
                self.abstract_parts = Some(Vec::new());
                self.in_abstract = true;
                return None;
            }
            "AbstractText" if self.in_abstract => Field::AbstractText,
            "Author" => {
                self.author = Some((None, None));
                return None;
            }
            "ForeName" if parent == Some("Author") => Field::ForeName,
            "LastName" if parent == Some("Author") => Field::LastName,
            "Title" if parent == Some("Journal") && self.journal.is_none() => Field::Journal,
            "Year" if parent == Some("PubDate") && self.year.is_none() => Field::Year,
            _ => return None,
        };
        Some(Capture {
            field,
            depth,
            label,
            text: String::new(),
        })
    }

    fn close(&mut self, name: &str) {
        match name {
            "Abstract" => self.in_abstract = false,
            "Author" => {
                if let Some((Some(fore), Some(last))) = self.author.take() {
                    self.authors.push(format!("{} {}", fore, last));
                }
            }
            _ => {}
        }
    }

    fn store(&mut self, capture: Capture) {
        let Capture { field, label, text, .. } = capture;
        match field {
            Field::Pmid => self.pmid = Some(text),
            Field::Title => self.title = Some(text),
            Field::AbstractText => {
                let part = match label {
                    Some(label) if !label.is_empty() => format!("{}: {}", label, text),
                    _ => text,
                };
                if let Some(parts) = self.abstract_parts.as_mut() {
                    parts.push(part);
                }
            }
            Field::ForeName => {
                if let Some(author) = self.author.as_mut() {
                    author.0 = Some(text);
                }
            }
            Field::LastName => {
                if let Some(author) = self.author.as_mut() {
                    author.1 = Some(text);
                }
            }
            Field::Journal => self.journal = Some(text),
            Field::Year => self.year = Some(text),
        }
    }

    fn build(self) -> Option<PubmedArticle> {
        let pmid = self.pmid.filter(|id| !id.trim().is_empty())?;
        let authors = if self.authors.is_empty() {
            UNKNOWN_AUTHORS.to_string()
        } else {
            self.authors.join(", ")
        };
        Some(PubmedArticle {
            pmid: pmid.trim().to_string(),
            title: self.title.unwrap_or_else(|| NO_TITLE.to_string()),
            authors,
            journal: self.journal.unwrap_or_else(|| UNKNOWN_JOURNAL.to_string()),
            year: self.year.unwrap_or_else(|| UNKNOWN_YEAR.to_string()),
            abstract_text: self
                .abstract_parts
                .map_or_else(|| NO_ABSTRACT.to_string(), |parts| parts.join("\n\n")),
        })
    }
}

/// Tracks the element path and the article under construction
#[derive(Debug, Default)]
struct ArticleParser {
    path: Vec<String>,
    article: Option<ArticleBuilder>,
    capture: Option<Capture>,
    articles: Vec<PubmedArticle>,
    seen_element: bool,
}

impl ArticleParser {
    fn start(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        self.seen_element = true;

        if let Some(builder) = self.article.as_mut() {
            if self.capture.is_none() {
                let label = if name == "AbstractText" {
                    label_attribute(element)?
                } else {
                    None
                };
                let parent = self.path.last().map(String::as_str);
                self.capture = builder.open(&name, parent, label, self.path.len() + 1);
            }
        } else if name == "PubmedArticle" {
            self.article = Some(ArticleBuilder::default());
        }

        self.path.push(name);
        Ok(())
    }

    fn end(&mut self) {
        let depth = self.path.len();
        let Some(name) = self.path.pop() else {
            return;
        };

        let finished = self.capture.take_if(|c| c.depth == depth);
        if let (Some(capture), Some(builder)) = (finished, self.article.as_mut()) {
            builder.store(capture);
        }

        if name == "PubmedArticle" {
            if let Some(builder) = self.article.take() {
                match builder.build() {
                    Some(article) => {
                        debug!("Parsed PMID {}", article.pmid);
                        self.articles.push(article);
                    }
                    None => warn!("Skipping PubMed article without a PMID"),
                }
            }
        } else if let Some(builder) = self.article.as_mut() {
            builder.close(&name);
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(text);
        }
    }
}

fn label_attribute(element: &BytesStart<'_>) -> Result<Option<String>> {
    let attribute = element
        .try_get_attribute("Label")
        .map_err(|e| malformed(format!("bad attribute: {}", e)))?;
    attribute
        .map(|a| {
            a.unescape_value()
                .map(|value| value.into_owned())
                .map_err(|e| malformed(format!("bad attribute value: {}", e)))
        })
        .transpose()
}

fn malformed(message: String) -> RagError {
    RagError::Upstream(format!("Malformed PubMed XML: {}", message))
}

/// Parse every `PubmedArticle` in an efetch response
///
/// Missing fields fall back to placeholder text; articles without a PMID are skipped.
///
/// # Errors
/// Returns `RagError::Upstream` when the document is not well-formed XML
#[inline]
pub fn parse_articles(xml: &str) -> Result<Vec<PubmedArticle>> {
    let mut reader = Reader::from_str(xml);
    let mut parser = ArticleParser::default();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(malformed(format!(
                    "{} at byte {}",
                    e,
                    reader.buffer_position()
                )));
            }
        };

        match event {
            Event::Start(element) => parser.start(&element)?,
            Event::Empty(element) => {
                parser.start(&element)?;
                parser.end();
            }
            Event::End(_) => parser.end(),
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| malformed(format!("bad text: {}", e)))?;
                parser.text(&text);
            }
            Event::CData(data) => {
                parser.text(&String::from_utf8_lossy(&data.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !parser.seen_element {
        return Err(malformed("no root element".to_string()));
    }
    if let Some(open) = parser.path.last() {
        return Err(malformed(format!("unclosed element <{}>", open)));
    }

    Ok(parser.articles)
}
