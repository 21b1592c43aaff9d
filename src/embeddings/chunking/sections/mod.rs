
use std::ops::Range;
use std::sync::LazyLock;

use fancy_regex::Regex;
use tracing::debug;

// Optional enumeration ("1.", "2.1", "3"), then a capitalized run of letters and
// spaces ending in a letter. The line must hold nothing else.
static HEADING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?:\d+(?:\.\d+)*\.?[ \t]*)?([A-Z][A-Za-z \t]*[A-Za-z])$")
        .expect("heading regex is valid")
});

/// A heading-delimited region of a page-tagged text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading text, trimmed
    pub title: String,
    /// Byte span from the heading line start to the next heading (or end of text)
    pub span: Range<usize>,
}

/// Split text into sections at heading-like lines
///
/// A line is a heading when it matches the heading pattern and is followed by a
/// blank line or by the end of the text. Text before the first heading belongs to
/// no section. An empty result means no headings were found.
#[inline]
pub fn split_into_sections(text: &str) -> Vec<Section> {
    let lines = line_offsets(text);

    let mut starts: Vec<(usize, String)> = Vec::new();
    for (index, (offset, line)) in lines.iter().enumerate() {
        let followed_by_gap = lines
            .get(index + 1)
            .is_none_or(|(_, next)| next.trim().is_empty());
        if !followed_by_gap {
            continue;
        }

        if let Some(title) = heading_title(line) {
            starts.push((*offset, title));
        }
    }

    let sections: Vec<Section> = starts
        .iter()
        .enumerate()
        .map(|(i, (start, title))| {
            let end = starts.get(i + 1).map_or(text.len(), |(next, _)| *next);
            Section {
                title: title.clone(),
                span: *start..end,
            }
        })
        .collect();

    debug!("Detected {} section headings", sections.len());
    sections
}

/// Extract the heading title from a single line, if it looks like one
fn heading_title(line: &str) -> Option<String> {
    let captures = HEADING_REGEX.captures(line.trim_end()).ok()??;
    let title = captures.get(1)?.as_str().trim();
    Some(title.to_string())
}

/// Each line's starting byte offset and its content without the line terminator
fn line_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|raw| {
            let start = offset;
            offset += raw.len();
            (start, raw.trim_end_matches(['\n', '\r']))
        })
        .collect()
}
