
use std::collections::VecDeque;
use std::ops::Range;

use tracing::debug;

use super::ChunkingConfig;

/// A contiguous run of text that is never split further during merging
#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    range: Range<usize>,
    chars: usize,
}

/// Split text into overlapping windows of at most `chunk_size` characters
///
/// Returns byte spans into `text`. Consecutive spans overlap by at most
/// `chunk_overlap` characters and together cover the whole input.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<Range<usize>> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    collect_pieces(
        text,
        0..text.len(),
        &config.separators,
        config.chunk_size,
        &mut pieces,
    );

    let windows = merge_pieces(&pieces, config.chunk_size, config.chunk_overlap);
    debug!(
        "Split {} bytes into {} pieces and {} windows",
        text.len(),
        pieces.len(),
        windows.len()
    );
    windows
}

/// Break `range` on the coarsest separator present, recursing into oversized parts
#[expect(clippy::string_slice, reason = "ranges always fall on char boundaries")]
fn collect_pieces(
    text: &str,
    range: Range<usize>,
    separators: &[String],
    chunk_size: usize,
    pieces: &mut Vec<Piece>,
) {
    let slice = &text[range.clone()];
    let Some(position) = separators
        .iter()
        .position(|sep| sep.is_empty() || slice.contains(sep.as_str()))
    else {
        // Nothing left to split on: emit as one indivisible piece
        pieces.push(Piece {
            chars: slice.chars().count(),
            range,
        });
        return;
    };

    let separator = &separators[position];
    let finer = &separators[position + 1..];

    for local in split_keeping_separator(slice, separator) {
        let absolute = range.start + local.start..range.start + local.end;
        let chars = text[absolute.clone()].chars().count();
        if chars <= chunk_size || separator.is_empty() {
            pieces.push(Piece {
                range: absolute,
                chars,
            });
        } else {
            collect_pieces(text, absolute, finer, chunk_size, pieces);
        }
    }
}

/// Split on `separator`, attaching each separator to the end of the piece before it
///
/// An empty separator splits into single characters.
fn split_keeping_separator(slice: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return slice
            .char_indices()
            .map(|(i, c)| i..i + c.len_utf8())
            .collect();
    }

    let mut ranges = Vec::new();
    let mut start = 0;
    for (index, matched) in slice.match_indices(separator) {
        let end = index + matched.len();
        ranges.push(start..end);
        start = end;
    }
    if start < slice.len() {
        ranges.push(start..slice.len());
    }
    ranges
}

/// Merge consecutive pieces into windows, carrying a tail of the previous window
fn merge_pieces(pieces: &[Piece], chunk_size: usize, overlap: usize) -> Vec<Range<usize>> {
    let mut windows = Vec::new();
    let mut current: VecDeque<&Piece> = VecDeque::new();
    let mut total = 0;

    for piece in pieces {
        if total + piece.chars > chunk_size && !current.is_empty() {
            if let Some(window) = span_of(&current) {
                windows.push(window);
            }

            while total > overlap || (total + piece.chars > chunk_size && total > 0) {
                let Some(dropped) = current.pop_front() else {
                    break;
                };
                total -= dropped.chars;
            }
        }

        current.push_back(piece);
        total += piece.chars;
    }

    if let Some(window) = span_of(&current) {
        windows.push(window);
    }

    windows
}

fn span_of(pieces: &VecDeque<&Piece>) -> Option<Range<usize>> {
    let first = pieces.front()?;
    let last = pieces.back()?;
    Some(first.range.start..last.range.end)
}
