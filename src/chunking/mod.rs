
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;
use crate::pdf::PageText;

/// A chunk of extracted document text, ready for embedding. Segments are
/// literal substrings of a page's text: consecutive segments from the same
/// page share an overlap region, and stripping each segment's overlap prefix
/// then concatenating reproduces the page text exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// The segment text.
    pub text: String,
    /// Source document filename.
    pub source: String,
    /// 1-based page number the segment came from. Segments never span pages.
    pub page: u32,
    /// Document-wide ordinal of this segment.
    pub index: usize,
    /// Character (not byte) count of `text`.
    pub char_count: usize,
}

/// Configuration for document chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum segment size in characters.
    pub chunk_size: usize,
    /// Characters of overlap between consecutive segments of a page.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 400,
        }
    }
}

/// Splits extracted pages into overlapping segments stamped with the source
/// filename. Whitespace-only pages yield no segments.
#[inline]
pub fn chunk_pages(
    pages: &[PageText],
    source: &str,
    config: &ChunkingConfig,
) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut index = 0;

    for page in pages {
        if page.text.trim().is_empty() {
            continue;
        }

        for range in split_ranges(&page.text, config) {
            let text = &page.text[range];
            segments.push(Segment {
                text: text.to_string(),
                source: source.to_string(),
                page: page.number,
                index,
                char_count: text.chars().count(),
            });
            index += 1;
        }
    }

    let avg_chars = segments.iter().map(|s| s.char_count).sum::<usize>() / segments.len().max(1);
    debug!(
        source,
        segment_count = segments.len(),
        avg_chars,
        "Chunked document"
    );

    Ok(segments)
}

/// Computes segment byte ranges over `text`. Each range covers at most
/// `chunk_size` characters; consecutive ranges overlap by roughly
/// `chunk_overlap` characters, trimmed back to a word start. Split points
/// prefer, in order: paragraph break, line break, sentence end, word
/// boundary, hard cut. Breaks are only taken in the second half of the
/// window so segments stay near the target size.
fn split_ranges(text: &str, config: &ChunkingConfig) -> Vec<Range<usize>> {
    if text.chars().count() <= config.chunk_size {
        return vec![0..text.len()];
    }

    let mut ranges = Vec::new();
    let mut start = 0usize;

    loop {
        let window_end = advance_chars(text, start, config.chunk_size);
        if window_end >= text.len() {
            ranges.push(start..text.len());
            break;
        }

        let floor = advance_chars(text, start, config.chunk_size / 2);
        let end = find_break(text, floor, window_end);
        ranges.push(start..end);

        let overlap_start = retreat_chars(text, end, config.chunk_overlap);
        let mut next_start = snap_to_word_start(text, overlap_start, end);
        if next_start <= start {
            // Degenerate overlap configuration; abandon the overlap so the
            // split still advances.
            next_start = end;
        }
        start = next_start;
    }

    ranges
}

/// Picks the best split point in `[floor, limit)`, returning the byte offset
/// just past the chosen separator so it stays with the left segment.
fn find_break(text: &str, floor: usize, limit: usize) -> usize {
    let window = &text[floor..limit];

    if let Some(pos) = window.rfind("\n\n") {
        return floor + pos + 2;
    }

    if let Some(pos) = window.rfind('\n') {
        return floor + pos + 1;
    }

    let sentence_end = [". ", "! ", "? "]
        .iter()
        .filter_map(|sep| window.rfind(sep).map(|pos| pos + sep.len()))
        .max();
    if let Some(pos) = sentence_end {
        return floor + pos;
    }

    if let Some(pos) = window.rfind(' ') {
        return floor + pos + 1;
    }

    limit
}

/// Byte offset `n` characters after `from`, clamped to the end of `text`.
fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(offset, _)| from + offset)
}

/// Byte offset `n` characters before `from`, clamped to the start of `text`.
fn retreat_chars(text: &str, from: usize, n: usize) -> usize {
    let mut pos = from;
    for _ in 0..n {
        if pos == 0 {
            break;
        }
        pos -= 1;
        while pos > 0 && !text.is_char_boundary(pos) {
            pos -= 1;
        }
    }
    pos
}

/// Moves `pos` forward to the next word start (bounded by `limit`) so an
/// overlap region never begins mid-word. Returns `pos` unchanged when it
/// already sits at a word start or no boundary exists before `limit`.
fn snap_to_word_start(text: &str, pos: usize, limit: usize) -> usize {
    if pos == 0 {
        return 0;
    }

    let at_word_start = text[..pos]
        .chars()
        .next_back()
        .is_none_or(char::is_whitespace);
    if at_word_start {
        return pos;
    }

    let rest = &text[pos..limit];
    match rest.find(char::is_whitespace) {
        Some(ws) => rest[ws..]
            .find(|c: char| !c.is_whitespace())
            .map_or(limit, |r| pos + ws + r),
        None => pos,
    }
}
