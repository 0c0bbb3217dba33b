//! Recursive character chunking of loaded documents.
//!
//! Splitting prefers larger semantic boundaries first (paragraph break, then
//! line break, then word boundary, then raw characters), recursing to finer
//! separators only for pieces that still exceed the size bound. Separators
//! stay attached to the preceding piece, so concatenating the produced base
//! pieces reproduces the page text byte for byte.

use crate::config::ScreenerConfig;
use crate::types::{Chunk, Document};

/// Boundary cascade, coarse to fine. Raw character windows are the implicit
/// last resort.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Splits a document's pages into overlapping chunks suitable for embedding.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    max_chars: usize,
    overlap: usize,
}

impl RecursiveChunker {
    /// `overlap` must be smaller than `max_chars`; `ScreenerConfig::validate`
    /// enforces this for configured values.
    #[must_use]
    pub fn new(max_chars: usize, overlap: usize) -> Self {
        debug_assert!(overlap < max_chars);
        Self { max_chars, overlap }
    }

    #[must_use]
    pub fn from_config(config: &ScreenerConfig) -> Self {
        Self::new(config.chunk_max_chars, config.chunk_overlap)
    }

    /// Chunk every page of `document`, in page order. Empty pages contribute
    /// zero chunks; no produced chunk is empty. Each chunk records the page
    /// its first character came from.
    #[must_use]
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in &document.pages {
            self.chunk_page(&page.text, Some(page.number), &mut chunks);
        }
        tracing::debug!(
            pages = document.page_count(),
            chunks = chunks.len(),
            "chunked document"
        );
        chunks
    }

    /// Chunk a single body of text with no page attribution.
    #[must_use]
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        self.chunk_page(text, None, &mut chunks);
        chunks
    }

    fn chunk_page(&self, text: &str, source_page: Option<u32>, chunks: &mut Vec<Chunk>) {
        if text.is_empty() {
            return;
        }

        // Base pieces are bounded so that the overlap prefix never pushes a
        // chunk past `max_chars`, and concatenated they reproduce `text`.
        let base_limit = self.max_chars.saturating_sub(self.overlap).max(1);
        let mut pieces = Vec::new();
        split_recursive(text, base_limit, 0, &mut pieces);

        for (i, piece) in pieces.iter().enumerate() {
            let mut body = String::with_capacity(piece.len() + self.overlap);
            if i > 0 && self.overlap > 0 {
                body.push_str(&tail_chars(&pieces[i - 1], self.overlap));
            }
            body.push_str(piece);
            chunks.push(Chunk::new(body, source_page));
        }
    }
}

/// Greedily regroup `text` into pieces of at most `limit` characters, trying
/// the separator at `sep_idx` and recursing to finer separators for any part
/// that alone exceeds the limit.
fn split_recursive(text: &str, limit: usize, sep_idx: usize, out: &mut Vec<String>) {
    if text.is_empty() {
        return;
    }
    if text.chars().count() <= limit {
        out.push(text.to_string());
        return;
    }
    let Some(separator) = SEPARATORS.get(sep_idx) else {
        split_char_windows(text, limit, out);
        return;
    };
    if !text.contains(separator) {
        split_recursive(text, limit, sep_idx + 1, out);
        return;
    }

    let mut current = String::new();
    let mut current_chars = 0usize;
    for part in text.split_inclusive(separator) {
        let part_chars = part.chars().count();
        if part_chars > limit {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            split_recursive(part, limit, sep_idx + 1, out);
            continue;
        }
        if current_chars + part_chars > limit && !current.is_empty() {
            out.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push_str(part);
        current_chars += part_chars;
    }
    if !current.is_empty() {
        out.push(current);
    }
}

/// Last resort: fixed character windows, always at char boundaries.
fn split_char_windows(text: &str, limit: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut count = 0usize;
    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == limit {
            out.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
}

/// Up to `overlap` trailing characters of `text`, at a char boundary.
fn tail_chars(text: &str, overlap: usize) -> String {
    let total = text.chars().count();
    text.chars().skip(total.saturating_sub(overlap)).collect()
}
