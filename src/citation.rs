//! Citation provenance: map retrieved chunks back to a legal reference, a
//! page anchor, and an excerpt.
//!
//! The reference lookup is a heuristic, not a parser: the first
//! `Article <n>` / `Annex <roman>` token in the chunk wins, which can
//! mislabel chunks quoting several provisions. Everything here is pure.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Chunk, Citation, RetrievalHit};

/// Label used when a chunk contains no recognizable reference token.
pub const FALLBACK_LABEL: &str = "Legal Text";

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
static LEGAL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(Article\s+\d+|Annex\s+[IVX]+)").unwrap());

/// First legal-reference token in `text`, or the generic fallback.
#[must_use]
pub fn extract_legal_ref(text: &str) -> &str {
    LEGAL_REF
        .find(text)
        .map_or(FALLBACK_LABEL, |m| m.as_str())
}

/// Human page number for a chunk: stored zero-based page + 1, defaulting to
/// page 1 when the metadata is absent.
#[must_use]
pub fn display_page(chunk: &Chunk) -> u32 {
    chunk.source_page.map_or(1, |page| page + 1)
}

/// Derive the citation for one retrieval hit. `index` is one-based, in
/// retrieval order; `viewer_base_url` gains a `#page={n}` anchor.
#[must_use]
pub fn cite(index: usize, chunk: &Chunk, viewer_base_url: &str) -> Citation {
    let reference = extract_legal_ref(&chunk.text);
    let page = display_page(chunk);
    Citation {
        index,
        label: format!("Source {index}: {reference} (Page {page})"),
        page,
        link: format!("{viewer_base_url}#page={page}"),
        excerpt: chunk.text.clone(),
    }
}

/// One citation per hit, in retrieval order.
#[must_use]
pub fn build_citations(hits: &[RetrievalHit], viewer_base_url: &str) -> Vec<Citation> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| cite(i + 1, &hit.chunk, viewer_base_url))
        .collect()
}
