//! Pages, chunks, and persisted records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One page of a loaded source document. `number` is zero-based; the
/// user-facing page number is `number + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    pub number: u32,
}

impl Page {
    #[must_use]
    pub fn new(text: impl Into<String>, number: u32) -> Self {
        Self {
            text: text.into(),
            number,
        }
    }
}

/// An ordered sequence of pages produced by a reader. Immutable after load.
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name, usually the source file stem.
    pub title: Option<String>,
    /// Where the document came from, for diagnostics.
    pub source: String,
    pub pages: Vec<Page>,
}

impl Document {
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when no page carries any text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.trim().is_empty())
    }
}

/// A bounded text segment derived from the source document; the unit of
/// embedding and retrieval. Created only during ingestion, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Zero-based page index of the chunk's first character. A chunk spanning
    /// pages keeps the page it starts on. `None` when the reader could not
    /// attribute a page; display logic then defaults to page 1.
    ///
    /// No serde skip attributes here: records are persisted with a positional,
    /// non-self-describing codec, so every field must always be present on the
    /// wire.
    pub source_page: Option<u32>,
    /// Opaque, extensible metadata carried alongside the chunk.
    pub extra_metadata: BTreeMap<String, String>,
}

impl Chunk {
    #[must_use]
    pub fn new(text: impl Into<String>, source_page: Option<u32>) -> Self {
        Self {
            text: text.into(),
            source_page,
            extra_metadata: BTreeMap::new(),
        }
    }
}

/// The persisted (chunk, embedding) tuple stored by the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// One entry of a retrieval result. Ephemeral, nearest first; `rank` is the
/// zero-based position within the result.
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub rank: usize,
    pub score: f32,
    pub chunk: Chunk,
}
