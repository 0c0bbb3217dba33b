//! Shared data model for the screener core.

mod ask;
mod chunk;

pub use ask::{AskRequest, AskStats, Citation, Embedder, Generator, RiskLevel, ScreenedAnswer};
pub use chunk::{Chunk, Document, IndexedRecord, Page, RetrievalHit};

/// Default number of records retrieved per query.
pub const DEFAULT_RETRIEVAL_K: usize = 5;
