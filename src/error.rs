//! Error taxonomy for the screener core.
//!
//! Configuration problems halt a pipeline before any work begins; transient
//! service failures are recovered per-chunk during ingestion and surfaced
//! per-request at query time; an unreadable store is reported as "not ready".

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScreenerError>;

#[derive(Debug, Error)]
pub enum ScreenerError {
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("missing API key: set `api_key` in the screener configuration")]
    MissingApiKey,

    #[error("source document not found at {}", .path.display())]
    SourceMissing { path: PathBuf },

    #[error("no reader supports source document {}", .path.display())]
    UnsupportedSource { path: PathBuf },

    #[error("failed to read source document {}: {reason}", .path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("vector store at {} is not ready: {reason}", .path.display())]
    IndexUnavailable { path: PathBuf, reason: String },

    #[error("embedding dimension mismatch: store holds {expected}, embedder produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding service failure: {reason}")]
    EmbeddingService { reason: String },

    #[error("generation service failure: {reason}")]
    GenerationService { reason: String },

    #[error("vector store codec failure: {reason}")]
    StoreCodec { reason: String },

    #[error("vector store was opened read-only")]
    StoreReadOnly,

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

impl ScreenerError {
    /// True for failures that may succeed on a later attempt. The ingestion
    /// pipeline backs off and continues on these instead of aborting the run.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingService { .. } | Self::GenerationService { .. }
        )
    }
}
