#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args,
        clippy::cast_possible_truncation,
        clippy::float_cmp,
        clippy::cast_precision_loss
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Documentation lints: internal/self-documenting functions don't need
// extensive docs. Public APIs should still carry proper documentation.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Cast safety: casts here are bounded by real-world constraints (page
// counts, chunk sizes, record counts).
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
//
// Style/complexity trade-offs:
#![allow(clippy::too_many_lines)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::map_unwrap_or)]
//
// Many functions use Result for consistency even when they currently can't
// fail, so error conditions can be added without breaking the API.
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::unused_self)]

//! Retrieval-augmented risk screening for the EU AI Act.
//!
//! The crate splits into an offline ingestion pipeline (read a source
//! document, chunk it, embed the chunks, persist them in a durable vector
//! index) and an online query session (embed a question, retrieve the
//! nearest chunks, assemble a grounded prompt, stream a risk-classified
//! answer with citations back to its source pages).

/// The screener-core crate version (matches `Cargo.toml`).
pub const SCREENER_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod chunker;
pub mod citation;
pub mod config;
pub mod error;
pub mod ingest;
pub mod prompt;
pub mod providers;
pub mod reader;
pub mod retrieve;
pub mod session;
pub mod store;
pub mod stream;
pub mod types;

pub use chunker::RecursiveChunker;
pub use citation::{FALLBACK_LABEL, build_citations, cite, display_page, extract_legal_ref};
pub use config::ScreenerConfig;
pub use error::{Result, ScreenerError};
pub use ingest::{ChunkOutcome, ChunkReport, IngestPipeline, IngestReport, RetryPolicy};
pub use prompt::{AssembledPrompt, CONTEXT_SEPARATOR, assemble, build_context};
pub use providers::{
    GEMINI_EMBED_MODELS, GeminiConfig, GeminiEmbedder, GeminiGenerator, GeminiModelInfo,
    default_embed_model_info, get_embed_model_info,
};
pub use reader::{DocumentReader, PassthroughReader, PdfReader, ReaderRegistry};
pub use retrieve::Retriever;
pub use session::{AskResponse, Session};
pub use store::VectorStore;
pub use stream::AnswerStream;
pub use types::{
    AskRequest, AskStats, Chunk, Citation, DEFAULT_RETRIEVAL_K, Document, Embedder, Generator,
    IndexedRecord, Page, RetrievalHit, RiskLevel, ScreenedAnswer,
};
