//! Screener configuration.
//!
//! One explicit struct validated at startup. Every tunable the pipelines read
//! lives here; nothing is pulled from the environment at run time.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScreenerError};

/// Configuration for both the ingestion and the query pipeline.
///
/// Defaults mirror the deployed screener: 4000/500 chunking, k = 5 retrieval,
/// 2 s pacing between embedding calls and a 60 s back-off after a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Embedding model identifier, e.g. `text-embedding-004`.
    pub embedding_model: String,
    /// Generation model identifier, e.g. `gemini-2.5-flash-lite`.
    pub generation_model: String,
    /// Sampling temperature for generation.
    pub temperature: f32,
    /// Directory holding the persisted vector store.
    pub index_path: PathBuf,
    /// Upper bound on chunk length, in characters.
    pub chunk_max_chars: usize,
    /// Overlap between consecutive chunks, in characters.
    pub chunk_overlap: usize,
    /// Number of records retrieved per query.
    pub retrieval_k: usize,
    /// Pause between successful per-chunk embedding calls.
    pub pacing_delay: Duration,
    /// Pause after a failed embedding call before continuing.
    pub error_backoff: Duration,
    /// Source document ingested into the store.
    pub source_path: PathBuf,
    /// Base URL of the external document viewer; citations append `#page={n}`.
    pub viewer_base_url: String,
    /// API key for the model provider. `None` is a configuration error at
    /// provider construction, not before.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            embedding_model: "text-embedding-004".to_string(),
            generation_model: "gemini-2.5-flash-lite".to_string(),
            temperature: 0.3,
            index_path: PathBuf::from("./screener_index"),
            chunk_max_chars: 4000,
            chunk_overlap: 500,
            retrieval_k: 5,
            pacing_delay: Duration::from_secs(2),
            error_backoff: Duration::from_secs(60),
            source_path: PathBuf::from("data/eu_ai_act.pdf"),
            viewer_base_url:
                "https://eur-lex.europa.eu/legal-content/EN/TXT/PDF/?uri=OJ:L_202401689"
                    .to_string(),
            api_key: None,
        }
    }
}

impl ScreenerConfig {
    /// Validate the configuration before any pipeline runs.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_model.trim().is_empty() {
            return Err(ScreenerError::Config {
                reason: "embedding_model must not be empty".into(),
            });
        }
        if self.generation_model.trim().is_empty() {
            return Err(ScreenerError::Config {
                reason: "generation_model must not be empty".into(),
            });
        }
        if self.chunk_max_chars == 0 {
            return Err(ScreenerError::Config {
                reason: "chunk_max_chars must be non-zero".into(),
            });
        }
        if self.chunk_overlap >= self.chunk_max_chars {
            return Err(ScreenerError::Config {
                reason: format!(
                    "chunk_overlap ({}) must be smaller than chunk_max_chars ({})",
                    self.chunk_overlap, self.chunk_max_chars
                ),
            });
        }
        if self.retrieval_k == 0 {
            return Err(ScreenerError::Config {
                reason: "retrieval_k must be at least 1".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ScreenerError::Config {
                reason: format!("temperature {} out of range 0.0..=2.0", self.temperature),
            });
        }
        Ok(())
    }

    /// API key, or the configuration error the providers surface.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ScreenerError::MissingApiKey)
    }
}
