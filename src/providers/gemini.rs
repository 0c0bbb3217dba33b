//! Gemini REST providers: embedding via `embedContent` /
//! `batchEmbedContents`, generation via `streamGenerateContent` (SSE).
//!
//! Timeouts live here, on the HTTP client; callers propagate provider
//! failures rather than masking them.

use std::io::BufRead;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::ScreenerConfig;
use crate::error::{Result, ScreenerError};
use crate::prompt::AssembledPrompt;
use crate::stream::AnswerStream;
use crate::types::{Embedder, Generator};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Known embedding models with their fixed output dimensionality.
#[derive(Debug, Clone, Copy)]
pub struct GeminiModelInfo {
    pub name: &'static str,
    pub dimension: usize,
}

pub const GEMINI_EMBED_MODELS: &[GeminiModelInfo] = &[
    GeminiModelInfo {
        name: "text-embedding-004",
        dimension: 768,
    },
    GeminiModelInfo {
        name: "gemini-embedding-001",
        dimension: 3072,
    },
];

#[must_use]
pub fn get_embed_model_info(name: &str) -> Option<&'static GeminiModelInfo> {
    GEMINI_EMBED_MODELS.iter().find(|info| info.name == name)
}

#[must_use]
pub fn default_embed_model_info() -> &'static GeminiModelInfo {
    &GEMINI_EMBED_MODELS[0]
}

/// Connection settings shared by both providers.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Build from the screener configuration; a missing API key surfaces here
    /// as a configuration error, before any request is made.
    pub fn from_screener(config: &ScreenerConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            api_key,
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            temperature: config.temperature,
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ScreenerError::Config {
            reason: format!("failed to build HTTP client: {err}"),
        })
}

#[derive(Debug, Deserialize)]
struct EmbedValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbedValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbedValues>,
}

/// Text embedding over the Gemini REST API.
pub struct GeminiEmbedder {
    client: reqwest::blocking::Client,
    config: GeminiConfig,
    dimension: usize,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let info = get_embed_model_info(&config.embedding_model).ok_or_else(|| {
            ScreenerError::Config {
                reason: format!("unknown embedding model {:?}", config.embedding_model),
            }
        })?;
        Ok(Self {
            client: build_client(config.timeout)?,
            dimension: info.dimension,
            config,
        })
    }

    pub fn from_screener(config: &ScreenerConfig) -> Result<Self> {
        Self::new(GeminiConfig::from_screener(config)?)
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.embedding_model
    }

    fn post(&self, url: &str, body: &Value) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|err| ScreenerError::EmbeddingService {
                reason: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ScreenerError::EmbeddingService {
                reason: format!("HTTP {} from embedding endpoint", response.status()),
            });
        }
        Ok(response)
    }

    fn check_dimension(&self, values: &[f32]) -> Result<()> {
        if values.len() != self.dimension {
            return Err(ScreenerError::EmbeddingService {
                reason: format!(
                    "model {} returned {} dimensions, expected {}",
                    self.config.embedding_model,
                    values.len(),
                    self.dimension
                ),
            });
        }
        Ok(())
    }
}

impl Embedder for GeminiEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{API_BASE}/models/{}:embedContent?key={}",
            self.config.embedding_model, self.config.api_key
        );
        let body = json!({
            "model": format!("models/{}", self.config.embedding_model),
            "content": { "parts": [{ "text": text }] },
        });
        let parsed: EmbedResponse =
            self.post(&url, &body)?
                .json()
                .map_err(|err| ScreenerError::EmbeddingService {
                    reason: format!("malformed embedding response: {err}"),
                })?;
        self.check_dimension(&parsed.embedding.values)?;
        Ok(parsed.embedding.values)
    }

    fn embed_chunks(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{API_BASE}/models/{}:batchEmbedContents?key={}",
            self.config.embedding_model, self.config.api_key
        );
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.config.embedding_model),
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();
        let parsed: BatchEmbedResponse = self
            .post(&url, &json!({ "requests": requests }))?
            .json()
            .map_err(|err| ScreenerError::EmbeddingService {
                reason: format!("malformed batch embedding response: {err}"),
            })?;
        if parsed.embeddings.len() != texts.len() {
            return Err(ScreenerError::EmbeddingService {
                reason: format!(
                    "batch returned {} embeddings for {} inputs",
                    parsed.embeddings.len(),
                    texts.len()
                ),
            });
        }
        let mut out = Vec::with_capacity(parsed.embeddings.len());
        for embedding in parsed.embeddings {
            self.check_dimension(&embedding.values)?;
            out.push(embedding.values);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Streaming generation over the Gemini REST API.
pub struct GeminiGenerator {
    client: reqwest::blocking::Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }

    pub fn from_screener(config: &ScreenerConfig) -> Result<Self> {
        Self::new(GeminiConfig::from_screener(config)?)
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.generation_model
    }
}

impl Generator for GeminiGenerator {
    fn stream(&self, prompt: &AssembledPrompt) -> Result<AnswerStream> {
        let url = format!(
            "{API_BASE}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.config.generation_model, self.config.api_key
        );
        let body = json!({
            "system_instruction": { "parts": [{ "text": prompt.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
            "generationConfig": { "temperature": self.config.temperature },
        });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|err| ScreenerError::GenerationService {
                reason: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ScreenerError::GenerationService {
                reason: format!("HTTP {} from generation endpoint", response.status()),
            });
        }
        Ok(AnswerStream::from_events(SseEvents::new(
            std::io::BufReader::new(response),
        )))
    }
}

/// Line-delimited SSE event reader: each `data:` line is one event whose
/// payload carries a list of sub-fragments (the candidate's content parts).
struct SseEvents<R: BufRead> {
    lines: std::io::Lines<R>,
}

impl<R: BufRead> SseEvents<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead + Send> Iterator for SseEvents<R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    return Some(Err(ScreenerError::GenerationService {
                        reason: format!("stream transport failure: {err}"),
                    }));
                }
            };
            let Some(payload) = line.strip_prefix("data:") else {
                // Comments, event names, and keep-alive blank lines.
                continue;
            };
            let payload = payload.trim();
            if payload.is_empty() || payload == "[DONE]" {
                continue;
            }
            return Some(parse_sse_payload(payload));
        }
    }
}

/// Extract the text parts of the first candidate. A payload without parts
/// (e.g. a finish-reason-only event) yields an empty list, which the stream
/// suppresses.
fn parse_sse_payload(payload: &str) -> Result<Vec<String>> {
    let value: Value =
        serde_json::from_str(payload).map_err(|err| ScreenerError::GenerationService {
            reason: format!("malformed stream event: {err}"),
        })?;
    let parts = value
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(parts)
}
