//! Ask request/response types, the risk classification contract, and the
//! provider capability traits.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::prompt::AssembledPrompt;
use crate::stream::AnswerStream;
use crate::types::DEFAULT_RETRIEVAL_K;

/// Request payload for retrieval + synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub top_k: usize,
}

impl AskRequest {
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: DEFAULT_RETRIEVAL_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Timings for one ask round-trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskStats {
    /// Time spent embedding the question and searching the store, in ms.
    pub retrieval_ms: u128,
    /// Time spent draining the answer stream, in ms. Zero while the stream is
    /// still unconsumed.
    pub synthesis_ms: u128,
    /// End-to-end latency in ms.
    pub latency_ms: u128,
}

/// A derived reference tracing a retrieved chunk back to its source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// One-based ordinal, in retrieval order.
    pub index: usize,
    /// Display label, e.g. `Source 2: Article 6 (Page 24)`.
    pub label: String,
    /// One-based page number shown to the user.
    pub page: u32,
    /// Deep link into the source document viewer, anchored at `page`.
    pub link: String,
    /// Raw chunk text for inline display.
    pub excerpt: String,
}

/// The closed set of risk buckets the generator must open its answer with,
/// most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Prohibited,
    HighRisk,
    LimitedRisk,
    MinimalUnclear,
}

impl RiskLevel {
    /// The spelling used in the answer contract's first line.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Prohibited => "Prohibited",
            Self::HighRisk => "High Risk",
            Self::LimitedRisk => "Limited Risk",
            Self::MinimalUnclear => "Minimal/Unclear",
        }
    }

    /// Parse the classification from the first line of a generated answer.
    ///
    /// The contract is `Risk level (not legal advice): <bucket>`; matching is
    /// case-insensitive and tolerates surrounding markdown. Returns `None`
    /// when the model ignored the contract (e.g. off-topic refusals).
    #[must_use]
    pub fn parse_leading(answer: &str) -> Option<Self> {
        let first_line = answer.trim_start().lines().next()?;
        let lowered = first_line.to_ascii_lowercase();
        if !lowered.contains("risk level") {
            return None;
        }
        let tail = lowered.split(':').nth(1)?;
        if tail.contains("prohibited") {
            Some(Self::Prohibited)
        } else if tail.contains("high risk") {
            Some(Self::HighRisk)
        } else if tail.contains("limited risk") {
            Some(Self::LimitedRisk)
        } else if tail.contains("minimal") || tail.contains("unclear") {
            Some(Self::MinimalUnclear)
        } else {
            None
        }
    }
}

/// A fully drained answer with its classification and provenance.
#[derive(Debug, Clone)]
pub struct ScreenedAnswer {
    pub risk: Option<RiskLevel>,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub stats: AskStats,
}

/// Text-to-vector capability. Both pipelines must use the same configuration
/// so ingest-time and query-time embeddings live in one space.
pub trait Embedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch form used during ingestion. The default embeds one at a time,
    /// which matches the rate-limited serialized ingestion loop.
    fn embed_chunks(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_query(text)?);
        }
        Ok(embeddings)
    }

    /// Fixed output dimensionality of this embedder configuration.
    fn dimension(&self) -> usize;
}

/// Prompt-to-token-stream capability.
pub trait Generator {
    /// Start a generation call; fragments arrive lazily through the returned
    /// stream. Dropping the stream abandons the call.
    fn stream(&self, prompt: &AssembledPrompt) -> Result<AnswerStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_contract_first_line() {
        let answer = "Risk level (not legal advice): High Risk\n\nReasoning...";
        assert_eq!(RiskLevel::parse_leading(answer), Some(RiskLevel::HighRisk));
    }

    #[test]
    fn parsing_is_case_insensitive_and_tolerates_markdown() {
        let answer = "**risk level (not legal advice): Minimal/Unclear**\nmore";
        assert_eq!(
            RiskLevel::parse_leading(answer),
            Some(RiskLevel::MinimalUnclear)
        );
    }

    #[test]
    fn off_contract_answers_yield_none() {
        assert_eq!(RiskLevel::parse_leading(""), None);
        assert_eq!(
            RiskLevel::parse_leading("This tool only assesses AI systems under the EU AI Act."),
            None
        );
    }

    #[test]
    fn buckets_order_most_severe_first() {
        assert!(RiskLevel::Prohibited < RiskLevel::HighRisk);
        assert!(RiskLevel::HighRisk < RiskLevel::LimitedRisk);
        assert!(RiskLevel::LimitedRisk < RiskLevel::MinimalUnclear);
    }
}
