//! Query-side session: one open read-only index plus the providers needed to
//! answer questions against it.
//!
//! Sessions are self-contained. Several can coexist over different indexes or
//! provider configurations, and a failed ask leaves the session usable.

use std::time::Instant;

use crate::citation;
use crate::config::ScreenerConfig;
use crate::error::Result;
use crate::prompt;
use crate::retrieve::Retriever;
use crate::stream::AnswerStream;
use crate::store::VectorStore;
use crate::types::{
    AskRequest, AskStats, Citation, Embedder, Generator, RetrievalHit, RiskLevel, ScreenedAnswer,
};

/// An in-flight answer: retrieval is done, synthesis is lazy.
///
/// Citations are available immediately since they derive from the retrieved
/// chunks, not from the generated text. Drain `answer` (or drop it to abandon
/// the generation call) and stamp `stats` yourself, or use
/// [`Session::ask_collected`] to get a fully drained [`ScreenedAnswer`].
#[derive(Debug)]
pub struct AskResponse {
    pub question: String,
    pub hits: Vec<RetrievalHit>,
    pub citations: Vec<Citation>,
    pub answer: AnswerStream,
    pub stats: AskStats,
}

/// A query session over a previously built index.
pub struct Session<E, G> {
    config: ScreenerConfig,
    store: VectorStore,
    embedder: E,
    generator: G,
}

impl<E: Embedder, G: Generator> Session<E, G> {
    /// Open the configured index read-only and bind the providers to it.
    ///
    /// Fails with `IndexUnavailable` when the index directory does not exist
    /// or holds no metadata, i.e. ingestion has not run yet.
    pub fn open(config: ScreenerConfig, embedder: E, generator: G) -> Result<Self> {
        config.validate()?;
        let store = VectorStore::open_read_only(&config.index_path)?;
        tracing::info!(
            path = %store.path().display(),
            records = store.len(),
            "session opened"
        );
        Ok(Self {
            config,
            store,
            embedder,
            generator,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Number of indexed records visible to this session.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.store.len()
    }

    /// Retrieve, assemble the grounded prompt, and start generation.
    ///
    /// Retrieval and the request to the generator happen eagerly; the answer
    /// text itself arrives through the returned stream. `stats.retrieval_ms`
    /// is stamped here, the synthesis timings stay zero until the caller
    /// drains the stream.
    pub fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        let started = Instant::now();
        let retriever = Retriever::new(&self.store, &self.embedder);
        let hits = retriever.retrieve(&request.question, request.top_k)?;
        let retrieval_ms = started.elapsed().as_millis();

        let citations = citation::build_citations(&hits, &self.config.viewer_base_url);
        let assembled = prompt::assemble(&request.question, &hits);
        let answer = self.generator.stream(&assembled)?;

        Ok(AskResponse {
            question: request.question.clone(),
            hits,
            citations,
            answer,
            stats: AskStats {
                retrieval_ms,
                synthesis_ms: 0,
                latency_ms: retrieval_ms,
            },
        })
    }

    /// [`Session::ask`] with the configured retrieval depth.
    pub fn ask_text(&self, question: &str) -> Result<AskResponse> {
        let request = AskRequest::new(question).with_top_k(self.config.retrieval_k);
        self.ask(&request)
    }

    /// [`Session::ask`], then drain the stream and classify the result.
    pub fn ask_collected(&self, request: &AskRequest) -> Result<ScreenedAnswer> {
        let started = Instant::now();
        let response = self.ask(request)?;

        let synthesis_started = Instant::now();
        let answer = response.answer.collect_answer()?;
        let synthesis_ms = synthesis_started.elapsed().as_millis();

        let risk = RiskLevel::parse_leading(&answer);
        if risk.is_none() {
            tracing::debug!("answer did not open with a risk classification");
        }

        Ok(ScreenedAnswer {
            risk,
            answer,
            citations: response.citations,
            stats: AskStats {
                retrieval_ms: response.stats.retrieval_ms,
                synthesis_ms,
                latency_ms: started.elapsed().as_millis(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScreenerError;
    use crate::prompt::AssembledPrompt;
    use crate::types::Chunk;

    struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            let lowered = text.to_ascii_lowercase();
            let axis = |word: &str| {
                if lowered.contains(word) { 1.0f32 } else { 0.0 }
            };
            Ok(vec![axis("biometric"), axis("chatbot")])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    /// Replays a scripted answer and records the prompt it was given.
    struct ScriptedGenerator {
        answer: &'static str,
    }

    impl Generator for ScriptedGenerator {
        fn stream(&self, prompt: &AssembledPrompt) -> Result<AnswerStream> {
            assert!(prompt.system.contains("CONTEXT:"));
            let fragments: Vec<Result<String>> = self
                .answer
                .split_inclusive(' ')
                .map(|piece| Ok(piece.to_string()))
                .collect();
            Ok(AnswerStream::from_fragments(fragments.into_iter()))
        }
    }

    struct FailingGenerator;

    impl Generator for FailingGenerator {
        fn stream(&self, _prompt: &AssembledPrompt) -> Result<AnswerStream> {
            Err(ScreenerError::GenerationService {
                reason: "scripted outage".into(),
            })
        }
    }

    fn seeded_config(dir: &std::path::Path) -> ScreenerConfig {
        let index_path = dir.join("index");
        let mut store = VectorStore::open(&index_path).expect("open store");
        let seed = [
            ("Article 5 bans certain biometric categorisation systems.", 0u32, vec![1.0, 0.0]),
            ("Chatbots must disclose that users interact with an AI system.", 1, vec![0.0, 1.0]),
        ];
        for (text, page, embedding) in seed {
            let chunk = Chunk::new(text, Some(page));
            store.append(chunk, embedding).expect("append");
        }
        ScreenerConfig {
            index_path,
            ..ScreenerConfig::default()
        }
    }

    #[test]
    fn open_fails_before_ingestion() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ScreenerConfig {
            index_path: dir.path().join("never-built"),
            ..ScreenerConfig::default()
        };
        let result = Session::open(config, KeywordEmbedder, FailingGenerator);
        assert!(matches!(
            result,
            Err(ScreenerError::IndexUnavailable { .. })
        ));
    }

    #[test]
    fn ask_retrieves_cites_and_streams() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = seeded_config(dir.path());
        let session = Session::open(
            config,
            KeywordEmbedder,
            ScriptedGenerator {
                answer: "Risk level (not legal advice): Prohibited\n\nArticle 5 applies.",
            },
        )
        .expect("open session");
        assert_eq!(session.record_count(), 2);

        let response = session
            .ask_text("Is biometric categorisation allowed?")
            .expect("ask");
        assert_eq!(response.hits[0].chunk.source_page, Some(0));
        assert_eq!(response.citations.len(), response.hits.len());
        assert_eq!(response.citations[0].label, "Source 1: Article 5 (Page 1)");
        assert_eq!(response.stats.synthesis_ms, 0);

        let answer = response.answer.collect_answer().expect("drain");
        assert!(answer.starts_with("Risk level"));
    }

    #[test]
    fn ask_collected_classifies_the_first_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = seeded_config(dir.path());
        let session = Session::open(
            config,
            KeywordEmbedder,
            ScriptedGenerator {
                answer: "Risk level (not legal advice): Limited Risk\n\nDisclose the chatbot.",
            },
        )
        .expect("open session");

        let screened = session
            .ask_collected(&AskRequest::new("Do chatbots need transparency?"))
            .expect("ask");
        assert_eq!(screened.risk, Some(RiskLevel::LimitedRisk));
        assert!(screened.answer.contains("Disclose"));
        assert!(!screened.citations.is_empty());
        assert!(screened.stats.latency_ms >= screened.stats.retrieval_ms);
    }

    #[test]
    fn failed_ask_leaves_the_session_usable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = seeded_config(dir.path());
        let session = Session::open(config, KeywordEmbedder, FailingGenerator)
            .expect("open session");

        let request = AskRequest::new("biometric");
        assert!(session.ask(&request).is_err());

        // Retrieval still works against the same open store.
        let retriever = Retriever::new(&session.store, &session.embedder);
        let hits = retriever.retrieve("biometric", 2).expect("retrieve");
        assert_eq!(hits.len(), 2);
    }
}
