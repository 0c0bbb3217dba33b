//! Offline ingestion: source document → chunks → embeddings → vector store.
//!
//! Chunks are processed strictly one at a time with a pacing delay between
//! them, trading throughput for compliance with the embedding provider's
//! request-rate ceiling. A failing chunk never aborts the run: its outcome is
//! recorded, the pipeline backs off, and the next chunk is attempted. The run
//! terminates once every chunk has been attempted per the retry policy.

use std::time::Duration;

use crate::chunker::RecursiveChunker;
use crate::config::ScreenerConfig;
use crate::error::Result;
use crate::reader::ReaderRegistry;
use crate::store::VectorStore;
use crate::types::{Chunk, Embedder};

/// Explicit per-chunk retry policy.
///
/// The default attempts each chunk exactly once; after a failed attempt the
/// pipeline sleeps `backoff` before carrying on, leaving the chunk unindexed.
/// `max_attempts: 2` opts into a single retry after the back-off.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &ScreenerConfig) -> Self {
        Self {
            max_attempts: 1,
            backoff: config.error_backoff,
        }
    }
}

/// Terminal state of one chunk's ingestion attempt(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Indexed,
    Failed { reason: String },
}

/// Per-chunk entry of the run summary.
#[derive(Debug, Clone)]
pub struct ChunkReport {
    /// Zero-based position of the chunk in ingestion order.
    pub index: usize,
    pub source_page: Option<u32>,
    pub outcome: ChunkOutcome,
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub attempted: usize,
    pub indexed: usize,
    pub failed: usize,
    pub chunks: Vec<ChunkReport>,
}

impl IngestReport {
    #[must_use]
    pub fn all_indexed(&self) -> bool {
        self.failed == 0
    }
}

type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Drives chunker → embedder → vector store for one source document.
pub struct IngestPipeline<'a, E: Embedder + ?Sized> {
    config: &'a ScreenerConfig,
    embedder: &'a E,
    registry: ReaderRegistry,
    retry: RetryPolicy,
    progress: Option<Box<ProgressFn>>,
}

impl<'a, E: Embedder + ?Sized> IngestPipeline<'a, E> {
    #[must_use]
    pub fn new(config: &'a ScreenerConfig, embedder: &'a E) -> Self {
        Self {
            config,
            embedder,
            registry: ReaderRegistry::default(),
            retry: RetryPolicy::from_config(config),
            progress: None,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ReaderRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Observe progress as `(attempted_so_far, total)` after each chunk.
    #[must_use]
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Run the full pipeline: load the configured source document, chunk it,
    /// and index every chunk. A missing source document is reported before
    /// any indexing happens.
    pub fn run(&self) -> Result<IngestReport> {
        self.config.validate()?;
        let document = self.registry.load(&self.config.source_path)?;
        let chunks = RecursiveChunker::from_config(self.config).chunk_document(&document);
        let mut store = VectorStore::open(&self.config.index_path)?;
        self.run_chunks(chunks, &mut store)
    }

    /// Index an already-chunked document into `store`. Exposed separately so
    /// callers with their own loader can reuse the fault-tolerant loop.
    pub fn run_chunks(
        &self,
        chunks: Vec<Chunk>,
        store: &mut VectorStore,
    ) -> Result<IngestReport> {
        let total = chunks.len();
        tracing::info!(total, store = %store.path().display(), "starting ingestion");

        let mut report = IngestReport::default();
        for (index, chunk) in chunks.into_iter().enumerate() {
            let source_page = chunk.source_page;
            let outcome = self.index_one(chunk, store);
            report.attempted += 1;
            match &outcome {
                ChunkOutcome::Indexed => {
                    report.indexed += 1;
                    tracing::info!(chunk = index + 1, total, "chunk indexed");
                }
                ChunkOutcome::Failed { reason } => {
                    report.failed += 1;
                    tracing::warn!(chunk = index + 1, total, %reason, "chunk left unindexed");
                }
            }
            report.chunks.push(ChunkReport {
                index,
                source_page,
                outcome,
            });
            if let Some(progress) = &self.progress {
                progress(report.attempted, total);
            }
            // Pace the next embedding call to stay under the rate ceiling.
            if matches!(
                report.chunks.last().map(|c| &c.outcome),
                Some(ChunkOutcome::Indexed)
            ) && report.attempted < total
            {
                std::thread::sleep(self.config.pacing_delay);
            }
        }

        tracing::info!(
            indexed = report.indexed,
            failed = report.failed,
            total,
            "ingestion finished"
        );
        Ok(report)
    }

    fn index_one(&self, chunk: Chunk, store: &mut VectorStore) -> ChunkOutcome {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let result = self
                .embedder
                .embed_query(&chunk.text)
                .and_then(|embedding| store.append(chunk.clone(), embedding));
            match result {
                Ok(()) => return ChunkOutcome::Indexed,
                Err(err) => {
                    tracing::warn!(attempt = attempts, error = %err, "embedding attempt failed");
                    // Only transient failures earn the elevated back-off; a
                    // non-transient error can never succeed later, so the
                    // chunk fails without sleeping.
                    if !err.is_transient() {
                        return ChunkOutcome::Failed {
                            reason: err.to_string(),
                        };
                    }
                    std::thread::sleep(self.retry.backoff);
                    if attempts >= self.retry.max_attempts {
                        return ChunkOutcome::Failed {
                            reason: err.to_string(),
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScreenerError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Deterministic embedder that fails on scripted call numbers.
    struct FlakyEmbedder {
        calls: AtomicUsize,
        fail_on: Vec<usize>,
    }

    impl FlakyEmbedder {
        fn new(fail_on: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    impl Embedder for FlakyEmbedder {
        fn embed_query(&self, text: &str) -> crate::Result<Vec<f32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on.contains(&call) {
                return Err(ScreenerError::EmbeddingService {
                    reason: "simulated rate limit".into(),
                });
            }
            let len = text.len() as f32;
            Ok(vec![len, 1.0 / (len + 1.0)])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn fast_config(dir: &std::path::Path) -> ScreenerConfig {
        ScreenerConfig {
            index_path: dir.join("idx"),
            pacing_delay: Duration::ZERO,
            error_backoff: Duration::ZERO,
            ..Default::default()
        }
    }

    fn numbered_chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk::new(format!("chunk number {i}"), Some(i as u32)))
            .collect()
    }

    #[test]
    fn one_failure_does_not_stop_the_run() {
        let dir = tempdir().expect("tmp");
        let config = fast_config(dir.path());
        let embedder = FlakyEmbedder::new(vec![5]);
        let pipeline = IngestPipeline::new(&config, &embedder);

        let mut store = VectorStore::open(&config.index_path).expect("open");
        let report = pipeline
            .run_chunks(numbered_chunks(10), &mut store)
            .expect("run");

        assert_eq!(report.attempted, 10);
        assert_eq!(report.indexed, 9);
        assert_eq!(report.failed, 1);
        assert_eq!(store.len(), 9);
        assert_eq!(
            report.chunks[4].outcome,
            ChunkOutcome::Failed {
                reason: "embedding service failure: simulated rate limit".into()
            }
        );
        // Chunks after the failure were all attempted and indexed.
        assert!(
            report.chunks[5..]
                .iter()
                .all(|c| c.outcome == ChunkOutcome::Indexed)
        );
    }

    #[test]
    fn opt_in_retry_recovers_a_transient_failure() {
        let dir = tempdir().expect("tmp");
        let config = fast_config(dir.path());
        let embedder = FlakyEmbedder::new(vec![3]);
        let pipeline = IngestPipeline::new(&config, &embedder).with_retry_policy(RetryPolicy {
            max_attempts: 2,
            backoff: Duration::ZERO,
        });

        let mut store = VectorStore::open(&config.index_path).expect("open");
        let report = pipeline
            .run_chunks(numbered_chunks(5), &mut store)
            .expect("run");
        assert_eq!(report.indexed, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn progress_reports_every_chunk() {
        let dir = tempdir().expect("tmp");
        let config = fast_config(dir.path());
        let embedder = FlakyEmbedder::new(vec![2]);
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let pipeline = IngestPipeline::new(&config, &embedder)
            .with_progress(move |done, total| sink.lock().expect("lock").push((done, total)));

        let mut store = VectorStore::open(&config.index_path).expect("open");
        pipeline
            .run_chunks(numbered_chunks(3), &mut store)
            .expect("run");
        assert_eq!(*seen.lock().expect("lock"), vec![(1, 3), (2, 3), (3, 3)]);
    }

    /// Embedder whose output dimension never matches the store's.
    struct WrongDimensionEmbedder;

    impl Embedder for WrongDimensionEmbedder {
        fn embed_query(&self, _text: &str) -> crate::Result<Vec<f32>> {
            Ok(vec![1.0, 2.0, 3.0])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    #[test]
    fn non_transient_failures_skip_the_error_backoff() {
        let dir = tempdir().expect("tmp");
        let config = ScreenerConfig {
            index_path: dir.path().join("idx"),
            pacing_delay: Duration::ZERO,
            // Long enough that even one back-off would blow the time bound.
            error_backoff: Duration::from_secs(60),
            ..Default::default()
        };

        let mut store = VectorStore::open(&config.index_path).expect("open");
        store
            .append(Chunk::new("seed", Some(0)), vec![1.0, 0.0])
            .expect("seed");

        let embedder = WrongDimensionEmbedder;
        let pipeline = IngestPipeline::new(&config, &embedder);
        let started = std::time::Instant::now();
        let report = pipeline
            .run_chunks(numbered_chunks(3), &mut store)
            .expect("run");
        assert!(started.elapsed() < Duration::from_secs(5));

        assert_eq!(report.indexed, 0);
        assert_eq!(report.failed, 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_source_document_indexes_nothing() {
        let dir = tempdir().expect("tmp");
        let config = ScreenerConfig {
            source_path: dir.path().join("absent.pdf"),
            ..fast_config(dir.path())
        };
        let embedder = FlakyEmbedder::new(vec![]);
        let err = IngestPipeline::new(&config, &embedder)
            .run()
            .expect_err("missing source");
        assert!(matches!(err, ScreenerError::SourceMissing { .. }));
        assert!(!config.index_path.join("records.bin").exists());
    }

    #[test]
    fn full_run_ingests_a_text_source() {
        let dir = tempdir().expect("tmp");
        let source = dir.path().join("corpus.txt");
        fs_err::write(&source, "Article 5 text. ".repeat(40)).expect("write");
        let config = ScreenerConfig {
            source_path: source,
            chunk_max_chars: 120,
            chunk_overlap: 20,
            ..fast_config(dir.path())
        };
        let embedder = FlakyEmbedder::new(vec![]);
        let report = IngestPipeline::new(&config, &embedder).run().expect("run");
        assert!(report.all_indexed());
        assert!(report.indexed > 1);

        let store = VectorStore::open_read_only(&config.index_path).expect("ro");
        assert_eq!(store.len(), report.indexed);
    }
}
