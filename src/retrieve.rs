//! Query-time retrieval over the vector store.

use std::time::Instant;

use crate::error::Result;
use crate::store::VectorStore;
use crate::types::{Embedder, RetrievalHit};

/// Wraps the store's similarity search for query time. Read-only: retrieval
/// never mutates the store, so concurrent queries need no coordination.
pub struct Retriever<'a, E: Embedder + ?Sized> {
    store: &'a VectorStore,
    embedder: &'a E,
}

impl<'a, E: Embedder + ?Sized> Retriever<'a, E> {
    #[must_use]
    pub fn new(store: &'a VectorStore, embedder: &'a E) -> Self {
        Self { store, embedder }
    }

    /// Embed `query` with the same embedder configuration used at ingest time
    /// and return up to `k` records, nearest first. Fewer (possibly zero)
    /// records come back when the store holds fewer.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        let started = Instant::now();
        let embedding = self.embedder.embed_query(query)?;
        let hits = self.store.search(&embedding, k)?;
        tracing::debug!(
            k,
            hits = hits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;
    use tempfile::tempdir;

    /// Maps known words onto axes of a tiny embedding space.
    struct AxisEmbedder;

    impl Embedder for AxisEmbedder {
        fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            let lowered = text.to_ascii_lowercase();
            let axis = |word: &str| {
                if lowered.contains(word) { 1.0f32 } else { 0.0 }
            };
            Ok(vec![axis("biometric"), axis("transparency"), axis("sandbox")])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn seeded_store(dir: &std::path::Path) -> VectorStore {
        let mut store = VectorStore::open(dir.join("idx")).expect("open");
        let embedder = AxisEmbedder;
        for (text, page) in [
            ("biometric identification systems", 0),
            ("transparency obligations for providers", 1),
            ("regulatory sandbox participation", 2),
        ] {
            let embedding = embedder.embed_query(text).expect("embed");
            store
                .append(Chunk::new(text, Some(page)), embedding)
                .expect("append");
        }
        store
    }

    #[test]
    fn nearest_chunk_comes_first() {
        let dir = tempdir().expect("tmp");
        let store = seeded_store(dir.path());
        let embedder = AxisEmbedder;
        let retriever = Retriever::new(&store, &embedder);

        let hits = retriever
            .retrieve("is biometric categorisation allowed", 2)
            .expect("retrieve");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "biometric identification systems");
    }

    #[test]
    fn returns_fewer_than_k_when_store_is_small() {
        let dir = tempdir().expect("tmp");
        let store = seeded_store(dir.path());
        let embedder = AxisEmbedder;
        let retriever = Retriever::new(&store, &embedder);
        let hits = retriever.retrieve("transparency", 10).expect("retrieve");
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn identical_queries_return_identical_results() {
        let dir = tempdir().expect("tmp");
        let store = seeded_store(dir.path());
        let embedder = AxisEmbedder;
        let retriever = Retriever::new(&store, &embedder);

        let first = retriever.retrieve("sandbox rules", 3).expect("first");
        let second = retriever.retrieve("sandbox rules", 3).expect("second");
        let texts = |hits: &[RetrievalHit]| {
            hits.iter()
                .map(|h| h.chunk.text.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(texts(&first), texts(&second));
    }
}
