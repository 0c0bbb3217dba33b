//! Durable vector store: persisted (chunk, embedding) records plus cosine
//! k-nearest-neighbor search.
//!
//! Layout under the store directory:
//! - `meta.json` — format version, embedding dimension, distance metric.
//!   Written atomically on the first append.
//! - `records.bin` — length-prefixed bincode records, appended one at a time.
//!   Appends across process restarts accumulate; the file is replayed on open
//!   and a truncated trailing record (crash mid-append) is dropped with a
//!   warning.
//!
//! The store grows monotonically. There are no delete or update operations;
//! query-time opens are read-only.

use std::io::Write;
use std::path::{Path, PathBuf};

use atomic_write_file::AtomicWriteFile;
use bincode::config::{self, Config};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScreenerError};
use crate::types::{Chunk, IndexedRecord, RetrievalHit};

const META_FILE: &str = "meta.json";
const RECORDS_FILE: &str = "records.bin";
const STORE_FORMAT_VERSION: u32 = 1;
const METRIC_COSINE: &str = "cosine";

fn record_config() -> impl Config {
    config::standard()
        .with_fixed_int_encoding()
        .with_little_endian()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreMeta {
    version: u32,
    dimension: usize,
    metric: String,
}

/// Append-only vector store over a directory.
#[derive(Debug)]
pub struct VectorStore {
    dir: PathBuf,
    records: Vec<IndexedRecord>,
    dimension: Option<usize>,
    read_only: bool,
}

impl VectorStore {
    /// Open (or create) a store for ingestion. The directory is created if
    /// missing; existing records are replayed so appends accumulate across
    /// restarts.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs_err::create_dir_all(&dir)?;
        let meta = read_meta(&dir)?;
        let records = replay_records(&dir)?;
        Ok(Self {
            dir,
            records,
            dimension: meta.map(|m| m.dimension),
            read_only: false,
        })
    }

    /// Open a store for querying. A missing or never-initialized store is
    /// reported as not ready; no retrieval is attempted against it.
    pub fn open_read_only(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ScreenerError::IndexUnavailable {
                path: dir,
                reason: "store directory does not exist".into(),
            });
        }
        let meta = read_meta(&dir)?.ok_or_else(|| ScreenerError::IndexUnavailable {
            path: dir.clone(),
            reason: "store has never been initialized".into(),
        })?;
        if meta.metric != METRIC_COSINE {
            return Err(ScreenerError::IndexUnavailable {
                path: dir,
                reason: format!("unsupported distance metric {:?}", meta.metric),
            });
        }
        let records = replay_records(&dir)?;
        Ok(Self {
            dir,
            records,
            dimension: Some(meta.dimension),
            read_only: true,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension, fixed store-wide by the first append.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Persist one record. Safe to call chunk-by-chunk as ingestion proceeds;
    /// each append is flushed so completed work survives a crash.
    pub fn append(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        if self.read_only {
            return Err(ScreenerError::StoreReadOnly);
        }
        match self.dimension {
            Some(expected) if expected != embedding.len() => {
                return Err(ScreenerError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            Some(_) => {}
            None => {
                // First record fixes the dimension for the store's lifetime.
                self.write_meta(embedding.len())?;
                self.dimension = Some(embedding.len());
            }
        }

        let record = IndexedRecord { chunk, embedding };
        let payload = bincode::serde::encode_to_vec(&record, record_config()).map_err(|err| {
            ScreenerError::StoreCodec {
                reason: format!("failed to encode record: {err}"),
            }
        })?;

        let mut file = fs_err::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(RECORDS_FILE))?;
        file.write_all(&(payload.len() as u32).to_le_bytes())?;
        file.write_all(&payload)?;
        file.flush()?;
        file.sync_data()?;

        self.records.push(record);
        Ok(())
    }

    /// The `k` records nearest to `query` under cosine similarity, nearest
    /// first, with stable insertion-order tie-breaking. An empty store yields
    /// an empty result, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalHit>> {
        if self.records.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(ScreenerError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| (idx, cosine_similarity(query, &record.embedding)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, (idx, score))| RetrievalHit {
                rank,
                score,
                chunk: self.records[idx].chunk.clone(),
            })
            .collect())
    }

    fn write_meta(&self, dimension: usize) -> Result<()> {
        let meta = StoreMeta {
            version: STORE_FORMAT_VERSION,
            dimension,
            metric: METRIC_COSINE.into(),
        };
        let body = serde_json::to_vec_pretty(&meta).map_err(|err| ScreenerError::StoreCodec {
            reason: format!("failed to encode meta: {err}"),
        })?;
        let mut file = AtomicWriteFile::open(self.dir.join(META_FILE))?;
        file.write_all(&body)?;
        file.commit()?;
        Ok(())
    }
}

fn read_meta(dir: &Path) -> Result<Option<StoreMeta>> {
    let path = dir.join(META_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs_err::read(&path)?;
    let meta: StoreMeta =
        serde_json::from_slice(&bytes).map_err(|err| ScreenerError::StoreCodec {
            reason: format!("malformed {META_FILE}: {err}"),
        })?;
    if meta.version != STORE_FORMAT_VERSION {
        return Err(ScreenerError::StoreCodec {
            reason: format!("unsupported store format version {}", meta.version),
        });
    }
    Ok(Some(meta))
}

fn replay_records(dir: &Path) -> Result<Vec<IndexedRecord>> {
    let path = dir.join(RECORDS_FILE);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let bytes = fs_err::read(&path)?;
    let mut records = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        if offset + 4 > bytes.len() {
            tracing::warn!(
                offset,
                total = bytes.len(),
                "dropping truncated record length at tail of {RECORDS_FILE}"
            );
            break;
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&bytes[offset..offset + 4]);
        let len = u32::from_le_bytes(len_bytes) as usize;
        let start = offset + 4;
        let end = start + len;
        if end > bytes.len() {
            tracing::warn!(
                offset,
                record_len = len,
                total = bytes.len(),
                "dropping truncated record at tail of {RECORDS_FILE}"
            );
            break;
        }
        let (record, consumed): (IndexedRecord, usize) =
            bincode::serde::decode_from_slice(&bytes[start..end], record_config()).map_err(
                |err| ScreenerError::StoreCodec {
                    reason: format!("corrupt record at offset {offset}: {err}"),
                },
            )?;
        if consumed != len {
            return Err(ScreenerError::StoreCodec {
                reason: format!("record at offset {offset} has trailing bytes"),
            });
        }
        records.push(record);
        offset = end;
    }
    Ok(records)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}
