//! In-memory vector index
//!
//! A linear-scan index over chunk vectors. Reads take a shared lock and
//! writes take the exclusive lock once per document, so a search never sees
//! half of a document: either all of its chunks or none of them.

mod store;

pub use store::{ChunkFilter, ChunkStore, InMemoryChunkStore};

use cocounsel_common::errors::{AppError, Result};
use cocounsel_common::metrics;
use cocounsel_common::models::Chunk;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A stored chunk with its insertion sequence number
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// Monotonic insertion order, used as the final search tie-break
    pub seq: u64,
    pub chunk: Arc<Chunk>,
}

#[derive(Default)]
struct IndexState {
    entries: Vec<IndexedChunk>,
    next_seq: u64,
}

impl IndexState {
    fn push(&mut self, chunk: Chunk) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(IndexedChunk {
            seq,
            chunk: Arc::new(chunk),
        });
    }
}

/// Thread-safe vector index with per-document atomic writes
pub struct VectorIndex {
    dimension: usize,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(IndexState::default()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexState>> {
        self.state.read().map_err(|_| AppError::IndexUnavailable {
            message: "index lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexState>> {
        self.state.write().map_err(|_| AppError::IndexUnavailable {
            message: "index lock poisoned".to_string(),
        })
    }

    fn check_dimension(&self, chunk: &Chunk) -> Result<()> {
        if chunk.vector.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: chunk.vector.len(),
            });
        }
        Ok(())
    }

    /// Insert one chunk, replacing any chunk with the same id
    pub fn index(&self, chunk: Chunk) -> Result<()> {
        self.check_dimension(&chunk)?;

        let mut state = self.write()?;
        state.entries.retain(|e| e.chunk.id != chunk.id);
        state.push(chunk);
        Ok(())
    }

    /// Replace every chunk of `document_id` with `chunks` in one write.
    ///
    /// Validation happens before the lock is taken; on error the index is
    /// unchanged. Returns the number of chunks now held for the document.
    pub fn index_document(&self, document_id: &str, chunks: Vec<Chunk>) -> Result<usize> {
        for chunk in &chunks {
            self.check_dimension(chunk)?;
            if chunk.source_document_id != document_id {
                return Err(AppError::Validation {
                    message: format!(
                        "chunk {} belongs to document {}, not {}",
                        chunk.id, chunk.source_document_id, document_id
                    ),
                    field: Some("source_document_id".to_string()),
                });
            }
        }

        let count = chunks.len();
        let mut state = self.write()?;
        let before = state.entries.len();
        state.entries.retain(|e| e.chunk.source_document_id != document_id);
        let superseded = before - state.entries.len();
        for chunk in chunks {
            state.push(chunk);
        }
        drop(state);

        tracing::debug!(
            document_id = document_id,
            chunks = count,
            superseded = superseded,
            "Indexed document"
        );
        Ok(count)
    }

    /// Remove a document; returns how many chunks were dropped
    pub fn remove_document(&self, document_id: &str) -> Result<usize> {
        let mut state = self.write()?;
        let before = state.entries.len();
        state.entries.retain(|e| e.chunk.source_document_id != document_id);
        Ok(before - state.entries.len())
    }

    /// Consistent snapshot of the chunks matching `filter`, in insertion order
    pub fn snapshot(&self, filter: &ChunkFilter) -> Result<Vec<IndexedChunk>> {
        let state = self.read()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| filter.matches(&e.chunk))
            .cloned()
            .collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn document_count(&self) -> Result<usize> {
        let state = self.read()?;
        let documents: HashSet<&str> = state
            .entries
            .iter()
            .map(|e| e.chunk.source_document_id.as_str())
            .collect();
        Ok(documents.len())
    }

    /// Load persisted chunks into the index, one atomic write per document.
    ///
    /// A store failure means there is nothing meaningful to search, so it
    /// surfaces as `IndexUnavailable`. A document whose stored chunks are not
    /// exactly `0..chunk_count` was interrupted mid-write and is skipped.
    /// Every remaining group is dimension-checked before any is indexed, so a
    /// bad group leaves the index untouched.
    pub async fn hydrate(&self, store: &dyn ChunkStore, filter: &ChunkFilter) -> Result<usize> {
        let chunks = store
            .load_chunks(filter)
            .await
            .map_err(|e| AppError::IndexUnavailable {
                message: format!("failed to load persisted chunks: {}", e),
            })?;

        // group by document, keeping first-seen document order
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Chunk>> = HashMap::new();
        for chunk in chunks {
            if !groups.contains_key(&chunk.source_document_id) {
                order.push(chunk.source_document_id.clone());
            }
            groups.entry(chunk.source_document_id.clone()).or_default().push(chunk);
        }

        let mut complete: Vec<(String, Vec<Chunk>)> = Vec::with_capacity(order.len());
        let mut skipped = 0usize;
        for document_id in order {
            let Some(mut chunks) = groups.remove(&document_id) else {
                continue;
            };
            chunks.sort_by_key(|c| c.metadata.chunk_index);

            if !is_complete(&chunks) {
                skipped += 1;
                tracing::warn!(
                    document_id = %document_id,
                    stored = chunks.len(),
                    expected = chunks.first().map_or(0, |c| c.metadata.chunk_count),
                    "Skipping partially persisted document"
                );
                continue;
            }

            for chunk in &chunks {
                self.check_dimension(chunk)?;
            }
            complete.push((document_id, chunks));
        }

        if skipped > 0 {
            metrics::record_hydrate_skipped(skipped);
        }

        let mut loaded = 0;
        for (document_id, chunks) in complete {
            loaded += self.index_document(&document_id, chunks)?;
        }

        tracing::info!(chunks = loaded, skipped_documents = skipped, "Hydrated vector index from store");
        Ok(loaded)
    }
}

/// Sorted chunks cover `0..chunk_count` exactly once
fn is_complete(chunks: &[Chunk]) -> bool {
    let n = chunks.len();
    chunks
        .iter()
        .enumerate()
        .all(|(i, c)| c.metadata.chunk_index == i && c.metadata.chunk_count == n)
}
