//! Chunk persistence contract
//!
//! The engine only needs write-then-read consistency per document and reads
//! filterable by case and source kind. Anything that can do that (a document
//! database, flat files, an embedded store) can sit behind [`ChunkStore`].

use async_trait::async_trait;
use cocounsel_common::errors::{AppError, Result};
use cocounsel_common::models::{Chunk, SourceKind};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Read filter shared by the store and the index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFilter {
    pub case_id: Option<String>,
    pub document_id: Option<String>,
    /// Empty or absent means every kind
    pub source_kinds: Option<Vec<SourceKind>>,
}

impl ChunkFilter {
    pub fn for_case(case_id: impl Into<String>) -> Self {
        Self {
            case_id: Some(case_id.into()),
            ..Self::default()
        }
    }

    pub fn with_source_kinds(mut self, kinds: Vec<SourceKind>) -> Self {
        self.source_kinds = Some(kinds);
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.case_id.is_none()
            && self.document_id.is_none()
            && self.source_kinds.as_ref().map_or(true, |k| k.is_empty())
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        if let Some(case_id) = &self.case_id {
            if chunk.case_id.as_deref() != Some(case_id.as_str()) {
                return false;
            }
        }
        if let Some(document_id) = &self.document_id {
            if &chunk.source_document_id != document_id {
                return false;
            }
        }
        match &self.source_kinds {
            Some(kinds) if !kinds.is_empty() => kinds.contains(&chunk.metadata.source_kind),
            _ => true,
        }
    }
}

/// External chunk persistence
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert or replace a chunk by id
    async fn persist_chunk(&self, chunk: &Chunk) -> Result<()>;

    /// Load every chunk matching `filter`, in persistence order
    async fn load_chunks(&self, filter: &ChunkFilter) -> Result<Vec<Chunk>>;

    /// Drop every chunk of a document
    async fn delete_document(&self, document_id: &str) -> Result<()>;
}

/// In-memory store for tests and single-process deployments
#[derive(Default)]
pub struct InMemoryChunkStore {
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.chunks.read().map_err(|_| poisoned())?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned() -> AppError {
    AppError::Internal {
        message: "chunk store lock poisoned".to_string(),
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn persist_chunk(&self, chunk: &Chunk) -> Result<()> {
        let mut chunks = self.chunks.write().map_err(|_| poisoned())?;
        match chunks.iter_mut().find(|c| c.id == chunk.id) {
            Some(existing) => *existing = chunk.clone(),
            None => chunks.push(chunk.clone()),
        }
        Ok(())
    }

    async fn load_chunks(&self, filter: &ChunkFilter) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().map_err(|_| poisoned())?;
        Ok(chunks.iter().filter(|c| filter.matches(c)).cloned().collect())
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let mut chunks = self.chunks.write().map_err(|_| poisoned())?;
        chunks.retain(|c| c.source_document_id != document_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cocounsel_common::models::{content_hash, ChunkMetadata};

    fn chunk(doc: &str, index: usize, case_id: Option<&str>, kind: SourceKind) -> Chunk {
        let text = format!("{doc} part {index}");
        Chunk {
            id: Chunk::make_id(doc, index),
            source_document_id: doc.to_string(),
            case_id: case_id.map(str::to_string),
            vector: vec![1.0, 0.0],
            metadata: ChunkMetadata {
                source_kind: kind,
                title: None,
                citation: None,
                page_number: None,
                chunk_index: index,
                chunk_count: 2,
                content_hash: content_hash(&text),
                created_at: Utc::now(),
            },
            text,
        }
    }

    #[test]
    fn test_filter_matching() {
        let c = chunk("doc", 0, Some("case-7"), SourceKind::Document);

        assert!(ChunkFilter::default().matches(&c));
        assert!(ChunkFilter::for_case("case-7").matches(&c));
        assert!(!ChunkFilter::for_case("case-8").matches(&c));
        assert!(ChunkFilter::default()
            .with_source_kinds(vec![SourceKind::Document, SourceKind::Wiki])
            .matches(&c));
        assert!(!ChunkFilter::default()
            .with_source_kinds(vec![SourceKind::Statute])
            .matches(&c));
        // empty kind list is no restriction
        assert!(ChunkFilter::default().with_source_kinds(vec![]).matches(&c));

        let uncased = chunk("statute", 0, None, SourceKind::Statute);
        assert!(!ChunkFilter::for_case("case-7").matches(&uncased));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = InMemoryChunkStore::new();
        store.persist_chunk(&chunk("a", 0, Some("c1"), SourceKind::Document)).await.unwrap();
        store.persist_chunk(&chunk("a", 1, Some("c1"), SourceKind::Document)).await.unwrap();
        store.persist_chunk(&chunk("b", 0, None, SourceKind::CaseLaw)).await.unwrap();
        // upsert by id
        store.persist_chunk(&chunk("a", 1, Some("c1"), SourceKind::Document)).await.unwrap();
        assert_eq!(store.len().unwrap(), 3);

        let case = store.load_chunks(&ChunkFilter::for_case("c1")).await.unwrap();
        assert_eq!(case.len(), 2);
        assert_eq!(case[0].id, "a_chunk_0");

        let law = store
            .load_chunks(&ChunkFilter::default().with_source_kinds(vec![SourceKind::CaseLaw]))
            .await
            .unwrap();
        assert_eq!(law.len(), 1);

        store.delete_document("a").await.unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_poisoned_store_reports_error() {
        let store = std::sync::Arc::new(InMemoryChunkStore::new());
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.chunks.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(AppError::Internal { .. })));
        assert!(store.is_empty().is_err());
    }
}
