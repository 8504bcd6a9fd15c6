//! Ingestion processor
//!
//! Core logic for indexing a document: chunking, embedding, the atomic index
//! write, and best-effort persistence.

use crate::chunker::{chunk_text, ChunkingConfig};
use crate::errors::IngestionError;
use chrono::Utc;
use cocounsel_common::embeddings::ResilientEmbedder;
use cocounsel_common::metrics;
use cocounsel_common::models::{content_hash, Chunk, ChunkMetadata, SourceKind};
use cocounsel_search::{ChunkStore, VectorIndex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Plain text plus provenance, ready to index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub document_id: String,
    pub text: String,
    pub source_kind: SourceKind,
    pub case_id: Option<String>,
    pub title: Option<String>,
    pub citation: Option<String>,
    pub page_number: Option<u32>,
}

/// A reported decision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseLawInput {
    pub citation: String,
    pub title: String,
    pub text: String,
    pub court: Option<String>,
    pub date: Option<String>,
}

/// A statute or regulation section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatuteInput {
    pub citation: String,
    pub title: String,
    pub text: String,
}

/// A file uploaded to a case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDocumentInput {
    pub id: String,
    pub case_id: String,
    pub content: String,
    pub filename: Option<String>,
}

/// Stable document-id suffix derived from a citation
pub fn citation_key(citation: &str) -> String {
    let digest = Sha256::digest(citation.trim().as_bytes());
    hex::encode(&digest[..8])
}

/// Chunks, embeds and indexes documents
pub struct DocumentIndexer {
    index: Arc<VectorIndex>,
    embedder: Arc<ResilientEmbedder>,
    store: Option<Arc<dyn ChunkStore>>,
    chunking: ChunkingConfig,
}

impl DocumentIndexer {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<ResilientEmbedder>, chunking: ChunkingConfig) -> Self {
        Self {
            index,
            embedder,
            store: None,
            chunking,
        }
    }

    /// Persist every indexed document to `store`
    pub fn with_store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// Index one document, superseding any earlier version with the same id.
    ///
    /// The index write happens before persistence. A persistence failure is
    /// logged and counted, removes the document's stored chunks, and does not
    /// un-index it.
    #[instrument(skip(self, input), fields(document_id = %input.document_id, source = %input.source_kind))]
    pub async fn index_document(&self, input: DocumentInput) -> Result<Vec<Chunk>, IngestionError> {
        let start = Instant::now();

        if input.document_id.trim().is_empty() {
            return Err(IngestionError::InvalidDocument("document id must not be empty".into()));
        }

        let texts = chunk_text(&input.text, &self.chunking);
        if texts.is_empty() {
            return Err(IngestionError::EmptyDocument {
                document_id: input.document_id,
            });
        }

        let vectors = self.embedder.embed_batch_or_fallback(&texts).await;
        let created_at = Utc::now();
        let chunk_count = texts.len();

        let chunks: Vec<Chunk> = texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, vector))| Chunk {
                id: Chunk::make_id(&input.document_id, i),
                source_document_id: input.document_id.clone(),
                case_id: input.case_id.clone(),
                vector,
                metadata: ChunkMetadata {
                    source_kind: input.source_kind,
                    title: input.title.clone(),
                    citation: input.citation.clone(),
                    page_number: input.page_number,
                    chunk_index: i,
                    chunk_count,
                    content_hash: content_hash(&text),
                    created_at,
                },
                text,
            })
            .collect();

        self.index.index_document(&input.document_id, chunks.clone())?;

        if let Some(store) = &self.store {
            self.persist(store.as_ref(), &input.document_id, &chunks).await;
        }

        metrics::record_ingestion(start.elapsed().as_secs_f64(), chunks.len(), input.source_kind.as_str());
        info!(chunks = chunks.len(), "Document indexed");

        Ok(chunks)
    }

    async fn persist(&self, store: &dyn ChunkStore, document_id: &str, chunks: &[Chunk]) {
        if let Err(e) = store.delete_document(document_id).await {
            warn!(document_id, error = %e, "Failed to clear superseded chunks from store");
        }

        let mut failed = 0usize;
        for chunk in chunks {
            if let Err(e) = store.persist_chunk(chunk).await {
                failed += 1;
                warn!(chunk_id = %chunk.id, error = %e, "Failed to persist chunk");
            }
        }

        if failed > 0 {
            metrics::record_persist_failures(failed);
            // the store never keeps part of a document
            if let Err(e) = store.delete_document(document_id).await {
                warn!(document_id, error = %e, "Failed to roll back partially persisted document");
            }
            warn!(document_id, failed, total = chunks.len(), "Document indexed but not persisted");
        }
    }

    /// Index a reported decision under `case_{key}`
    pub async fn index_case_law(&self, input: CaseLawInput) -> Result<Vec<Chunk>, IngestionError> {
        self.index_document(DocumentInput {
            document_id: format!("case_{}", citation_key(&input.citation)),
            text: input.text,
            source_kind: SourceKind::CaseLaw,
            case_id: None,
            title: Some(input.title),
            citation: Some(input.citation),
            page_number: None,
        })
        .await
    }

    /// Index a statute under `statute_{key}`
    pub async fn index_statute(&self, input: StatuteInput) -> Result<Vec<Chunk>, IngestionError> {
        self.index_document(DocumentInput {
            document_id: format!("statute_{}", citation_key(&input.citation)),
            text: input.text,
            source_kind: SourceKind::Statute,
            case_id: None,
            title: Some(input.title),
            citation: Some(input.citation),
            page_number: None,
        })
        .await
    }

    /// Index a knowledge-base entry under `wiki_{entry_id}`
    pub async fn index_wiki_entry(
        &self,
        entry_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Vec<Chunk>, IngestionError> {
        self.index_document(DocumentInput {
            document_id: format!("wiki_{entry_id}"),
            text: content.to_string(),
            source_kind: SourceKind::Wiki,
            case_id: None,
            title: Some(title.to_string()),
            citation: None,
            page_number: None,
        })
        .await
    }

    /// Index a case file; returns the chunk count
    pub async fn index_case_document(&self, input: CaseDocumentInput) -> Result<usize, IngestionError> {
        let chunks = self
            .index_document(DocumentInput {
                document_id: input.id,
                text: input.content,
                source_kind: SourceKind::Document,
                case_id: Some(input.case_id),
                title: input.filename,
                citation: None,
                page_number: None,
            })
            .await?;
        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cocounsel_common::errors::{AppError, Result as AppResult};
    use cocounsel_search::{ChunkFilter, InMemoryChunkStore, Retriever, SearchOptions, VectorRetriever};

    const DIM: usize = 256;

    struct BrokenStore;

    #[async_trait]
    impl ChunkStore for BrokenStore {
        async fn persist_chunk(&self, _chunk: &Chunk) -> AppResult<()> {
            Err(AppError::Internal { message: "disk full".into() })
        }

        async fn load_chunks(&self, _filter: &ChunkFilter) -> AppResult<Vec<Chunk>> {
            Err(AppError::Internal { message: "disk full".into() })
        }

        async fn delete_document(&self, _document_id: &str) -> AppResult<()> {
            Err(AppError::Internal { message: "disk full".into() })
        }
    }

    /// Rejects the write of one chunk position, stores everything else
    struct FlakyStore {
        inner: InMemoryChunkStore,
        fail_index: usize,
    }

    #[async_trait]
    impl ChunkStore for FlakyStore {
        async fn persist_chunk(&self, chunk: &Chunk) -> AppResult<()> {
            if chunk.metadata.chunk_index == self.fail_index {
                return Err(AppError::Internal { message: "write timed out".into() });
            }
            self.inner.persist_chunk(chunk).await
        }

        async fn load_chunks(&self, filter: &ChunkFilter) -> AppResult<Vec<Chunk>> {
            self.inner.load_chunks(filter).await
        }

        async fn delete_document(&self, document_id: &str) -> AppResult<()> {
            self.inner.delete_document(document_id).await
        }
    }

    fn setup(chunking: ChunkingConfig) -> (Arc<VectorIndex>, Arc<ResilientEmbedder>, DocumentIndexer) {
        let index = Arc::new(VectorIndex::new(DIM));
        let embedder = Arc::new(ResilientEmbedder::local_only(DIM));
        let indexer = DocumentIndexer::new(Arc::clone(&index), Arc::clone(&embedder), chunking);
        (index, embedder, indexer)
    }

    fn document(id: &str, text: &str) -> DocumentInput {
        DocumentInput {
            document_id: id.to_string(),
            text: text.to_string(),
            source_kind: SourceKind::Document,
            case_id: Some("case-1".to_string()),
            title: Some("Scheduling order".to_string()),
            citation: None,
            page_number: Some(3),
        }
    }

    #[tokio::test]
    async fn test_index_then_search() {
        let (index, embedder, indexer) = setup(ChunkingConfig::default());
        let chunks = indexer
            .index_document(document(
                "order-1",
                "The deadline for filing is March 1. The hearing is scheduled for March 15.",
            ))
            .await
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "order-1_chunk_0");
        assert_eq!(chunks[0].metadata.chunk_count, 1);
        assert_eq!(chunks[0].metadata.page_number, Some(3));
        assert_eq!(chunks[0].vector.len(), DIM);

        let retriever = VectorRetriever::new(index, embedder);
        let results = retriever
            .retrieve("when is the hearing", &SearchOptions::default().for_case("case-1"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].score >= 0.3);
    }

    #[tokio::test]
    async fn test_reindex_supersedes() {
        let (index, _, indexer) = setup(ChunkingConfig::new(4, 1).unwrap());
        let long = "one two three four five six seven eight nine ten";
        assert_eq!(indexer.index_document(document("doc", long)).await.unwrap().len(), 3);
        assert_eq!(index.len().unwrap(), 3);

        indexer.index_document(document("doc", "short text")).await.unwrap();
        assert_eq!(index.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_document_is_rejected() {
        let (index, _, indexer) = setup(ChunkingConfig::default());
        let err = indexer.index_document(document("blank", "   ")).await.unwrap_err();
        assert!(matches!(err, IngestionError::EmptyDocument { .. }));
        assert!(index.is_empty().unwrap());

        let app: AppError = err.into();
        assert!(app.is_client_error());
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let (_, embedder, indexer) = setup(ChunkingConfig::new(4, 1).unwrap());
        let store = Arc::new(InMemoryChunkStore::new());
        let indexer = indexer.with_store(store.clone());

        indexer
            .index_document(document("doc", "one two three four five six seven"))
            .await
            .unwrap();
        indexer.index_document(document("doc", "one two three")).await.unwrap();
        assert_eq!(store.len().unwrap(), 1);

        let fresh = VectorIndex::new(DIM);
        let loaded = tokio_test::assert_ok!(fresh.hydrate(store.as_ref(), &ChunkFilter::for_case("case-1")).await);
        assert_eq!(loaded, 1);
        assert_eq!(embedder.dimension(), fresh.dimension());
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_index() {
        let (index, _, indexer) = setup(ChunkingConfig::default());
        let indexer = indexer.with_store(Arc::new(BrokenStore));

        let chunks = indexer.index_document(document("doc", "bail hearing")).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(index.len().unwrap(), 1);

        let err = index.hydrate(&BrokenStore, &ChunkFilter::default()).await.unwrap_err();
        assert!(matches!(err, AppError::IndexUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_partial_persist_is_rolled_back() {
        let (index, _, indexer) = setup(ChunkingConfig::new(4, 1).unwrap());
        let store = Arc::new(FlakyStore {
            inner: InMemoryChunkStore::new(),
            fail_index: 1,
        });
        let indexer = indexer.with_store(store.clone());

        let chunks = indexer
            .index_document(document("doc", "one two three four five six seven eight nine ten"))
            .await
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(index.len().unwrap(), 3);
        assert!(store.inner.is_empty().unwrap());

        let fresh = VectorIndex::new(DIM);
        assert_eq!(fresh.hydrate(store.as_ref(), &ChunkFilter::default()).await.unwrap(), 0);
        assert!(fresh.is_empty().unwrap());
    }

    #[test]
    fn test_persist_failures_are_counted() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            tokio_test::block_on(async {
                let (_, _, indexer) = setup(ChunkingConfig::default());
                let indexer = indexer.with_store(Arc::new(BrokenStore));
                indexer.index_document(document("doc", "bail hearing")).await.unwrap();
            })
        });

        let rendered = handle.render();
        assert!(
            rendered.contains("cocounsel_ingestion_persist_failures_total 1"),
            "{rendered}"
        );
    }

    #[tokio::test]
    async fn test_convenience_indexers() {
        let (index, _, indexer) = setup(ChunkingConfig::default());

        let law = indexer
            .index_case_law(CaseLawInput {
                citation: "People v. Smith, 12 N.Y.3d 45".into(),
                title: "People v. Smith".into(),
                text: "Suppression was required where the search lacked probable cause.".into(),
                court: Some("Court of Appeals".into()),
                date: None,
            })
            .await
            .unwrap();
        assert!(law[0].source_document_id.starts_with("case_"));
        assert_eq!(law[0].metadata.source_kind, SourceKind::CaseLaw);
        assert_eq!(law[0].citation_label(), "People v. Smith, 12 N.Y.3d 45");

        let statute = indexer
            .index_statute(StatuteInput {
                citation: "CPL 30.30".into(),
                title: "Speedy trial".into(),
                text: "The people must be ready for trial within six months.".into(),
            })
            .await
            .unwrap();
        assert_eq!(statute[0].source_document_id, format!("statute_{}", citation_key("CPL 30.30")));

        let wiki = indexer
            .index_wiki_entry("bail-101", "Bail basics", "Bail secures the return of the defendant.")
            .await
            .unwrap();
        assert_eq!(wiki[0].source_document_id, "wiki_bail-101");
        assert_eq!(wiki[0].citation_label(), "wiki: Bail basics");

        let count = indexer
            .index_case_document(CaseDocumentInput {
                id: "upload-9".into(),
                case_id: "case-1".into(),
                content: "Lab report shows a blood alcohol content of 0.09.".into(),
                filename: Some("lab_report.pdf".into()),
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(index.document_count().unwrap(), 4);
    }

    #[test]
    fn test_citation_key_is_stable() {
        assert_eq!(citation_key("CPL 30.30"), citation_key("  CPL 30.30 "));
        assert_ne!(citation_key("CPL 30.30"), citation_key("CPL 30.20"));
        assert_eq!(citation_key("x").len(), 16);
    }
}
