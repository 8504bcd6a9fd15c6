//! Exact vector similarity search
//!
//! Scores every chunk passing the filter against the query embedding, drops
//! those under the threshold, and orders by score, then recency, then
//! insertion order.

use super::{cosine_similarity, Retriever, SearchOptions};
use crate::index::{IndexedChunk, VectorIndex};
use cocounsel_common::embeddings::ResilientEmbedder;
use cocounsel_common::errors::{AppError, Result};
use cocounsel_common::metrics;
use cocounsel_common::models::SearchResult;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// Vector retriever over an in-memory index
#[derive(Clone)]
pub struct VectorRetriever {
    index: Arc<VectorIndex>,
    embedder: Arc<ResilientEmbedder>,
}

impl VectorRetriever {
    /// Create a new vector retriever
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<ResilientEmbedder>) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Rank indexed chunks against an already-embedded query
    pub fn rank(&self, query_vector: &[f32], options: &SearchOptions) -> Result<Vec<SearchResult>> {
        if options.top_k == 0 {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.index.dimension() {
            return Err(AppError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<(f32, IndexedChunk)> = self
            .index
            .snapshot(&options.filter())?
            .into_iter()
            .map(|entry| (cosine_similarity(query_vector, &entry.chunk.vector), entry))
            .filter(|(score, _)| *score >= options.min_score)
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.chunk.metadata.created_at.cmp(&a.chunk.metadata.created_at))
                .then_with(|| a.seq.cmp(&b.seq))
        });
        scored.truncate(options.top_k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| SearchResult {
                chunk: entry.chunk.as_ref().clone(),
                score,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl Retriever for VectorRetriever {
    #[tracing::instrument(skip(self, options), fields(top_k = options.top_k, case_id = ?options.case_id))]
    async fn retrieve(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let start = Instant::now();

        // nothing to rank: skip the embedding call entirely
        if options.top_k == 0 || self.index.is_empty()? {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_or_fallback(query).await;
        let results = self.rank(&query_vector, options)?;

        metrics::record_search(
            start.elapsed().as_secs_f64(),
            results.len(),
            !options.filter().is_unfiltered(),
        );
        tracing::debug!(results = results.len(), "Search complete");

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use cocounsel_common::embeddings::LocalEmbedder;
    use cocounsel_common::models::{content_hash, Chunk, ChunkMetadata, SourceKind};

    const DIM: usize = 1024;

    struct Fixture {
        index: Arc<VectorIndex>,
        retriever: VectorRetriever,
        local: LocalEmbedder,
    }

    fn fixture() -> Fixture {
        let index = Arc::new(VectorIndex::new(DIM));
        let embedder = Arc::new(ResilientEmbedder::local_only(DIM));
        Fixture {
            retriever: VectorRetriever::new(Arc::clone(&index), embedder),
            index,
            local: LocalEmbedder::new(DIM),
        }
    }

    fn make_chunk(
        local: &LocalEmbedder,
        doc: &str,
        text: &str,
        kind: SourceKind,
        case_id: Option<&str>,
    ) -> Chunk {
        Chunk {
            id: Chunk::make_id(doc, 0),
            source_document_id: doc.to_string(),
            case_id: case_id.map(str::to_string),
            text: text.to_string(),
            vector: local.embed_text(text),
            metadata: ChunkMetadata {
                source_kind: kind,
                title: Some(doc.to_string()),
                citation: None,
                page_number: None,
                chunk_index: 0,
                chunk_count: 1,
                content_hash: content_hash(text),
                created_at: Utc::now(),
            },
        }
    }

    fn add(f: &Fixture, doc: &str, text: &str, kind: SourceKind, case_id: Option<&str>) {
        let chunk = make_chunk(&f.local, doc, text, kind, case_id);
        f.index.index_document(doc, vec![chunk]).unwrap();
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let f = fixture();
        let results = f.retriever.retrieve("anything", &SearchOptions::default()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_zero_returns_empty() {
        let f = fixture();
        add(&f, "a", "bail hearing", SourceKind::Document, None);
        let results = f
            .retriever
            .retrieve("bail hearing", &SearchOptions::default().with_top_k(0))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_hearing_date_scenario() {
        let f = fixture();
        add(
            &f,
            "schedule",
            "The deadline for filing is March 1. The hearing is scheduled for March 15.",
            SourceKind::Document,
            Some("case-1"),
        );

        let results = f
            .retriever
            .retrieve("when is the hearing", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.source_document_id, "schedule");
        assert!(results[0].score >= 0.3);
    }

    #[tokio::test]
    async fn test_threshold_and_top_k_bound() {
        let f = fixture();
        for i in 0..12 {
            add(
                &f,
                &format!("doc{i}"),
                &format!("motion to suppress evidence hearing number {i}"),
                SourceKind::Document,
                None,
            );
        }
        add(&f, "noise", "quarterly revenue projections", SourceKind::Document, None);

        let options = SearchOptions::default();
        let results = tokio_test::assert_ok!(f.retriever.retrieve("motion to suppress evidence", &options).await);
        assert!(results.len() <= 5);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.score >= 0.3));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

        let none = f
            .retriever
            .retrieve("motion to suppress evidence", &SearchOptions::default().with_min_score(1.01))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_self_query_ranks_first() {
        let f = fixture();
        let texts = [
            "The defendant waived the right to a jury trial.",
            "Custody hearing continued to next month.",
            "Statute of limitations for civil claims is three years.",
        ];
        for (i, text) in texts.iter().enumerate() {
            add(&f, &format!("d{i}"), text, SourceKind::Document, None);
        }

        for (i, text) in texts.iter().enumerate() {
            let results = f
                .retriever
                .retrieve(text, &SearchOptions::default().with_min_score(-1.0))
                .await
                .unwrap();
            assert_eq!(results[0].chunk.source_document_id, format!("d{i}"));
            assert!((results[0].score - 1.0).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn test_filters() {
        let f = fixture();
        add(&f, "mine", "bail hearing transcript", SourceKind::Document, Some("case-1"));
        add(&f, "theirs", "bail hearing transcript", SourceKind::Document, Some("case-2"));
        add(&f, "law", "bail hearing transcript", SourceKind::CaseLaw, None);

        let options = SearchOptions::default().for_case("case-1");
        let results = f.retriever.retrieve("bail hearing", &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.source_document_id, "mine");

        let options = SearchOptions::default().with_source_kinds(vec![SourceKind::CaseLaw]);
        let results = f.retriever.retrieve("bail hearing", &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.source_document_id, "law");
    }

    #[test]
    fn test_tie_break_recency_then_insertion() {
        let f = fixture();
        let now = Utc::now();
        let text = "identical text for ties";

        let mut old = make_chunk(&f.local, "old", text, SourceKind::Document, None);
        old.metadata.created_at = now - Duration::days(2);
        let mut new = make_chunk(&f.local, "new", text, SourceKind::Document, None);
        new.metadata.created_at = now;
        let mut twin_a = make_chunk(&f.local, "twin_a", text, SourceKind::Document, None);
        twin_a.metadata.created_at = now - Duration::days(1);
        let mut twin_b = make_chunk(&f.local, "twin_b", text, SourceKind::Document, None);
        twin_b.metadata.created_at = now - Duration::days(1);

        for chunk in [old, twin_a, new, twin_b] {
            let doc = chunk.source_document_id.clone();
            f.index.index_document(&doc, vec![chunk]).unwrap();
        }

        let query = f.local.embed_text(text);
        let results = f.retriever.rank(&query, &SearchOptions::default()).unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.chunk.source_document_id.as_str()).collect();
        assert_eq!(order, vec!["new", "twin_a", "twin_b", "old"]);
    }

    #[test]
    fn test_rank_rejects_wrong_query_dimension() {
        let f = fixture();
        let err = f.retriever.rank(&[1.0, 0.0], &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { .. }));
    }
}
