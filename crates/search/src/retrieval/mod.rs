//! Retrieval over the vector index
//!
//! One retrieval mode today: exact cosine similarity over a linear scan.
//! Any replacement (an approximate index, a remote store) must keep the same
//! filter semantics, score threshold and tie-break order.

mod similarity;
mod vector;

pub use similarity::cosine_similarity;
pub use vector::VectorRetriever;

use crate::index::ChunkFilter;
use cocounsel_common::config::RetrievalConfig;
use cocounsel_common::errors::Result;
use cocounsel_common::models::{SearchResult, SourceKind};
use serde::{Deserialize, Serialize};

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Restrict to one case's materials
    pub case_id: Option<String>,

    /// Restrict to these source kinds (empty means all)
    pub source_kinds: Option<Vec<SourceKind>>,

    /// Maximum results to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_top_k() -> usize {
    5
}

fn default_min_score() -> f32 {
    0.3
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_id: None,
            source_kinds: None,
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

impl SearchOptions {
    /// Defaults taken from the retrieval config
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            min_score: config.min_score,
            ..Self::default()
        }
    }

    pub fn for_case(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = Some(case_id.into());
        self
    }

    pub fn with_source_kinds(mut self, kinds: Vec<SourceKind>) -> Self {
        self.source_kinds = Some(kinds);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn filter(&self) -> ChunkFilter {
        ChunkFilter {
            case_id: self.case_id.clone(),
            document_id: None,
            source_kinds: self.source_kinds.clone(),
        }
    }
}

/// Common trait for retrievers
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Ranked results for `query`, at most `options.top_k`, each scoring at
    /// least `options.min_score`. An empty result means "no confident
    /// match", not failure.
    async fn retrieve(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>>;
}
