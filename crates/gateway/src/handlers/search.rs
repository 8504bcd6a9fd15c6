//! Search, context and grounded Q&A handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use super::validate;
use crate::AppState;
use cocounsel_common::{
    errors::Result,
    models::{SearchResult, SourceKind},
};
use cocounsel_context::{AskResponse, RetrievalContext};
use cocounsel_search::SearchOptions;

/// Search request, shared by search, context and ask
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,

    /// Restrict to one case's materials
    #[validate(length(min = 1, max = 200))]
    pub case_id: Option<String>,

    /// Restrict to these source kinds
    pub source_kinds: Option<Vec<SourceKind>>,

    /// Maximum results to return
    #[validate(range(min = 0, max = 50))]
    pub top_k: Option<usize>,

    /// Minimum cosine similarity
    #[validate(range(min = -1.0, max = 1.0))]
    pub min_score: Option<f32>,
}

impl SearchRequest {
    fn options(&self, state: &AppState) -> SearchOptions {
        let mut options = state.engine.search_options();
        options.case_id = self.case_id.clone();
        options.source_kinds = self.source_kinds.clone();
        if let Some(top_k) = self.top_k {
            options.top_k = top_k;
        }
        if let Some(min_score) = self.min_score {
            options.min_score = min_score;
        }
        options
    }
}

/// Search response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchResultItem>,
    pub processing_time_ms: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub chunk_id: String,
    pub document_id: String,
    pub label: String,
    pub source_kind: SourceKind,
    pub text: String,
    pub chunk_index: usize,
    pub score: f32,
}

impl From<SearchResult> for SearchResultItem {
    fn from(r: SearchResult) -> Self {
        Self {
            label: r.chunk.citation_label(),
            chunk_id: r.chunk.id,
            document_id: r.chunk.source_document_id,
            source_kind: r.chunk.metadata.source_kind,
            chunk_index: r.chunk.metadata.chunk_index,
            text: r.chunk.text,
            score: r.score,
        }
    }
}

/// Perform a search
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();
    validate(&request)?;

    let results = state.engine.search(&request.query, &request.options(&state)).await?;
    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        results = results.len(),
        case_id = ?request.case_id,
        latency_ms = processing_time_ms,
        "Search completed"
    );

    Ok(Json(SearchResponse {
        query: request.query,
        total_results: results.len(),
        results: results.into_iter().map(SearchResultItem::from).collect(),
        processing_time_ms,
    }))
}

/// Assemble the budget-bounded retrieval context for a query
pub async fn build_context(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<RetrievalContext>> {
    validate(&request)?;
    let context = state
        .engine
        .build_context(&request.query, &request.options(&state))
        .await?;
    Ok(Json(context))
}

/// Grounded answer through the provider fallback chain
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<AskResponse>> {
    validate(&request)?;
    let answer = state.engine.ask(&request.query, &request.options(&state)).await?;
    Ok(Json(answer))
}
