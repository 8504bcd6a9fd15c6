//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub index: CheckResult,
    pub providers: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: cocounsel_common::VERSION.to_string(),
    })
}

/// Readiness probe - the index must be readable; providers are only listed
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let index = state.engine.index();
    let index_check = match (index.len(), index.document_count()) {
        (Ok(chunks), Ok(documents)) => CheckResult {
            status: "up".to_string(),
            detail: Some(format!("{chunks} chunks across {documents} documents")),
            error: None,
        },
        (Err(e), _) | (_, Err(e)) => CheckResult {
            status: "down".to_string(),
            detail: None,
            error: Some(e.to_string()),
        },
    };

    let provider_ids = state.engine.providers().provider_ids();
    let providers_check = CheckResult {
        status: if provider_ids.is_empty() { "none" } else { "up" }.to_string(),
        detail: Some(provider_ids.join(", ")),
        error: None,
    };

    let ready = index_check.status == "up";

    Json(ReadyResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks {
            index: index_check,
            providers: providers_check,
        },
    })
}
