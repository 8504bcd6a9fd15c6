//! Multi-role analysis handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate;
use crate::AppState;
use cocounsel_common::errors::Result;
use cocounsel_context::{AgentRole, AnalysisReport, AnalysisRequest, ExecutionMode, QuickAnalysis, RoleId};

/// Analysis request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisBody {
    #[validate(length(min = 1, max = 10000))]
    pub query: String,

    /// Role ids; empty or absent means the default set
    #[serde(default)]
    #[validate(length(max = 8))]
    pub roles: Vec<String>,

    pub case_id: Option<String>,

    #[validate(length(max = 50000))]
    pub case_context: Option<String>,

    #[serde(default = "default_use_retrieval")]
    pub use_retrieval: bool,

    /// `parallel` (default) or `sequential`
    #[serde(default)]
    pub mode: ExecutionMode,
}

fn default_use_retrieval() -> bool {
    true
}

/// Red-team request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedTeamBody {
    #[validate(length(min = 1, max = 10000))]
    pub plan: String,

    #[validate(length(max = 50000))]
    pub case_context: Option<String>,

    pub case_id: Option<String>,
}

/// Quick analysis request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuickBody {
    #[validate(length(min = 1, max = 10000))]
    pub query: String,

    #[validate(length(max = 50000))]
    pub case_context: Option<String>,
}

#[derive(Serialize)]
pub struct RolesResponse {
    pub roles: Vec<AgentRole>,
}

/// Run the requested roles and synthesize
pub async fn run_analysis(
    State(state): State<AppState>,
    Json(body): Json<AnalysisBody>,
) -> Result<Json<AnalysisReport>> {
    validate(&body)?;

    let roles = body
        .roles
        .iter()
        .map(|r| r.parse::<RoleId>())
        .collect::<Result<Vec<_>>>()?;

    let report = state
        .engine
        .run_analysis(AnalysisRequest {
            query: body.query,
            roles,
            case_id: body.case_id,
            case_context: body.case_context,
            use_retrieval: body.use_retrieval,
            mode: body.mode,
        })
        .await?;

    Ok(Json(report))
}

/// Stress-test a defense plan
pub async fn red_team(
    State(state): State<AppState>,
    Json(body): Json<RedTeamBody>,
) -> Result<Json<AnalysisReport>> {
    validate(&body)?;
    let report = state
        .engine
        .run_red_team(&body.plan, body.case_context, body.case_id)
        .await?;
    Ok(Json(report))
}

/// Prosecution, defense and verdict in one call
pub async fn quick(
    State(state): State<AppState>,
    Json(body): Json<QuickBody>,
) -> Result<Json<QuickAnalysis>> {
    validate(&body)?;
    let quick = state.engine.quick_analysis(&body.query, body.case_context).await?;
    Ok(Json(quick))
}

/// Every built-in role and the provider it calls
pub async fn list_roles(State(state): State<AppState>) -> Json<RolesResponse> {
    Json(RolesResponse {
        roles: state.engine.list_roles().to_vec(),
    })
}
