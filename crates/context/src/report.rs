//! Externally returned artifacts

use crate::assembler::RetrievalContext;
use crate::orchestrator::AgentAnalysis;
use crate::synthesizer::Synthesis;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Result of one orchestration run. One analysis per requested role, in
/// request order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub report_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub analyses: Vec<AgentAnalysis>,
    pub synthesis_summary: String,
    pub action_items: Vec<String>,
    /// True when the summary came from the fallback path
    pub synthesis_degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_context: Option<RetrievalContext>,
}

impl AnalysisReport {
    pub fn new(
        query: impl Into<String>,
        case_id: Option<String>,
        analyses: Vec<AgentAnalysis>,
        synthesis: Synthesis,
        retrieval_context: Option<RetrievalContext>,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            case_id,
            query: query.into(),
            timestamp: Utc::now(),
            analyses,
            synthesis_summary: synthesis.summary,
            action_items: synthesis.action_items,
            synthesis_degraded: synthesis.degraded,
            retrieval_context,
        }
    }

    pub fn failed_roles(&self) -> usize {
        self.analyses.iter().filter(|a| !a.succeeded()).count()
    }
}

/// Prosecution and defense views plus the synthesized verdict
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuickAnalysis {
    pub prosecution: String,
    pub defense: String,
    pub verdict: String,
}

/// Grounded single-provider answer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub text: String,
    pub provider_id: String,
    pub model_id: String,
    pub latency_ms: u64,
    pub context: RetrievalContext,
}

/// Case-document search hit
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHit {
    pub text: String,
    pub score: f32,
    pub document_id: String,
}
