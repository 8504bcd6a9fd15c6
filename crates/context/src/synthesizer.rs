//! Synthesis of several role analyses into one summary and action list
//!
//! Never fails from the caller's point of view: a failed call or a reply
//! without the expected headings falls back to a fixed summary and action
//! items pooled from the analyses themselves.

use crate::orchestrator::AgentAnalysis;
use cocounsel_common::errors::{AppError, Result};
use cocounsel_common::llm::{CompletionOptions, Message, ProviderRegistry};
use cocounsel_common::metrics;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Summary used whenever synthesis falls back
pub const SYNTHESIS_UNAVAILABLE: &str = "Synthesis unavailable";

const SYNTHESIS_HEADING: &str = "## Synthesis";
const ACTION_ITEMS_HEADING: &str = "## Action Items";
const MAX_POOLED_ITEMS: usize = 5;
const MAX_ACTION_ITEMS: usize = 10;

const SYSTEM_PROMPT: &str = "You are a legal strategist synthesizing expert analyses.";

/// Merged outcome of one orchestration run
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Synthesis {
    pub summary: String,
    pub action_items: Vec<String>,
    /// True when the summary is the fallback
    pub degraded: bool,
}

impl Synthesis {
    /// Fixed summary plus up to five items pooled from the analyses, bullets
    /// first, then numbered recommendations
    pub fn fallback(analyses: &[AgentAnalysis]) -> Self {
        let mut items: Vec<String> = Vec::new();
        let pooled = analyses
            .iter()
            .flat_map(|a| a.key_points.iter())
            .chain(analyses.iter().flat_map(|a| a.recommendations.iter()));
        for item in pooled {
            if items.len() == MAX_POOLED_ITEMS {
                break;
            }
            if !items.contains(item) {
                items.push(item.clone());
            }
        }

        Self {
            summary: SYNTHESIS_UNAVAILABLE.to_string(),
            action_items: items,
            degraded: true,
        }
    }
}

/// Issues the synthesis call
#[derive(Clone)]
pub struct Synthesizer {
    providers: ProviderRegistry,
    provider_id: String,
    timeout: Duration,
}

impl Synthesizer {
    pub fn new(providers: ProviderRegistry, provider_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            providers,
            provider_id: provider_id.into(),
            timeout,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Synthesize, falling back on any failure
    #[tracing::instrument(skip_all, fields(analyses = analyses.len(), provider = %self.provider_id))]
    pub async fn synthesize(&self, query: &str, analyses: &[AgentAnalysis]) -> Synthesis {
        let start = Instant::now();

        let synthesis = match self.try_synthesize(query, analyses).await {
            Ok(synthesis) => synthesis,
            Err(e) => {
                tracing::warn!(error = %e, "Synthesis failed, pooling analysis items");
                Synthesis::fallback(analyses)
            }
        };

        metrics::record_synthesis(start.elapsed().as_secs_f64(), !synthesis.degraded);
        synthesis
    }

    /// One synthesis call. Errors are `SynthesisUnavailable`.
    pub async fn try_synthesize(&self, query: &str, analyses: &[AgentAnalysis]) -> Result<Synthesis> {
        if !analyses.iter().any(AgentAnalysis::succeeded) {
            return Err(AppError::SynthesisUnavailable {
                message: "no role produced an analysis".to_string(),
            });
        }

        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(build_prompt(query, analyses)),
        ];
        let options = CompletionOptions::default()
            .with_task("synthesis")
            .with_timeout(self.timeout);

        let response = self
            .providers
            .call(&self.provider_id, &messages, &options)
            .await
            .map_err(|e| AppError::SynthesisUnavailable { message: e.to_string() })?;

        let (summary, mut action_items) =
            parse_synthesis(&response.text).ok_or_else(|| AppError::SynthesisUnavailable {
                message: "reply has neither synthesis nor action item headings".to_string(),
            })?;

        if action_items.is_empty() {
            action_items = Synthesis::fallback(analyses).action_items;
        }

        Ok(Synthesis {
            summary,
            action_items,
            degraded: false,
        })
    }
}

/// Every analysis labeled by agent and role, then the two-part format request
pub fn build_prompt(query: &str, analyses: &[AgentAnalysis]) -> String {
    let analysis_text = analyses
        .iter()
        .map(|a| format!("## {} ({})\n{}", a.agent_name, a.role, a.raw_text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "You are synthesizing multiple expert analyses of a legal case.

ORIGINAL QUERY: {query}

EXPERT ANALYSES:
{analysis_text}

Please provide:
1. A concise synthesis (2-3 paragraphs) of the key insights from all perspectives
2. A prioritized list of 5-7 specific action items based on the analyses

Format your response as:
{SYNTHESIS_HEADING}
[Your synthesis here]

{ACTION_ITEMS_HEADING}
1. [First action item]
2. [Second action item]
..."
    )
}

/// Split a reply on the action-items heading.
///
/// `None` without a synthesis heading or when the summary comes out empty.
/// Anything before the synthesis heading is dropped.
pub fn parse_synthesis(text: &str) -> Option<(String, Vec<String>)> {
    let (_, body) = text.split_once(SYNTHESIS_HEADING)?;

    let (head, tail) = body.split_once(ACTION_ITEMS_HEADING).unwrap_or((body, ""));
    let summary = head.trim().to_string();
    if summary.is_empty() {
        return None;
    }

    let action_items = tail
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let digits = line.chars().take_while(char::is_ascii_digit).count();
            let rest = line[digits..].strip_prefix('.')?;
            (digits > 0).then(|| rest.trim().to_string())
        })
        .filter(|item| !item.is_empty())
        .take(MAX_ACTION_ITEMS)
        .collect();

    Some((summary, action_items))
}
