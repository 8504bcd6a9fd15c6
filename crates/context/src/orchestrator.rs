//! Agent orchestration
//!
//! One run fans out a provider call per requested role, all at once (or one
//! after another in sequential mode), and waits for every call to reach a
//! terminal state. Each call has its own
//! deadline. A failed or timed-out role becomes a low-confidence stub and
//! never cancels or delays its siblings. Results come back in request
//! order whatever the completion order was.

use crate::agents::{AgentRole, RoleId, RoleRegistry};
use crate::annotate::{annotate, Confidence};
use crate::assembler::{system_prompt_addendum, RetrievalContext};
use cocounsel_common::errors::AppError;
use cocounsel_common::llm::{CompletionOptions, Message, ProviderRegistry};
use cocounsel_common::metrics;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// How a run schedules its role calls
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Parallel,
    /// One role at a time, in request order
    Sequential,
}

/// Terminal state of one role's call
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Succeeded,
    Failed,
}

/// One role's analysis. Built once, never updated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAnalysis {
    pub role: RoleId,
    pub agent_name: String,
    /// Model output verbatim, or a placeholder for a failed call
    pub raw_text: String,
    pub key_points: Vec<String>,
    pub recommendations: Vec<String>,
    pub risks: Vec<String>,
    pub citations: Vec<String>,
    pub confidence: Confidence,
    pub status: AnalysisStatus,
    /// Provider that answered, or the one that was tried
    pub provider_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentAnalysis {
    pub fn succeeded(&self) -> bool {
        self.status == AnalysisStatus::Succeeded
    }

    fn failed(role: RoleId, agent_name: &str, provider_id: &str, latency_ms: u64, error: &AppError) -> Self {
        Self {
            role,
            agent_name: agent_name.to_string(),
            raw_text: format!("Analysis unavailable: {error}"),
            key_points: Vec::new(),
            recommendations: Vec::new(),
            risks: Vec::new(),
            citations: Vec::new(),
            confidence: Confidence::Low,
            status: AnalysisStatus::Failed,
            provider_id: provider_id.to_string(),
            model_id: None,
            latency_ms,
            error: Some(error.to_string()),
        }
    }
}

/// Fans a query out to roles
#[derive(Clone)]
pub struct Orchestrator {
    providers: ProviderRegistry,
    roles: RoleRegistry,
    role_timeout: Duration,
}

impl Orchestrator {
    pub fn new(providers: ProviderRegistry, roles: RoleRegistry, role_timeout: Duration) -> Self {
        Self {
            providers,
            roles,
            role_timeout,
        }
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn role_timeout(&self) -> Duration {
        self.role_timeout
    }

    /// Run every role; exactly one analysis per requested role, in request order
    #[tracing::instrument(skip_all, fields(roles = roles.len(), mode = ?mode))]
    pub async fn run(
        &self,
        query: &str,
        roles: &[RoleId],
        case_context: Option<&str>,
        retrieval: Option<&RetrievalContext>,
        mode: ExecutionMode,
    ) -> Vec<AgentAnalysis> {
        let analyses = match mode {
            ExecutionMode::Parallel => {
                let calls = roles
                    .iter()
                    .map(|&id| self.run_role(id, query, case_context, retrieval));
                join_all(calls).await
            }
            ExecutionMode::Sequential => {
                let mut analyses = Vec::with_capacity(roles.len());
                for &id in roles {
                    analyses.push(self.run_role(id, query, case_context, retrieval).await);
                }
                analyses
            }
        };

        let failed = analyses.iter().filter(|a| !a.succeeded()).count();
        tracing::info!(roles = analyses.len(), failed, "Orchestration run complete");

        analyses
    }

    async fn run_role(
        &self,
        id: RoleId,
        query: &str,
        case_context: Option<&str>,
        retrieval: Option<&RetrievalContext>,
    ) -> AgentAnalysis {
        let start = Instant::now();

        let Some(role) = self.roles.get(id) else {
            let err = AppError::NotFound {
                resource_type: "role".to_string(),
                id: id.to_string(),
            };
            metrics::record_agent_run(id.as_str(), "failed");
            return AgentAnalysis::failed(id, id.as_str(), "", 0, &err);
        };

        let messages = [
            Message::system(build_system_prompt(role, retrieval, case_context)),
            Message::user(query),
        ];
        let options = CompletionOptions::default()
            .with_task("analysis")
            .with_timeout(self.role_timeout);

        let result = self.providers.call(&role.provider_id, &messages, &options).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                metrics::record_agent_run(id.as_str(), "succeeded");
                let notes = annotate(&response.text);
                AgentAnalysis {
                    role: id,
                    agent_name: role.name.clone(),
                    key_points: notes.key_points,
                    recommendations: notes.recommendations,
                    risks: notes.risks,
                    citations: notes.citations,
                    confidence: notes.confidence,
                    status: AnalysisStatus::Succeeded,
                    provider_id: response.provider_id,
                    model_id: Some(response.model_id),
                    latency_ms,
                    error: None,
                    raw_text: response.text,
                }
            }
            Err(e) => {
                let outcome = if matches!(e, AppError::ProviderTimeout { .. }) {
                    "timeout"
                } else {
                    "failed"
                };
                metrics::record_agent_run(id.as_str(), outcome);
                tracing::warn!(
                    role = %id,
                    provider = %role.provider_id,
                    error = %e,
                    "Role analysis failed, using stub"
                );
                AgentAnalysis::failed(id, &role.name, &role.provider_id, latency_ms, &e)
            }
        }
    }
}

/// Persona prompt, then grounding addendum, then case context
pub fn build_system_prompt(
    role: &AgentRole,
    retrieval: Option<&RetrievalContext>,
    case_context: Option<&str>,
) -> String {
    let mut prompt = role.system_prompt.clone();

    if let Some(ctx) = retrieval.filter(|c| !c.is_empty()) {
        prompt.push_str("\n\n");
        prompt.push_str(&system_prompt_addendum(ctx));
    }

    if let Some(case) = case_context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nCASE CONTEXT:\n");
        prompt.push_str(case);
    }

    prompt
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use cocounsel_common::errors::Result;
    use cocounsel_common::llm::{ProviderClient, ProviderResponse};
    use std::sync::{Arc, Mutex};

    /// Provider double: fixed reply after a delay, or a failure
    pub(crate) struct ScriptedClient {
        pub id: String,
        pub reply: Option<String>,
        pub delay: Duration,
        pub seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedClient {
        pub fn ok(id: &str, reply: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                reply: Some(reply.to_string()),
                delay,
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                reply: None,
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn hanging(id: &str) -> Arc<Self> {
            Self::ok(id, "too late", Duration::from_secs(3600))
        }
    }

    #[async_trait]
    impl ProviderClient for ScriptedClient {
        fn id(&self) -> &str {
            &self.id
        }

        fn model(&self) -> &str {
            "scripted"
        }

        fn transport(&self) -> &'static str {
            "direct"
        }

        async fn complete(&self, messages: &[Message], _options: &CompletionOptions) -> Result<ProviderResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Some(text) => Ok(ProviderResponse {
                    text: text.clone(),
                    provider_id: self.id.clone(),
                    model_id: "scripted".to_string(),
                    latency_ms: self.delay.as_millis() as u64,
                }),
                None => Err(AppError::ProviderUnavailable {
                    provider: self.id.clone(),
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    fn orchestrator(clients: Vec<Arc<ScriptedClient>>, roles: RoleRegistry, timeout: Duration) -> Orchestrator {
        let mut providers = ProviderRegistry::new();
        for client in clients {
            providers.register(client);
        }
        Orchestrator::new(providers, roles, timeout)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_role_times_out_alone() {
        let roles = RoleRegistry::default()
            .with_provider(RoleId::Prosecutor, "p1")
            .with_provider(RoleId::Defense, "p2")
            .with_provider(RoleId::Judge, "p3")
            .with_provider(RoleId::Analyst, "p4");
        let orch = orchestrator(
            vec![
                ScriptedClient::ok("p1", "- strong case", Duration::from_secs(2)),
                ScriptedClient::hanging("p2"),
                ScriptedClient::ok("p3", "unclear ruling", Duration::from_secs(5)),
                ScriptedClient::ok("p4", "plan", Duration::from_secs(3)),
            ],
            roles,
            Duration::from_secs(10),
        );

        let start = Instant::now();
        let analyses = orch
            .run("assess the plea", &RoleId::DEFAULT_SET, None, None, ExecutionMode::Parallel)
            .await;
        let elapsed = start.elapsed();

        assert_eq!(analyses.len(), 4);
        let order: Vec<RoleId> = analyses.iter().map(|a| a.role).collect();
        assert_eq!(order, RoleId::DEFAULT_SET);

        assert_eq!(analyses[1].confidence, Confidence::Low);
        assert_eq!(analyses[1].status, AnalysisStatus::Failed);
        assert!(analyses[1].raw_text.starts_with("Analysis unavailable:"));
        assert_eq!(analyses[1].provider_id, "p2");

        assert!(analyses[0].succeeded());
        assert_eq!(analyses[0].confidence, Confidence::High);
        assert_eq!(analyses[0].key_points, vec!["strong case"]);
        assert_eq!(analyses[2].confidence, Confidence::Low);
        assert!(analyses[2].succeeded());
        assert_eq!(analyses[3].confidence, Confidence::Medium);

        // bounded by the one deadline, not the sum of the calls
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(11), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slowest_role_sets_the_pace() {
        let roles = RoleRegistry::default()
            .with_provider(RoleId::Prosecutor, "a")
            .with_provider(RoleId::Defense, "b");
        let orch = orchestrator(
            vec![
                ScriptedClient::ok("a", "one", Duration::from_secs(4)),
                ScriptedClient::ok("b", "two", Duration::from_secs(6)),
            ],
            roles,
            Duration::from_secs(90),
        );

        let start = Instant::now();
        let analyses = orch
            .run("q", &[RoleId::Prosecutor, RoleId::Defense], None, None, ExecutionMode::Parallel)
            .await;
        let elapsed = start.elapsed();

        assert!(analyses.iter().all(AgentAnalysis::succeeded));
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed < Duration::from_secs(7), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_mode_runs_one_role_at_a_time() {
        let roles = RoleRegistry::default()
            .with_provider(RoleId::Prosecutor, "a")
            .with_provider(RoleId::Defense, "b")
            .with_provider(RoleId::Judge, "c");
        let orch = orchestrator(
            vec![
                ScriptedClient::ok("a", "one", Duration::from_secs(4)),
                ScriptedClient::failing("b"),
                ScriptedClient::ok("c", "three", Duration::from_secs(6)),
            ],
            roles,
            Duration::from_secs(90),
        );

        let start = Instant::now();
        let analyses = orch
            .run("q", &RoleId::QUICK, None, None, ExecutionMode::Sequential)
            .await;
        let elapsed = start.elapsed();

        let order: Vec<RoleId> = analyses.iter().map(|a| a.role).collect();
        assert_eq!(order, RoleId::QUICK);
        assert!(analyses[0].succeeded());
        assert!(!analyses[1].succeeded());
        assert_eq!(analyses[2].raw_text, "three");
        // the calls add up instead of overlapping
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(11), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_unknown_provider_becomes_stub() {
        let roles = RoleRegistry::default().with_provider(RoleId::Scholar, "nowhere");
        let orch = orchestrator(vec![], roles, Duration::from_secs(1));

        let analyses = orch.run("q", &[RoleId::Scholar], None, None, ExecutionMode::Parallel).await;
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].confidence, Confidence::Low);
        assert!(analyses[0].error.as_deref().unwrap().contains("nowhere"));
    }

    #[tokio::test]
    async fn test_prompt_layers_reach_provider() {
        let client = ScriptedClient::ok("p", "ok", Duration::ZERO);
        let roles = RoleRegistry::default().with_provider(RoleId::Judge, "p");
        let orch = orchestrator(vec![client.clone()], roles, Duration::from_secs(1));

        let retrieval = RetrievalContext {
            query: "q".into(),
            results: vec![],
            rendered_text: "\n---\n[CPL 30.30]\nSpeedy trial.\n".into(),
        };
        orch.run(
            "the question",
            &[RoleId::Judge],
            Some("Client charged with burglary."),
            Some(&retrieval),
            ExecutionMode::Parallel,
        )
        .await;

        let seen = client.seen.lock().unwrap();
        let system = &seen[0][0].content;
        assert!(system.starts_with("You are an experienced New York State judge"));
        let addendum_at = system.find("RELEVANT CONTEXT FROM KNOWLEDGE BASE").unwrap();
        let case_at = system.find("CASE CONTEXT:\nClient charged with burglary.").unwrap();
        assert!(addendum_at < case_at);
        assert_eq!(seen[0][1].content, "the question");
    }

    #[test]
    fn test_prompt_without_context_is_persona() {
        let registry = RoleRegistry::default();
        let role = registry.get(RoleId::Defense).unwrap();
        let empty = RetrievalContext::empty("q");
        assert_eq!(build_system_prompt(role, Some(&empty), Some("  ")), role.system_prompt);
    }
}
