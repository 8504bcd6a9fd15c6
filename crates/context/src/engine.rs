//! Engine facade
//!
//! [`AnalysisEngine`] wires the index, retriever, indexer, orchestrator and
//! synthesizer together and is the one value callers hold.

use crate::agents::{AgentRole, RoleId, RoleRegistry};
use crate::assembler::{system_prompt_addendum, ContextAssembler, RetrievalContext};
use crate::orchestrator::{ExecutionMode, Orchestrator};
use crate::report::{AnalysisReport, AskResponse, DocumentHit, QuickAnalysis};
use crate::synthesizer::Synthesizer;
use cocounsel_common::config::{AppConfig, RetrievalConfig};
use cocounsel_common::embeddings::{create_embedder, ResilientEmbedder};
use cocounsel_common::errors::{AppError, Result};
use cocounsel_common::llm::{CompletionOptions, Message, ProviderRegistry};
use cocounsel_common::models::{Chunk, SearchResult, SourceKind};
use cocounsel_ingestion::{
    CaseDocumentInput, CaseLawInput, ChunkingConfig, DocumentIndexer, DocumentInput, StatuteInput,
};
use cocounsel_search::{ChunkFilter, ChunkStore, Retriever, SearchOptions, VectorIndex, VectorRetriever};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

const ASK_SYSTEM_PROMPT: &str = "You are Assigned Co-Counsel AI, a legal assistant for assigned counsel attorneys, public defenders, and court-appointed lawyers.

Guidelines:
- Be concise and professional
- Use proper legal terminology
- Always note that attorneys should verify citations and legal advice
- Format responses clearly with headers and bullet points when appropriate";

/// Parameters of one analysis run
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub query: String,
    /// Empty means the default set
    #[serde(default)]
    pub roles: Vec<RoleId>,
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub case_context: Option<String>,
    #[serde(default = "default_use_retrieval")]
    pub use_retrieval: bool,
    #[serde(default)]
    pub mode: ExecutionMode,
}

fn default_use_retrieval() -> bool {
    true
}

impl AnalysisRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            roles: Vec::new(),
            case_id: None,
            case_context: None,
            use_retrieval: true,
            mode: ExecutionMode::Parallel,
        }
    }

    pub fn with_roles(mut self, roles: &[RoleId]) -> Self {
        self.roles = roles.to_vec();
        self
    }

    pub fn for_case(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = Some(case_id.into());
        self
    }

    pub fn with_case_context(mut self, context: impl Into<String>) -> Self {
        self.case_context = Some(context.into());
        self
    }

    pub fn without_retrieval(mut self) -> Self {
        self.use_retrieval = false;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.mode = ExecutionMode::Sequential;
        self
    }
}

/// Query wrapper asking the roles to attack a defense plan
pub fn red_team_query(plan: &str) -> String {
    format!(
        "RED TEAM ANALYSIS REQUEST:

The defense is planning the following approach:
{plan}

Your job is to attack this plan. Find every weakness, every flaw, every way it could fail.
What will the prosecutor do to counter this? What will the judge reject?
How might the jury react negatively?

Be ruthless in your criticism. The goal is to make the defense plan stronger by identifying weaknesses now."
    )
}

/// Retrieval and multi-perspective analysis over one vector index
pub struct AnalysisEngine {
    retrieval: RetrievalConfig,
    fallback_order: Vec<String>,
    role_timeout: Duration,
    index: Arc<VectorIndex>,
    retriever: Arc<VectorRetriever>,
    assembler: ContextAssembler,
    indexer: DocumentIndexer,
    orchestrator: Orchestrator,
    synthesizer: Synthesizer,
    store: Option<Arc<dyn ChunkStore>>,
}

impl AnalysisEngine {
    /// Assemble an engine from explicit parts
    pub fn new(
        config: &AppConfig,
        index: Arc<VectorIndex>,
        embedder: Arc<ResilientEmbedder>,
        providers: ProviderRegistry,
    ) -> Result<Self> {
        if embedder.dimension() != index.dimension() {
            return Err(AppError::Configuration {
                message: format!(
                    "embedder produces {}-dimensional vectors but the index holds {}",
                    embedder.dimension(),
                    index.dimension()
                ),
            });
        }

        let chunking = ChunkingConfig::from_retrieval(&config.retrieval)?;
        let role_timeout = config.role_timeout();
        let retriever = Arc::new(VectorRetriever::new(index.clone(), embedder.clone()));
        let assembler = ContextAssembler::new(retriever.clone(), config.retrieval.max_context_chars);
        let roles = RoleRegistry::from_config(&config.orchestration);

        Ok(Self {
            retrieval: config.retrieval.clone(),
            fallback_order: config.orchestration.fallback_order.clone(),
            role_timeout,
            indexer: DocumentIndexer::new(index.clone(), embedder, chunking),
            orchestrator: Orchestrator::new(providers.clone(), roles, role_timeout),
            synthesizer: Synthesizer::new(providers, config.orchestration.synthesis_provider.clone(), role_timeout),
            index,
            retriever,
            assembler,
            store: None,
        })
    }

    /// Embedder, empty index and providers all built from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder = Arc::new(create_embedder(&config.embedding));
        let index = Arc::new(VectorIndex::new(config.embedding.dimension));
        let providers = ProviderRegistry::from_config(&config.providers)?;

        info!(
            embedding_dimension = config.embedding.dimension,
            local_embeddings_only = embedder.is_degraded_only(),
            providers = ?providers.provider_ids(),
            "Analysis engine configured"
        );

        Self::new(config, index, embedder, providers)
    }

    /// Persist indexed chunks to `store` and allow hydrating from it
    pub fn with_store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.indexer = self.indexer.with_store(store.clone());
        self.store = Some(store);
        self
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn providers(&self) -> &ProviderRegistry {
        self.orchestrator.providers()
    }

    /// Search defaults from configuration
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions::from_config(&self.retrieval)
    }

    // Retrieval

    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        self.retriever.retrieve(query, options).await
    }

    /// Case-document search returning text, score and document id
    pub async fn search_documents(
        &self,
        query: &str,
        case_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DocumentHit>> {
        let mut options = self
            .search_options()
            .with_source_kinds(vec![SourceKind::Document])
            .with_top_k(limit);
        options.case_id = case_id.map(str::to_string);

        Ok(self
            .search(query, &options)
            .await?
            .into_iter()
            .map(|r| DocumentHit {
                text: r.chunk.text,
                score: r.score,
                document_id: r.chunk.source_document_id,
            })
            .collect())
    }

    pub async fn build_context(&self, query: &str, options: &SearchOptions) -> Result<RetrievalContext> {
        self.assembler.build_context(query, options).await
    }

    /// Grounded answer from the first provider in the fallback order that
    /// responds
    #[instrument(skip(self, options))]
    pub async fn ask(&self, query: &str, options: &SearchOptions) -> Result<AskResponse> {
        require_text(query, "query")?;

        let context = self.build_context(query, options).await?;
        let addendum = system_prompt_addendum(&context);
        let system = if addendum.is_empty() {
            ASK_SYSTEM_PROMPT.to_string()
        } else {
            format!("{ASK_SYSTEM_PROMPT}\n\n{addendum}")
        };

        let messages = [Message::system(system), Message::user(query)];
        let completion = CompletionOptions::default()
            .with_task("chat")
            .with_timeout(self.role_timeout);
        let response = self
            .providers()
            .call_with_fallback(&self.fallback_order, &messages, &completion)
            .await?;

        Ok(AskResponse {
            text: response.text,
            provider_id: response.provider_id,
            model_id: response.model_id,
            latency_ms: response.latency_ms,
            context,
        })
    }

    // Analysis

    /// Run the requested roles and synthesize. Only a retrieval failure
    /// surfaces as an error; provider and synthesis failures degrade.
    pub async fn run_analysis(&self, request: AnalysisRequest) -> Result<AnalysisReport> {
        let retrieval_query = request.query.clone();
        self.analyze(request, &retrieval_query).await
    }

    /// Prosecutor, judge and jury analyst attack a defense plan
    pub async fn run_red_team(
        &self,
        plan: &str,
        case_context: Option<String>,
        case_id: Option<String>,
    ) -> Result<AnalysisReport> {
        require_text(plan, "plan")?;

        let request = AnalysisRequest {
            query: red_team_query(plan),
            roles: RoleId::RED_TEAM.to_vec(),
            case_id,
            case_context,
            use_retrieval: true,
            mode: ExecutionMode::Parallel,
        };
        self.analyze(request, plan).await
    }

    /// Prosecution, defense and the synthesized verdict
    pub async fn quick_analysis(&self, query: &str, case_context: Option<String>) -> Result<QuickAnalysis> {
        let mut request = AnalysisRequest::new(query).with_roles(&RoleId::QUICK);
        request.case_context = case_context;
        let report = self.run_analysis(request).await?;

        let text_for = |role: RoleId| {
            report
                .analyses
                .iter()
                .find(|a| a.role == role)
                .map(|a| a.raw_text.clone())
                .unwrap_or_default()
        };

        Ok(QuickAnalysis {
            prosecution: text_for(RoleId::Prosecutor),
            defense: text_for(RoleId::Defense),
            verdict: report.synthesis_summary.clone(),
        })
    }

    #[instrument(skip(self, request, retrieval_query), fields(case_id = ?request.case_id, roles = request.roles.len()))]
    async fn analyze(&self, request: AnalysisRequest, retrieval_query: &str) -> Result<AnalysisReport> {
        require_text(&request.query, "query")?;

        let roles = if request.roles.is_empty() {
            RoleId::DEFAULT_SET.to_vec()
        } else {
            request.roles
        };

        let retrieval = if request.use_retrieval {
            let mut options = self.search_options();
            options.case_id = request.case_id.clone();
            Some(self.build_context(retrieval_query, &options).await?)
        } else {
            None
        };

        let analyses = self
            .orchestrator
            .run(
                &request.query,
                &roles,
                request.case_context.as_deref(),
                retrieval.as_ref(),
                request.mode,
            )
            .await;
        let synthesis = self.synthesizer.synthesize(&request.query, &analyses).await;

        let report = AnalysisReport::new(request.query, request.case_id, analyses, synthesis, retrieval);
        info!(
            report_id = %report.report_id,
            failed_roles = report.failed_roles(),
            synthesis_degraded = report.synthesis_degraded,
            "Analysis report ready"
        );
        Ok(report)
    }

    // Roles

    pub fn list_roles(&self) -> &[AgentRole] {
        self.orchestrator.roles().list()
    }

    pub fn role(&self, id: RoleId) -> Option<&AgentRole> {
        self.orchestrator.roles().get(id)
    }

    // Indexing

    pub async fn index_document(&self, input: DocumentInput) -> Result<Vec<Chunk>> {
        Ok(self.indexer.index_document(input).await?)
    }

    pub async fn index_case_law(&self, input: CaseLawInput) -> Result<Vec<Chunk>> {
        Ok(self.indexer.index_case_law(input).await?)
    }

    pub async fn index_statute(&self, input: StatuteInput) -> Result<Vec<Chunk>> {
        Ok(self.indexer.index_statute(input).await?)
    }

    pub async fn index_wiki_entry(&self, entry_id: &str, title: &str, content: &str) -> Result<Vec<Chunk>> {
        Ok(self.indexer.index_wiki_entry(entry_id, title, content).await?)
    }

    pub async fn index_case_document(&self, input: CaseDocumentInput) -> Result<usize> {
        Ok(self.indexer.index_case_document(input).await?)
    }

    /// Drop a document from the index, then from the store
    pub async fn remove_document(&self, document_id: &str) -> Result<usize> {
        let removed = self.index.remove_document(document_id)?;
        if let Some(store) = &self.store {
            if let Err(e) = store.delete_document(document_id).await {
                warn!(document_id, error = %e, "Failed to delete document from store");
            }
        }
        Ok(removed)
    }

    /// Load persisted chunks into the index; zero without a store
    pub async fn hydrate(&self, filter: &ChunkFilter) -> Result<usize> {
        match &self.store {
            Some(store) => self.index.hydrate(store.as_ref(), filter).await,
            None => Ok(0),
        }
    }
}

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation {
            message: format!("{field} must not be empty"),
            field: Some(field.to_string()),
        });
    }
    Ok(())
}
