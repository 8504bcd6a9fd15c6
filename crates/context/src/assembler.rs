//! Context assembly
//!
//! Turns ranked search results into a citation-annotated block of text that
//! fits a character budget, and wraps it with grounding instructions for a
//! system prompt.

use cocounsel_common::errors::Result;
use cocounsel_common::models::SearchResult;
use cocounsel_search::{Retriever, SearchOptions};
use serde::Serialize;
use std::sync::Arc;

/// Default character budget for rendered context
pub const DEFAULT_CONTEXT_BUDGET: usize = 4000;

/// Search results plus their rendered, budget-bounded view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalContext {
    pub query: String,
    pub results: Vec<SearchResult>,
    /// Derived from `results`; never longer than the budget it was built with
    pub rendered_text: String,
}

impl RetrievalContext {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
            rendered_text: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rendered_text.is_empty()
    }
}

/// Builds [`RetrievalContext`] values over a retriever
#[derive(Clone)]
pub struct ContextAssembler {
    retriever: Arc<dyn Retriever>,
    budget: usize,
}

impl ContextAssembler {
    pub fn new(retriever: Arc<dyn Retriever>, budget: usize) -> Self {
        Self { retriever, budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Search, then render the best results that fit the budget
    #[tracing::instrument(skip(self, options), fields(budget = self.budget))]
    pub async fn build_context(&self, query: &str, options: &SearchOptions) -> Result<RetrievalContext> {
        let results = self.retriever.retrieve(query, options).await?;
        let rendered_text = render_context(&results, self.budget);

        tracing::debug!(
            results = results.len(),
            rendered_chars = rendered_text.chars().count(),
            "Assembled retrieval context"
        );

        Ok(RetrievalContext {
            query: query.to_string(),
            results,
            rendered_text,
        })
    }
}

/// Append one block per result, best first, stopping at the first block
/// that would overrun `budget` characters. Blocks are never cut.
pub fn render_context(results: &[SearchResult], budget: usize) -> String {
    let mut rendered = String::new();
    let mut used = 0;

    for result in results {
        let block = format!("\n---\n[{}]\n{}\n", result.chunk.citation_label(), result.chunk.text);
        let len = block.chars().count();
        if used + len > budget {
            break;
        }
        rendered.push_str(&block);
        used += len;
    }

    rendered
}

/// Grounding instructions around the rendered context, or an empty string
/// when there is no context
pub fn system_prompt_addendum(context: &RetrievalContext) -> String {
    if context.is_empty() {
        return String::new();
    }

    format!(
        "\nRELEVANT CONTEXT FROM KNOWLEDGE BASE:\n{}\n\nINSTRUCTIONS:\n\
         - Use the above context to inform your response\n\
         - Cite sources when referencing specific information from context\n\
         - If the context doesn't contain relevant information, say it was not found in context\n\
         - Do not make up information not present in the context\n",
        context.rendered_text
    )
}
