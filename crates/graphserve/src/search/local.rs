//! Local search: one answer call over the mixed graph-neighbourhood
//! context.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::context::{ConversationTurn, LocalContextBuilder};
use crate::error::Result;
use crate::llm::{ChatModel, GenerateParams};
use crate::prompts::LOCAL_SEARCH_SYSTEM_PROMPT;
use crate::search::{SearchEngine, SearchResult};
use crate::tokens::TokenCounter;

/// Generation parameters for the local engine.
#[derive(Debug, Clone)]
pub struct LocalSearchParams {
    /// Completion token cap for the answer call.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Requested answer shape, substituted into the prompt.
    pub response_type: String,
}

impl Default for LocalSearchParams {
    fn default() -> Self {
        Self {
            max_tokens: 2_000,
            temperature: 0.0,
            response_type: "multiple paragraphs".to_string(),
        }
    }
}

/// Answers a query from the graph neighbourhood of its nearest entities.
pub struct LocalSearch {
    context_builder: LocalContextBuilder,
    model: Arc<dyn ChatModel>,
    counter: TokenCounter,
    params: LocalSearchParams,
}

impl LocalSearch {
    pub fn new(
        context_builder: LocalContextBuilder,
        model: Arc<dyn ChatModel>,
        counter: TokenCounter,
        params: LocalSearchParams,
    ) -> Self {
        Self {
            context_builder,
            model,
            counter,
            params,
        }
    }

    /// Search with prior conversation turns feeding the context builder.
    pub async fn asearch_with_history(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<SearchResult> {
        let context = self.context_builder.build(query, history).await?;
        let system = LOCAL_SEARCH_SYSTEM_PROMPT
            .replace("{context_data}", &context.text)
            .replace("{response_type}", &self.params.response_type);
        let generate = GenerateParams {
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            json_mode: false,
        };
        let response = self.model.generate(&system, query, &generate).await?;
        let context_tokens = self.counter.count(&context.text);
        info!(
            entities = context.entity_ids.len(),
            context_tokens, "local search complete"
        );
        Ok(SearchResult {
            response,
            llm_calls: 1,
            context_tokens,
        })
    }
}

#[async_trait]
impl SearchEngine for LocalSearch {
    async fn asearch(&self, query: &str) -> Result<SearchResult> {
        self.asearch_with_history(query, &[]).await
    }
}
