//! The search engine boundary.
//!
//! Engines are built once at startup and shared behind
//! `Arc<dyn SearchEngine>`; the HTTP layer only ever calls [`SearchEngine::asearch`].

pub mod global;
pub mod local;

use async_trait::async_trait;

use crate::error::Result;

pub use global::{GlobalSearch, GlobalSearchParams};
pub use local::{LocalSearch, LocalSearchParams};

/// Outcome of one search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The generated answer text.
    pub response: String,
    /// Number of chat completions the search issued.
    pub llm_calls: usize,
    /// Tokens of context the search put in front of the model.
    pub context_tokens: usize,
}

/// An immutable, shareable question-answering engine.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Answer `query` against the loaded index.
    async fn asearch(&self, query: &str) -> Result<SearchResult>;
}
