//! Mixed local-search context.
//!
//! Maps the query to its nearest entities through the embedding store,
//! then assembles entity, relationship, claim, community-report and
//! text-unit tables around that neighbourhood. Raw text units and
//! community summaries get fixed proportions of the token budget; the
//! graph tables share the remainder.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::context::{trim_history, ConversationTurn};
use crate::error::Result;
use crate::llm::Embeddings;
use crate::tokens::TokenCounter;
use crate::types::IndexContext;
use crate::vector_store::EntityEmbeddingStore;

/// Tuning parameters for the mixed context.
#[derive(Debug, Clone, Copy)]
pub struct LocalContextParams {
    /// Overall context window budget in tokens.
    pub max_context_tokens: usize,
    /// Fraction of the budget reserved for raw text units.
    pub text_unit_prop: f64,
    /// Fraction of the budget reserved for community summaries.
    pub community_prop: f64,
    /// Entities retrieved from the embedding store.
    pub top_k_entities: usize,
    /// Relationships kept around the selected entities.
    pub top_k_relationships: usize,
    /// Conversation-history lookback.
    pub max_history_turns: usize,
    /// Only count user turns toward the lookback.
    pub user_turns_only: bool,
}

impl Default for LocalContextParams {
    fn default() -> Self {
        Self {
            max_context_tokens: 12_000,
            text_unit_prop: 0.5,
            community_prop: 0.1,
            top_k_entities: 10,
            top_k_relationships: 10,
            max_history_turns: 5,
            user_turns_only: true,
        }
    }
}

/// The assembled context text plus the entities it was built around.
#[derive(Debug, Clone)]
pub struct LocalContext {
    pub text: String,
    pub entity_ids: Vec<String>,
}

/// Builds mixed contexts over a loaded index.
pub struct LocalContextBuilder {
    index: Arc<IndexContext>,
    store: EntityEmbeddingStore,
    embedder: Arc<dyn Embeddings>,
    counter: TokenCounter,
    params: LocalContextParams,
}

impl LocalContextBuilder {
    pub fn new(
        index: Arc<IndexContext>,
        store: EntityEmbeddingStore,
        embedder: Arc<dyn Embeddings>,
        counter: TokenCounter,
        params: LocalContextParams,
    ) -> Self {
        Self {
            index,
            store,
            embedder,
            counter,
            params,
        }
    }

    /// Build the context for `query`, with `history` trimmed to the
    /// configured lookback.
    pub async fn build(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<LocalContext> {
        let p = &self.params;
        let query_embedding = self.embedder.embed_query(query).await?;
        let matches = self
            .store
            .similarity_search(&query_embedding, p.top_k_entities)
            .await?;

        let by_id: HashMap<&str, &crate::types::Entity> =
            self.index.entities.iter().map(|e| (e.id.as_str(), e)).collect();
        let selected: Vec<&crate::types::Entity> = matches
            .iter()
            .filter_map(|m| by_id.get(m.entity_id.as_str()).copied())
            .collect();
        let selected_titles: Vec<&str> = selected.iter().map(|e| e.title.as_str()).collect();

        let mut sections: Vec<String> = Vec::new();
        let mut used = 0usize;

        // Conversation history comes first so earlier turns read in order.
        let kept = trim_history(history, p.max_history_turns, p.user_turns_only);
        if !kept.is_empty() {
            let mut section = String::from("-----Conversation History-----\nturn|content\n");
            for turn in kept {
                let role = if turn.is_user { "user" } else { "assistant" };
                section.push_str(&format!("{role}|{}\n", turn.content));
            }
            used += self.counter.count(&section);
            sections.push(section);
        }

        #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let text_budget = (p.max_context_tokens as f64 * p.text_unit_prop) as usize;
        #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let community_budget = (p.max_context_tokens as f64 * p.community_prop) as usize;
        let graph_budget = p
            .max_context_tokens
            .saturating_sub(text_budget + community_budget + used);

        let mut graph_used = 0usize;

        // Entity table.
        let mut entity_section =
            String::from("-----Entities-----\nid|entity|description|number of relationships\n");
        for e in &selected {
            let row = format!("{}|{}|{}|{}\n", e.short_id, e.title, e.description, e.rank);
            let cost = self.counter.count(&row);
            if graph_used + cost > graph_budget {
                break;
            }
            graph_used += cost;
            entity_section.push_str(&row);
        }
        sections.push(entity_section);

        // Relationships touching the selected entities, strongest first.
        let mut rels: Vec<&crate::types::Relationship> = self
            .index
            .relationships
            .iter()
            .filter(|r| {
                selected_titles.contains(&r.source.as_str())
                    || selected_titles.contains(&r.target.as_str())
            })
            .collect();
        rels.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        let mut rel_section =
            String::from("-----Relationships-----\nid|source|target|description|weight\n");
        for r in rels.iter().take(p.top_k_relationships) {
            let row = format!(
                "{}|{}|{}|{}|{}\n",
                r.short_id, r.source, r.target, r.description, r.weight
            );
            let cost = self.counter.count(&row);
            if graph_used + cost > graph_budget {
                break;
            }
            graph_used += cost;
            rel_section.push_str(&row);
        }
        sections.push(rel_section);

        // Claims about the selected entities.
        let claims: Vec<&crate::types::Covariate> = self
            .index
            .covariates
            .iter()
            .filter(|c| selected_titles.contains(&c.subject_id.as_str()))
            .collect();
        if !claims.is_empty() {
            let mut claim_section =
                String::from("-----Claims-----\nid|subject|type|status|description\n");
            for c in claims {
                let row = format!(
                    "{}|{}|{}|{}|{}\n",
                    c.short_id, c.subject_id, c.covariate_type, c.status, c.description
                );
                let cost = self.counter.count(&row);
                if graph_used + cost > graph_budget {
                    break;
                }
                graph_used += cost;
                claim_section.push_str(&row);
            }
            sections.push(claim_section);
        }

        // Community reports for the communities the entities live in.
        let mut community_ids: Vec<&str> = selected
            .iter()
            .flat_map(|e| e.community_ids.iter().map(String::as_str))
            .collect();
        community_ids.sort_unstable();
        community_ids.dedup();
        let mut reports: Vec<&crate::types::CommunityReport> = self
            .index
            .reports
            .iter()
            .filter(|r| community_ids.contains(&r.community_id.as_str()))
            .collect();
        reports.sort_by(|a, b| b.rank.total_cmp(&a.rank));
        if !reports.is_empty() {
            let mut report_section = String::from("-----Reports-----\nid|title|content\n");
            let mut report_used = 0usize;
            for r in reports {
                let row = format!("{}|{}|{}\n", r.short_id, r.title, r.summary);
                let cost = self.counter.count(&row);
                if report_used + cost > community_budget {
                    break;
                }
                report_used += cost;
                report_section.push_str(&row);
            }
            sections.push(report_section);
        }

        // Raw text units, most-referenced first.
        let mut unit_counts: HashMap<&str, usize> = HashMap::new();
        for e in &selected {
            for id in &e.text_unit_ids {
                *unit_counts.entry(id.as_str()).or_default() += 1;
            }
        }
        let unit_by_id: HashMap<&str, &crate::types::TextUnit> = self
            .index
            .text_units
            .iter()
            .map(|t| (t.id.as_str(), t))
            .collect();
        let mut units: Vec<(&crate::types::TextUnit, usize)> = unit_counts
            .iter()
            .filter_map(|(id, n)| unit_by_id.get(id).map(|t| (*t, *n)))
            .collect();
        units.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
        if !units.is_empty() {
            let mut unit_section = String::from("-----Sources-----\nid|text\n");
            let mut unit_used = 0usize;
            for (t, _) in units {
                let row = format!("{}|{}\n", t.short_id, t.text);
                let cost = self.counter.count(&row);
                if unit_used + cost > text_budget {
                    break;
                }
                unit_used += cost;
                unit_section.push_str(&row);
            }
            sections.push(unit_section);
        }

        let text = sections.join("\n");
        debug!(
            entities = selected.len(),
            tokens = self.counter.count(&text),
            "local context built"
        );
        Ok(LocalContext {
            text,
            entity_ids: selected.iter().map(|e| e.id.clone()).collect(),
        })
    }
}
