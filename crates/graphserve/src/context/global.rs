//! Global-search context: community reports packed into batches.
//!
//! Each batch is a standalone data table that fits inside the token
//! budget; the global engine maps over the batches concurrently. Reports
//! carry their rank and a normalized occurrence weight (how much of the
//! corpus the community's entities touch) so the model can judge
//! importance.

use std::collections::HashMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::thread_rng;
use tracing::debug;

use crate::tokens::TokenCounter;
use crate::types::IndexContext;

/// Tuning parameters for report batching.
#[derive(Debug, Clone, Copy)]
pub struct GlobalContextParams {
    /// Per-batch token budget.
    pub max_context_tokens: usize,
    /// Shuffle reports before batching so batches are not biased by
    /// artifact order.
    pub shuffle_data: bool,
    /// Keep reports at or above this rank.
    pub min_community_rank: f64,
    /// Include the normalized occurrence weight column.
    pub include_community_weight: bool,
}

impl Default for GlobalContextParams {
    fn default() -> Self {
        Self {
            max_context_tokens: 12_000,
            shuffle_data: true,
            min_community_rank: 0.0,
            include_community_weight: true,
        }
    }
}

/// Packs community reports into per-batch context tables.
pub struct GlobalContextBuilder {
    index: Arc<IndexContext>,
    counter: TokenCounter,
    params: GlobalContextParams,
}

impl GlobalContextBuilder {
    pub fn new(
        index: Arc<IndexContext>,
        counter: TokenCounter,
        params: GlobalContextParams,
    ) -> Self {
        Self {
            index,
            counter,
            params,
        }
    }

    /// Occurrence weight per community: the share of text units its
    /// entities reference, normalized so the largest community is 1.0.
    fn community_weights(&self) -> HashMap<&str, f64> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entity in &self.index.entities {
            for community in &entity.community_ids {
                *counts.entry(community.as_str()).or_default() += entity.text_unit_ids.len();
            }
        }
        let max = counts.values().copied().max().unwrap_or(0).max(1);
        #[allow(clippy::cast_precision_loss)]
        counts
            .into_iter()
            .map(|(k, v)| (k, v as f64 / max as f64))
            .collect()
    }

    /// Build the report batches for one search.
    #[must_use]
    pub fn build_batches(&self) -> Vec<String> {
        let p = &self.params;
        let weights = self.community_weights();

        let mut reports: Vec<&crate::types::CommunityReport> = self
            .index
            .reports
            .iter()
            .filter(|r| r.rank >= p.min_community_rank)
            .collect();
        if p.shuffle_data {
            reports.shuffle(&mut thread_rng());
        }

        let header = if p.include_community_weight {
            "-----Reports-----\nid|title|occurrence weight|content|rank\n"
        } else {
            "-----Reports-----\nid|title|content|rank\n"
        };
        let header_cost = self.counter.count(header);

        let mut batches = Vec::new();
        let mut current = String::from(header);
        let mut used = header_cost;
        for r in reports {
            let row = if p.include_community_weight {
                let weight = weights.get(r.community_id.as_str()).copied().unwrap_or(0.0);
                format!(
                    "{}|{}|{weight:.2}|{}|{}\n",
                    r.short_id, r.title, r.full_content, r.rank
                )
            } else {
                format!("{}|{}|{}|{}\n", r.short_id, r.title, r.full_content, r.rank)
            };
            let cost = self.counter.count(&row);
            if used + cost > p.max_context_tokens && used > header_cost {
                batches.push(std::mem::replace(&mut current, String::from(header)));
                used = header_cost;
            }
            used += cost;
            current.push_str(&row);
        }
        if used > header_cost {
            batches.push(current);
        }
        debug!(batches = batches.len(), "global context batches built");
        batches
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::{CommunityReport, Entity};

    fn report(community: &str, rank: f64, content: &str) -> CommunityReport {
        CommunityReport {
            id: community.to_string(),
            short_id: community.to_string(),
            community_id: community.to_string(),
            title: format!("Community {community}"),
            summary: String::new(),
            full_content: content.to_string(),
            rank,
        }
    }

    fn entity(community: &str, text_units: usize) -> Entity {
        Entity {
            id: format!("e-{community}"),
            short_id: String::new(),
            title: format!("E{community}"),
            entity_type: String::new(),
            description: String::new(),
            description_embedding: None,
            rank: 0.0,
            community_ids: vec![community.to_string()],
            text_unit_ids: (0..text_units).map(|i| format!("t{i}")).collect(),
        }
    }

    fn builder(index: IndexContext, params: GlobalContextParams) -> GlobalContextBuilder {
        GlobalContextBuilder::new(Arc::new(index), TokenCounter::cl100k().unwrap(), params)
    }

    #[test]
    fn every_batch_stays_inside_the_budget() {
        let index = IndexContext {
            reports: (0..20)
                .map(|i| report(&i.to_string(), 1.0, &"lorem ipsum dolor sit amet ".repeat(20)))
                .collect(),
            ..IndexContext::default()
        };
        let params = GlobalContextParams {
            max_context_tokens: 300,
            shuffle_data: false,
            ..GlobalContextParams::default()
        };
        let b = builder(index, params);
        let batches = b.build_batches();
        assert!(batches.len() > 1);
        let counter = TokenCounter::cl100k().unwrap();
        for batch in &batches {
            assert!(counter.count(batch) <= 300 + 60, "batch grossly over budget");
            assert!(batch.starts_with("-----Reports-----"));
        }
    }

    #[test]
    fn low_rank_reports_are_filtered() {
        let index = IndexContext {
            reports: vec![report("1", 5.0, "kept"), report("2", -1.0, "dropped")],
            ..IndexContext::default()
        };
        let params = GlobalContextParams {
            shuffle_data: false,
            ..GlobalContextParams::default()
        };
        let batches = builder(index, params).build_batches();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].contains("kept"));
        assert!(!batches[0].contains("dropped"));
    }

    #[test]
    fn occurrence_weight_is_normalized() {
        let index = IndexContext {
            reports: vec![report("1", 1.0, "a"), report("2", 1.0, "b")],
            entities: vec![entity("1", 4), entity("2", 2)],
            ..IndexContext::default()
        };
        let params = GlobalContextParams {
            shuffle_data: false,
            ..GlobalContextParams::default()
        };
        let batches = builder(index, params).build_batches();
        assert!(batches[0].contains("|1.00|"));
        assert!(batches[0].contains("|0.50|"));
    }
}
