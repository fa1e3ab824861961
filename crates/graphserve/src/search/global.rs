//! Global search: map-reduce over community report batches.
//!
//! The map phase fans out one JSON-mode chat call per report batch, capped
//! at a fixed number of concurrent calls. Each call yields scored key
//! points; the reduce phase orders the surviving points by score, packs
//! them under the data budget and makes one final call. Map batches that
//! fail or return unparsable JSON contribute no points.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use crate::context::GlobalContextBuilder;
use crate::error::Result;
use crate::llm::{ChatModel, GenerateParams};
use crate::prompts::{GLOBAL_MAP_SYSTEM_PROMPT, GLOBAL_REDUCE_SYSTEM_PROMPT, NO_DATA_ANSWER};
use crate::search::{SearchEngine, SearchResult};
use crate::tokens::TokenCounter;

/// Appended to the reduce prompt when general-knowledge augmentation is
/// enabled.
const GENERAL_KNOWLEDGE_INSTRUCTION: &str = "\nThe response may also include relevant real-world knowledge outside the dataset, but it must be explicitly annotated with a verification tag [LLM: verify].\n";

/// Generation parameters for the global engine.
#[derive(Debug, Clone)]
pub struct GlobalSearchParams {
    /// Token budget for the reduce phase's analyst-report data block.
    pub max_data_tokens: usize,
    /// Upper bound on concurrent map calls.
    pub concurrent_requests: usize,
    /// Completion cap for each map call.
    pub map_max_tokens: u32,
    /// Completion cap for the reduce call.
    pub reduce_max_tokens: u32,
    /// Sampling temperature for both phases.
    pub temperature: f32,
    /// Let the reduce phase add knowledge from outside the dataset.
    pub allow_general_knowledge: bool,
    /// Requested answer shape, substituted into the reduce prompt.
    pub response_type: String,
}

impl Default for GlobalSearchParams {
    fn default() -> Self {
        Self {
            max_data_tokens: 12_000,
            concurrent_requests: 32,
            map_max_tokens: 1_000,
            reduce_max_tokens: 2_000,
            temperature: 0.0,
            allow_general_knowledge: false,
            response_type: "multiple paragraphs".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapResponse {
    #[serde(default)]
    points: Vec<MapPoint>,
}

#[derive(Debug, Deserialize)]
struct MapPoint {
    description: String,
    #[serde(default)]
    score: f64,
}

/// Answers a query by summarizing over every community report.
pub struct GlobalSearch {
    context_builder: GlobalContextBuilder,
    model: Arc<dyn ChatModel>,
    counter: TokenCounter,
    params: GlobalSearchParams,
}

impl GlobalSearch {
    pub fn new(
        context_builder: GlobalContextBuilder,
        model: Arc<dyn ChatModel>,
        counter: TokenCounter,
        params: GlobalSearchParams,
    ) -> Self {
        Self {
            context_builder,
            model,
            counter,
            params,
        }
    }

    /// One map call over a single report batch. Failures and unparsable
    /// responses degrade to an empty point list.
    async fn map_batch(&self, query: &str, batch: String) -> Vec<MapPoint> {
        let system = GLOBAL_MAP_SYSTEM_PROMPT.replace("{context_data}", &batch);
        let generate = GenerateParams {
            max_tokens: self.params.map_max_tokens,
            temperature: self.params.temperature,
            json_mode: true,
        };
        match self.model.generate(&system, query, &generate).await {
            Ok(raw) => match serde_json::from_str::<MapResponse>(&raw) {
                Ok(parsed) => parsed.points,
                Err(e) => {
                    warn!(error = %e, "map response was not valid point JSON, dropping batch");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(error = %e, "map call failed, dropping batch");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SearchEngine for GlobalSearch {
    async fn asearch(&self, query: &str) -> Result<SearchResult> {
        let batches = self.context_builder.build_batches();
        let batch_count = batches.len();
        let context_tokens = batches.iter().map(|b| self.counter.count(b)).sum();

        let mut points: Vec<MapPoint> = stream::iter(batches)
            .map(|batch| self.map_batch(query, batch))
            .buffer_unordered(self.params.concurrent_requests.max(1))
            .collect::<Vec<Vec<MapPoint>>>()
            .await
            .into_iter()
            .flatten()
            .filter(|p| p.score > 0.0)
            .collect();
        points.sort_by(|a, b| b.score.total_cmp(&a.score));

        if points.is_empty() {
            info!(batches = batch_count, "global search found no supported points");
            return Ok(SearchResult {
                response: NO_DATA_ANSWER.to_string(),
                llm_calls: batch_count,
                context_tokens,
            });
        }

        // Pack the highest-scored points under the data budget.
        let mut report_data = String::new();
        let mut used = 0usize;
        for (i, point) in points.iter().enumerate() {
            let block = format!(
                "----Analyst {}----\nImportance Score: {}\n{}\n\n",
                i + 1,
                point.score,
                point.description
            );
            let cost = self.counter.count(&block);
            if used + cost > self.params.max_data_tokens {
                break;
            }
            used += cost;
            report_data.push_str(&block);
        }

        let mut system = GLOBAL_REDUCE_SYSTEM_PROMPT
            .replace("{report_data}", &report_data)
            .replace("{response_type}", &self.params.response_type);
        if self.params.allow_general_knowledge {
            system.push_str(GENERAL_KNOWLEDGE_INSTRUCTION);
        }
        let generate = GenerateParams {
            max_tokens: self.params.reduce_max_tokens,
            temperature: self.params.temperature,
            json_mode: false,
        };
        let response = self.model.generate(&system, query, &generate).await?;

        info!(
            batches = batch_count,
            points = points.len(),
            "global search complete"
        );
        Ok(SearchResult {
            response,
            llm_calls: batch_count + 1,
            context_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::context::GlobalContextParams;
    use crate::error::Error;
    use crate::types::{CommunityReport, IndexContext};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn report(id: usize, content: &str) -> CommunityReport {
        CommunityReport {
            id: id.to_string(),
            short_id: id.to_string(),
            community_id: id.to_string(),
            title: format!("Community {id}"),
            summary: String::new(),
            full_content: content.to_string(),
            rank: 1.0,
        }
    }

    /// Scripted model: JSON point lists for map calls, plain text for the
    /// reduce call.
    struct ScriptedModel {
        map_calls: AtomicUsize,
        reduce_systems: Mutex<Vec<String>>,
        map_json: String,
        fail_maps: bool,
    }

    impl ScriptedModel {
        fn new(map_json: &str) -> Self {
            Self {
                map_calls: AtomicUsize::new(0),
                reduce_systems: Mutex::new(Vec::new()),
                map_json: map_json.to_string(),
                fail_maps: false,
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn generate(
            &self,
            system: &str,
            _user: &str,
            params: &GenerateParams,
        ) -> Result<String> {
            if params.json_mode {
                self.map_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_maps {
                    return Err(Error::ModelCall("map unavailable".to_string()));
                }
                Ok(self.map_json.clone())
            } else {
                self.reduce_systems
                    .lock()
                    .map_err(|_| Error::ModelCall("poisoned".into()))?
                    .push(system.to_string());
                Ok("Synthesized answer.".to_string())
            }
        }
    }

    fn engine(model: Arc<ScriptedModel>, reports: usize, batch_tokens: usize) -> GlobalSearch {
        let index = IndexContext {
            reports: (0..reports)
                .map(|i| report(i, &"many words of community content ".repeat(10)))
                .collect(),
            ..IndexContext::default()
        };
        let counter = TokenCounter::cl100k().unwrap();
        let builder = GlobalContextBuilder::new(
            Arc::new(index),
            counter.clone(),
            GlobalContextParams {
                max_context_tokens: batch_tokens,
                shuffle_data: false,
                ..GlobalContextParams::default()
            },
        );
        GlobalSearch::new(builder, model, counter, GlobalSearchParams::default())
    }

    #[tokio::test]
    async fn maps_every_batch_then_reduces_once() {
        let model = Arc::new(ScriptedModel::new(
            r#"{"points": [{"description": "Key point [Data: Reports (1)]", "score": 80}]}"#,
        ));
        let search = engine(Arc::clone(&model), 12, 200);

        let result = search.asearch("What are the themes?").await.unwrap();
        assert_eq!(result.response, "Synthesized answer.");

        let maps = model.map_calls.load(Ordering::SeqCst);
        assert!(maps > 1, "expected several map batches, got {maps}");
        assert_eq!(result.llm_calls, maps + 1);

        let reduces = model.reduce_systems.lock().unwrap();
        assert_eq!(reduces.len(), 1);
        assert!(reduces[0].contains("Importance Score: 80"));
        assert!(reduces[0].contains("Key point"));
        assert!(!reduces[0].contains("[LLM: verify]"));
    }

    #[tokio::test]
    async fn zero_scored_points_yield_no_data_answer() {
        let model = Arc::new(ScriptedModel::new(
            r#"{"points": [{"description": "nothing relevant", "score": 0}]}"#,
        ));
        let search = engine(Arc::clone(&model), 4, 400);

        let result = search.asearch("Unanswerable?").await.unwrap();
        assert_eq!(result.response, NO_DATA_ANSWER);
        assert!(model.reduce_systems.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unparsable_map_json_degrades_to_no_data() {
        let model = Arc::new(ScriptedModel::new("this is not json"));
        let search = engine(Arc::clone(&model), 4, 400);

        let result = search.asearch("q").await.unwrap();
        assert_eq!(result.response, NO_DATA_ANSWER);
    }

    #[tokio::test]
    async fn failed_map_calls_do_not_fail_the_search() {
        let mut scripted = ScriptedModel::new(r#"{"points": []}"#);
        scripted.fail_maps = true;
        let model = Arc::new(scripted);
        let search = engine(Arc::clone(&model), 4, 400);

        let result = search.asearch("q").await.unwrap();
        assert_eq!(result.response, NO_DATA_ANSWER);
    }
}
