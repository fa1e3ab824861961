//! Engine construction.
//!
//! Everything here runs once, before the listener binds. The index is
//! loaded from parquet, entity description embeddings are (re)loaded into
//! LanceDB, and both engines are built over the same shared index. Any
//! failure is fatal; the server never starts half-provisioned.

use std::sync::Arc;

use anyhow::Context;
use graphserve::context::{
    GlobalContextBuilder, GlobalContextParams, LocalContextBuilder, LocalContextParams,
};
use graphserve::indexer::{load_index, DEFAULT_COMMUNITY_LEVEL};
use graphserve::llm::{OpenAIChat, OpenAIEmbeddings};
use graphserve::search::{GlobalSearchParams, LocalSearchParams};
use graphserve::tokens::TokenCounter;
use graphserve::vector_store::EntityEmbeddingStore;
use graphserve::{GlobalSearch, LocalSearch, SearchEngine};
use tracing::info;

use crate::app::Engines;
use crate::settings::Settings;

/// Build both search engines from the artifacts in the data directory.
pub async fn build_engines(settings: &Settings) -> anyhow::Result<Engines> {
    let index = load_index(&settings.data_dir, DEFAULT_COMMUNITY_LEVEL)
        .with_context(|| format!("loading index from {}", settings.data_dir.display()))?;
    let index = Arc::new(index);

    let store = EntityEmbeddingStore::connect_and_load(&settings.lancedb_uri(), &index.entities)
        .await
        .context("loading entity embeddings into lancedb")?;

    let counter = TokenCounter::cl100k().context("loading cl100k tokenizer")?;
    let chat = Arc::new(OpenAIChat::new(&settings.api_key, &settings.api_base));
    let embedder = Arc::new(OpenAIEmbeddings::new(&settings.api_key, &settings.api_base));

    let local_builder = LocalContextBuilder::new(
        Arc::clone(&index),
        store,
        embedder,
        counter.clone(),
        LocalContextParams::default(),
    );
    let local = LocalSearch::new(
        local_builder,
        Arc::clone(&chat) as Arc<dyn graphserve::llm::ChatModel>,
        counter.clone(),
        LocalSearchParams::default(),
    );

    let global_builder = GlobalContextBuilder::new(
        Arc::clone(&index),
        counter.clone(),
        GlobalContextParams::default(),
    );
    let global = GlobalSearch::new(
        global_builder,
        chat,
        counter,
        GlobalSearchParams::default(),
    );

    info!(
        entities = index.entities.len(),
        reports = index.reports.len(),
        "search engines ready"
    );
    Ok(Engines {
        local: Arc::new(local) as Arc<dyn SearchEngine>,
        global: Arc::new(global) as Arc<dyn SearchEngine>,
    })
}
