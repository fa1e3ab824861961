//! GraphRAG query engines for graphserve.
//!
//! This crate holds everything below the HTTP layer: the in-memory model of
//! a prebuilt knowledge-graph index (entities, relationships, community
//! reports, text units, claims), the parquet adapters that load it, a
//! LanceDB-backed store of entity description embeddings, and the two
//! search engines that answer questions over it:
//!
//! - [`search::LocalSearch`] — answers a query from the graph neighbourhood
//!   of the entities closest to it (entities, relationships, claims, raw
//!   text units, nearby community reports).
//! - [`search::GlobalSearch`] — answers a query by mapping over batches of
//!   community reports concurrently and reducing the scored key points into
//!   a final response.
//!
//! Both engines are constructed once, are immutable afterwards, and are
//! shared across requests behind `Arc<dyn SearchEngine>`.
//!
//! The index artifacts themselves are produced by an external indexing
//! pipeline; this crate only reads them.

pub mod context;
pub mod error;
pub mod indexer;
pub mod llm;
pub mod prompts;
pub mod search;
pub mod tokens;
pub mod types;
pub mod vector_store;

pub use error::{Error, Result};
pub use search::{GlobalSearch, LocalSearch, SearchEngine, SearchResult};
