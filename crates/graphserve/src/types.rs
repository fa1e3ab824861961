//! In-memory model of a prebuilt knowledge-graph index.
//!
//! These records mirror the tabular artifacts written by the indexing
//! pipeline. They are loaded once at startup by [`crate::indexer`] and are
//! read-only afterwards.

use serde::{Deserialize, Serialize};

/// A named entity extracted from the source corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Stable unique id.
    pub id: String,
    /// Short human-readable id used in data references.
    pub short_id: String,
    /// Entity name as it appears in the graph.
    pub title: String,
    /// Entity type label (person, organization, ...). May be empty.
    pub entity_type: String,
    /// Aggregated description of the entity.
    pub description: String,
    /// Embedding of `description`, if the index produced one.
    pub description_embedding: Option<Vec<f32>>,
    /// Graph degree, used as a relevance rank.
    pub rank: f64,
    /// Communities this entity belongs to, across levels.
    pub community_ids: Vec<String>,
    /// Ids of the text units the entity was extracted from.
    pub text_unit_ids: Vec<String>,
}

/// A directed relationship between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub short_id: String,
    /// Source entity title.
    pub source: String,
    /// Target entity title.
    pub target: String,
    pub description: String,
    /// Edge weight assigned by the indexer.
    pub weight: f64,
    pub text_unit_ids: Vec<String>,
}

/// A precomputed summary of a community of related entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityReport {
    pub id: String,
    pub short_id: String,
    /// Community id the report summarizes.
    pub community_id: String,
    pub title: String,
    pub summary: String,
    /// Full report body used as global-search context.
    pub full_content: String,
    /// Importance rank assigned by the indexer.
    pub rank: f64,
}

/// A chunk of source text the graph was extracted from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextUnit {
    pub id: String,
    pub short_id: String,
    pub text: String,
    /// Entities mentioned in this chunk.
    pub entity_ids: Vec<String>,
}

/// A claim (covariate) attached to an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Covariate {
    pub id: String,
    pub short_id: String,
    /// Title of the entity the claim is about.
    pub subject_id: String,
    /// Claim type label.
    pub covariate_type: String,
    pub description: String,
    /// Claim status (e.g. TRUE, FALSE, SUSPECTED).
    pub status: String,
}

/// Everything the engines need, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct IndexContext {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub reports: Vec<CommunityReport>,
    pub text_units: Vec<TextUnit>,
    pub covariates: Vec<Covariate>,
}
