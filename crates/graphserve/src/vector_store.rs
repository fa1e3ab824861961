//! LanceDB store of entity description embeddings.
//!
//! The local engine maps a query to its nearest entities through this
//! store. It is populated once at startup from the loaded entities and is
//! read-only afterwards.

use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::database::CreateTableMode;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::Entity;

/// Table name holding the entity description embeddings.
pub const ENTITY_EMBEDDING_TABLE: &str = "entity_description_embeddings";

/// An entity id paired with its distance to the query.
#[derive(Debug, Clone)]
pub struct EmbeddingMatch {
    pub entity_id: String,
    pub distance: f32,
}

/// Nearest-neighbour index over entity description embeddings.
#[derive(Debug)]
pub struct EntityEmbeddingStore {
    table: Table,
}

impl EntityEmbeddingStore {
    /// Connect to the LanceDB database at `uri` and (re)load the entity
    /// embedding table from `entities`.
    ///
    /// Entities without an embedding, or with an embedding of a different
    /// dimension than the first one seen, are skipped with a warning.
    pub async fn connect_and_load(uri: &str, entities: &[Entity]) -> Result<Self> {
        let db = lancedb::connect(uri).execute().await?;

        let embedded: Vec<&Entity> = entities
            .iter()
            .filter(|e| e.description_embedding.as_ref().is_some_and(|v| !v.is_empty()))
            .collect();
        let skipped = entities.len() - embedded.len();
        if skipped > 0 {
            warn!(skipped, "entities without description embeddings skipped");
        }
        let Some(first) = embedded.first() else {
            return Err(Error::VectorStore(
                "no entity carries a description embedding".to_string(),
            ));
        };
        #[allow(clippy::expect_used)]
        let dim = first
            .description_embedding
            .as_ref()
            .expect("filtered to embedded entities")
            .len();

        let rows: Vec<&Entity> = embedded
            .into_iter()
            .filter(|e| {
                let ok = e
                    .description_embedding
                    .as_ref()
                    .is_some_and(|v| v.len() == dim);
                if !ok {
                    warn!(entity = %e.title, "embedding dimension mismatch, skipping");
                }
                ok
            })
            .collect();

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, true),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    i32::try_from(dim).map_err(|_| {
                        Error::VectorStore(format!("embedding dimension {dim} too large"))
                    })?,
                ),
                false,
            ),
        ]));

        let ids = StringArray::from(rows.iter().map(|e| e.id.as_str()).collect::<Vec<_>>());
        let texts =
            StringArray::from(rows.iter().map(|e| e.description.as_str()).collect::<Vec<_>>());
        let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            rows.iter().map(|e| {
                e.description_embedding
                    .as_ref()
                    .map(|v| v.iter().map(|x| Some(*x)).collect::<Vec<_>>())
            }),
            i32::try_from(dim)
                .map_err(|_| Error::VectorStore(format!("embedding dimension {dim} too large")))?,
        );
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![Arc::new(ids), Arc::new(texts), Arc::new(vectors)],
        )
        .map_err(|e| Error::VectorStore(e.to_string()))?;

        let reader =
            RecordBatchIterator::new(vec![Ok(batch)].into_iter(), Arc::clone(&schema));
        let table = db
            .create_table(ENTITY_EMBEDDING_TABLE, Box::new(reader))
            .mode(CreateTableMode::Overwrite)
            .execute()
            .await?;

        info!(rows = rows.len(), dim, "entity embedding store loaded");
        Ok(Self { table })
    }

    /// Return the `k` entities nearest to `query_embedding`.
    pub async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<EmbeddingMatch>> {
        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .nearest_to(query_embedding)?
            .limit(k)
            .execute()
            .await?
            .try_collect()
            .await?;

        let mut matches = Vec::new();
        for batch in batches {
            let ids = batch
                .column_by_name("id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| Error::VectorStore("result missing 'id' column".to_string()))?;
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| {
                    Error::VectorStore("result missing '_distance' column".to_string())
                })?;
            for row in 0..batch.num_rows() {
                matches.push(EmbeddingMatch {
                    entity_id: ids.value(row).to_string(),
                    distance: distances.value(row),
                });
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn entity(id: &str, title: &str, embedding: Option<Vec<f32>>) -> Entity {
        Entity {
            id: id.to_string(),
            short_id: id.to_string(),
            title: title.to_string(),
            entity_type: String::new(),
            description: format!("{title} description"),
            description_embedding: embedding,
            rank: 1.0,
            community_ids: Vec::new(),
            text_unit_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn nearest_entity_comes_back_first() {
        let dir = tempfile::tempdir().unwrap();
        let entities = vec![
            entity("e1", "ALPHA", Some(vec![1.0, 0.0, 0.0, 0.0])),
            entity("e2", "BETA", Some(vec![0.0, 1.0, 0.0, 0.0])),
            entity("e3", "GAMMA", None),
        ];
        let store =
            EntityEmbeddingStore::connect_and_load(dir.path().to_str().unwrap(), &entities)
                .await
                .unwrap();

        let matches = store
            .similarity_search(&[0.9, 0.1, 0.0, 0.0], 2)
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].entity_id, "e1");
    }

    #[tokio::test]
    async fn loading_without_any_embeddings_fails() {
        let dir = tempfile::tempdir().unwrap();
        let entities = vec![entity("e1", "ALPHA", None)];
        let err = EntityEmbeddingStore::connect_and_load(dir.path().to_str().unwrap(), &entities)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorStore(_)));
    }
}
