//! Parquet adapters for the index artifacts.
//!
//! The indexing pipeline writes its outputs as a fixed set of parquet
//! tables. These readers adapt each table into the in-memory records in
//! [`crate::types`]. Schema here means "the columns the adapters touch":
//! extra columns are ignored, missing required columns are fatal.
//!
//! Entities are joined against the nodes table and filtered to a community
//! level, mirroring the pipeline's own query adapters.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use arrow_array::{
    Array, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray, LargeStringArray,
    ListArray, RecordBatch, StringArray,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::{CommunityReport, Covariate, Entity, IndexContext, Relationship, TextUnit};

/// Artifact file names, as written by the indexing pipeline.
pub const FINAL_NODES: &str = "create_final_nodes.parquet";
pub const FINAL_ENTITIES: &str = "create_final_entities.parquet";
pub const FINAL_RELATIONSHIPS: &str = "create_final_relationships.parquet";
pub const FINAL_COMMUNITY_REPORTS: &str = "create_final_community_reports.parquet";
pub const FINAL_TEXT_UNITS: &str = "create_final_text_units.parquet";
pub const FINAL_COVARIATES: &str = "create_final_covariates.parquet";

/// All artifact files an index directory must contain.
pub const REQUIRED_ARTIFACTS: &[&str] = &[
    FINAL_NODES,
    FINAL_ENTITIES,
    FINAL_RELATIONSHIPS,
    FINAL_COMMUNITY_REPORTS,
    FINAL_TEXT_UNITS,
    FINAL_COVARIATES,
];

/// Community level entities and reports are restricted to.
pub const DEFAULT_COMMUNITY_LEVEL: i64 = 2;

fn read_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| Error::ArtifactIo {
        path: display.clone(),
        source,
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(ParquetRecordBatchReaderBuilder::build)
        .map_err(|source| Error::Parquet {
            path: display.clone(),
            source,
        })?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.map_err(|e| Error::ArtifactSchema {
            path: display.clone(),
            reason: e.to_string(),
        })?);
    }
    Ok(batches)
}

fn schema_err(path: &Path, reason: impl Into<String>) -> Error {
    Error::ArtifactSchema {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Read a cell as a string, tolerating the integer ids pandas tends to
/// emit for human-readable id columns.
fn string_at(batch: &RecordBatch, name: &str, row: usize) -> Option<String> {
    let col = batch.column_by_name(name)?;
    if col.is_null(row) {
        return None;
    }
    let any = col.as_any();
    if let Some(a) = any.downcast_ref::<StringArray>() {
        return Some(a.value(row).to_string());
    }
    if let Some(a) = any.downcast_ref::<LargeStringArray>() {
        return Some(a.value(row).to_string());
    }
    if let Some(a) = any.downcast_ref::<Int64Array>() {
        return Some(a.value(row).to_string());
    }
    if let Some(a) = any.downcast_ref::<Int32Array>() {
        return Some(a.value(row).to_string());
    }
    if let Some(a) = any.downcast_ref::<Float64Array>() {
        return Some(a.value(row).to_string());
    }
    None
}

fn f64_at(batch: &RecordBatch, name: &str, row: usize) -> Option<f64> {
    let col = batch.column_by_name(name)?;
    if col.is_null(row) {
        return None;
    }
    let any = col.as_any();
    if let Some(a) = any.downcast_ref::<Float64Array>() {
        return Some(a.value(row));
    }
    if let Some(a) = any.downcast_ref::<Float32Array>() {
        return Some(f64::from(a.value(row)));
    }
    if let Some(a) = any.downcast_ref::<Int64Array>() {
        #[allow(clippy::cast_precision_loss)]
        return Some(a.value(row) as f64);
    }
    if let Some(a) = any.downcast_ref::<Int32Array>() {
        return Some(f64::from(a.value(row)));
    }
    None
}

fn i64_at(batch: &RecordBatch, name: &str, row: usize) -> Option<i64> {
    #[allow(clippy::cast_possible_truncation)]
    f64_at(batch, name, row).map(|v| v as i64)
}

fn string_vec(values: &dyn Array) -> Vec<String> {
    let any = values.as_any();
    if let Some(a) = any.downcast_ref::<StringArray>() {
        return (0..a.len())
            .filter(|&i| !a.is_null(i))
            .map(|i| a.value(i).to_string())
            .collect();
    }
    if let Some(a) = any.downcast_ref::<LargeStringArray>() {
        return (0..a.len())
            .filter(|&i| !a.is_null(i))
            .map(|i| a.value(i).to_string())
            .collect();
    }
    Vec::new()
}

/// Read a cell holding a list of strings (e.g. `text_unit_ids`).
fn string_list_at(batch: &RecordBatch, name: &str, row: usize) -> Vec<String> {
    let Some(col) = batch.column_by_name(name) else {
        return Vec::new();
    };
    if col.is_null(row) {
        return Vec::new();
    }
    let any = col.as_any();
    if let Some(a) = any.downcast_ref::<ListArray>() {
        return string_vec(a.value(row).as_ref());
    }
    if let Some(a) = any.downcast_ref::<LargeListArray>() {
        return string_vec(a.value(row).as_ref());
    }
    Vec::new()
}

fn float_vec(values: &dyn Array) -> Option<Vec<f32>> {
    let any = values.as_any();
    if let Some(a) = any.downcast_ref::<Float64Array>() {
        #[allow(clippy::cast_possible_truncation)]
        return Some((0..a.len()).map(|i| a.value(i) as f32).collect());
    }
    if let Some(a) = any.downcast_ref::<Float32Array>() {
        return Some((0..a.len()).map(|i| a.value(i)).collect());
    }
    None
}

/// Read an embedding cell (list of f32/f64).
fn embedding_at(batch: &RecordBatch, name: &str, row: usize) -> Option<Vec<f32>> {
    let col = batch.column_by_name(name)?;
    if col.is_null(row) {
        return None;
    }
    let any = col.as_any();
    if let Some(a) = any.downcast_ref::<ListArray>() {
        return float_vec(a.value(row).as_ref());
    }
    if let Some(a) = any.downcast_ref::<LargeListArray>() {
        return float_vec(a.value(row).as_ref());
    }
    None
}

fn required_string(batch: &RecordBatch, path: &Path, name: &str, row: usize) -> Result<String> {
    string_at(batch, name, row)
        .ok_or_else(|| schema_err(path, format!("missing or mistyped column '{name}'")))
}

/// Node-table facts carried onto entities during the join.
struct NodeInfo {
    degree: f64,
    community_ids: Vec<String>,
}

fn read_nodes(dir: &Path, community_level: i64) -> Result<HashMap<String, NodeInfo>> {
    let path = dir.join(FINAL_NODES);
    let mut nodes: HashMap<String, NodeInfo> = HashMap::new();
    for batch in read_batches(&path)? {
        for row in 0..batch.num_rows() {
            let level = i64_at(&batch, "level", row).unwrap_or(0);
            if level > community_level {
                continue;
            }
            let title = required_string(&batch, &path, "title", row)?;
            let degree = f64_at(&batch, "degree", row).unwrap_or(0.0);
            let entry = nodes.entry(title).or_insert_with(|| NodeInfo {
                degree,
                community_ids: Vec::new(),
            });
            entry.degree = entry.degree.max(degree);
            if let Some(community) = string_at(&batch, "community", row) {
                if !community.is_empty() && !entry.community_ids.contains(&community) {
                    entry.community_ids.push(community);
                }
            }
        }
    }
    Ok(nodes)
}

/// Join the entity table against the nodes table, keeping entities that
/// appear at or below `community_level`.
pub fn read_entities(dir: &Path, community_level: i64) -> Result<Vec<Entity>> {
    let nodes = read_nodes(dir, community_level)?;
    let path = dir.join(FINAL_ENTITIES);
    let mut entities = Vec::new();
    for batch in read_batches(&path)? {
        for row in 0..batch.num_rows() {
            let title = required_string(&batch, &path, "name", row)?;
            let Some(node) = nodes.get(&title) else {
                continue;
            };
            entities.push(Entity {
                id: required_string(&batch, &path, "id", row)?,
                short_id: string_at(&batch, "human_readable_id", row).unwrap_or_default(),
                title,
                entity_type: string_at(&batch, "type", row).unwrap_or_default(),
                description: string_at(&batch, "description", row).unwrap_or_default(),
                description_embedding: embedding_at(&batch, "description_embedding", row),
                rank: node.degree,
                community_ids: node.community_ids.clone(),
                text_unit_ids: string_list_at(&batch, "text_unit_ids", row),
            });
        }
    }
    Ok(entities)
}

pub fn read_relationships(dir: &Path) -> Result<Vec<Relationship>> {
    let path = dir.join(FINAL_RELATIONSHIPS);
    let mut relationships = Vec::new();
    for batch in read_batches(&path)? {
        for row in 0..batch.num_rows() {
            relationships.push(Relationship {
                id: required_string(&batch, &path, "id", row)?,
                short_id: string_at(&batch, "human_readable_id", row).unwrap_or_default(),
                source: required_string(&batch, &path, "source", row)?,
                target: required_string(&batch, &path, "target", row)?,
                description: string_at(&batch, "description", row).unwrap_or_default(),
                weight: f64_at(&batch, "weight", row).unwrap_or(1.0),
                text_unit_ids: string_list_at(&batch, "text_unit_ids", row),
            });
        }
    }
    Ok(relationships)
}

pub fn read_reports(dir: &Path, community_level: i64) -> Result<Vec<CommunityReport>> {
    let path = dir.join(FINAL_COMMUNITY_REPORTS);
    let mut reports = Vec::new();
    for batch in read_batches(&path)? {
        for row in 0..batch.num_rows() {
            let level = i64_at(&batch, "level", row).unwrap_or(0);
            if level > community_level {
                continue;
            }
            let community_id = required_string(&batch, &path, "community", row)?;
            reports.push(CommunityReport {
                id: string_at(&batch, "id", row).unwrap_or_else(|| community_id.clone()),
                short_id: community_id.clone(),
                community_id,
                title: string_at(&batch, "title", row).unwrap_or_default(),
                summary: string_at(&batch, "summary", row).unwrap_or_default(),
                full_content: required_string(&batch, &path, "full_content", row)?,
                rank: f64_at(&batch, "rank", row).unwrap_or(0.0),
            });
        }
    }
    Ok(reports)
}

pub fn read_text_units(dir: &Path) -> Result<Vec<TextUnit>> {
    let path = dir.join(FINAL_TEXT_UNITS);
    let mut units = Vec::new();
    for batch in read_batches(&path)? {
        for row in 0..batch.num_rows() {
            let id = required_string(&batch, &path, "id", row)?;
            units.push(TextUnit {
                short_id: id.clone(),
                id,
                text: required_string(&batch, &path, "text", row)?,
                entity_ids: string_list_at(&batch, "entity_ids", row),
            });
        }
    }
    Ok(units)
}

pub fn read_covariates(dir: &Path) -> Result<Vec<Covariate>> {
    let path = dir.join(FINAL_COVARIATES);
    let mut covariates = Vec::new();
    for batch in read_batches(&path)? {
        for row in 0..batch.num_rows() {
            covariates.push(Covariate {
                id: required_string(&batch, &path, "id", row)?,
                short_id: string_at(&batch, "human_readable_id", row).unwrap_or_default(),
                subject_id: required_string(&batch, &path, "subject_id", row)?,
                covariate_type: string_at(&batch, "type", row).unwrap_or_default(),
                description: string_at(&batch, "description", row).unwrap_or_default(),
                status: string_at(&batch, "status", row).unwrap_or_default(),
            });
        }
    }
    Ok(covariates)
}

/// Load every artifact table from `dir`.
///
/// Any missing file or schema mismatch is fatal; the caller must not serve
/// requests against a partially loaded index.
pub fn load_index(dir: &Path, community_level: i64) -> Result<IndexContext> {
    let entities = read_entities(dir, community_level)?;
    let relationships = read_relationships(dir)?;
    let reports = read_reports(dir, community_level)?;
    let text_units = read_text_units(dir)?;
    let covariates = read_covariates(dir)?;
    info!(
        entities = entities.len(),
        relationships = relationships.len(),
        reports = reports.len(),
        text_units = text_units.len(),
        covariates = covariates.len(),
        "index context loaded"
    );
    Ok(IndexContext {
        entities,
        relationships,
        reports,
        text_units,
        covariates,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use arrow_array::builder::{Float64Builder, ListBuilder, StringBuilder};
    use arrow_array::{ArrayRef, Float64Array, Int64Array, StringArray};
    use arrow_schema::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;

    fn write_parquet(path: &Path, batch: &RecordBatch) {
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
    }

    fn string_list_col(values: &[&[&str]]) -> ArrayRef {
        let mut builder = ListBuilder::new(StringBuilder::new());
        for list in values {
            for v in *list {
                builder.values().append_value(v);
            }
            builder.append(true);
        }
        Arc::new(builder.finish())
    }

    fn embedding_col(values: &[&[f64]]) -> ArrayRef {
        let mut builder = ListBuilder::new(Float64Builder::new());
        for list in values {
            for v in *list {
                builder.values().append_value(*v);
            }
            builder.append(true);
        }
        Arc::new(builder.finish())
    }

    fn write_nodes(dir: &Path) {
        let schema = Schema::new(vec![
            Field::new("title", DataType::Utf8, false),
            Field::new("level", DataType::Int64, false),
            Field::new("community", DataType::Int64, true),
            Field::new("degree", DataType::Float64, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["ALPHA", "BETA", "DEEP"])),
                Arc::new(Int64Array::from(vec![0, 1, 3])),
                Arc::new(Int64Array::from(vec![Some(7), Some(7), Some(9)])),
                Arc::new(Float64Array::from(vec![4.0, 2.0, 1.0])),
            ],
        )
        .unwrap();
        write_parquet(&dir.join(FINAL_NODES), &batch);
    }

    fn write_entities(dir: &Path) {
        let list_field = Arc::new(Field::new("item", DataType::Utf8, true));
        let emb_field = Arc::new(Field::new("item", DataType::Float64, true));
        let schema = Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("human_readable_id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, false),
            Field::new("type", DataType::Utf8, true),
            Field::new("description", DataType::Utf8, true),
            Field::new(
                "description_embedding",
                DataType::List(emb_field),
                true,
            ),
            Field::new("text_unit_ids", DataType::List(list_field), true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["e1", "e2", "e3"])),
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec!["ALPHA", "BETA", "DEEP"])),
                Arc::new(StringArray::from(vec!["org", "person", "org"])),
                Arc::new(StringArray::from(vec!["Alpha desc", "Beta desc", "Deep"])),
                embedding_col(&[&[0.1, 0.2], &[0.3, 0.4], &[0.5, 0.6]]),
                string_list_col(&[&["t1"], &["t1", "t2"], &[]]),
            ],
        )
        .unwrap();
        write_parquet(&dir.join(FINAL_ENTITIES), &batch);
    }

    #[test]
    fn entities_join_nodes_and_respect_community_level() {
        let dir = tempfile::tempdir().unwrap();
        write_nodes(dir.path());
        write_entities(dir.path());

        let entities = read_entities(dir.path(), 2).unwrap();
        // DEEP sits at level 3 and must be filtered out.
        assert_eq!(entities.len(), 2);
        let alpha = entities.iter().find(|e| e.title == "ALPHA").unwrap();
        assert_eq!(alpha.id, "e1");
        assert_eq!(alpha.short_id, "1");
        assert_eq!(alpha.community_ids, vec!["7".to_string()]);
        assert!((alpha.rank - 4.0).abs() < f64::EPSILON);
        assert_eq!(alpha.description_embedding, Some(vec![0.1f32, 0.2f32]));
        let beta = entities.iter().find(|e| e.title == "BETA").unwrap();
        assert_eq!(beta.text_unit_ids, vec!["t1".to_string(), "t2".to_string()]);
    }

    #[test]
    fn missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_relationships(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ArtifactIo { .. }));
    }

    #[test]
    fn missing_required_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = Schema::new(vec![Field::new("text", DataType::Utf8, false)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec!["no id column"]))],
        )
        .unwrap();
        write_parquet(&dir.path().join(FINAL_TEXT_UNITS), &batch);

        let err = read_text_units(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ArtifactSchema { .. }));
    }
}
