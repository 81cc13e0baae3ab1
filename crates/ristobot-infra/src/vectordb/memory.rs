//! In-process vector database.
//!
//! Implements `VectorDatabase` from `ristobot-core` with brute-force
//! similarity search over rows held in memory. It follows the same lifecycle
//! rules a Milvus server enforces, so pipelines behave identically against
//! either backend:
//!
//! - inserted rows are counted only after `flush`;
//! - `load_collection` requires an index on the vector field;
//! - `search` and `query` require a loaded collection and see every
//!   inserted row, flushed or not.
//!
//! Filters are evaluated with [`FilterEvaluator`] against the scalar fields
//! of each row.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use ristobot_core::filter::FilterEvaluator;
use ristobot_core::vectordb::VectorDatabase;
use ristobot_types::entity::{Entity, FieldValue, Row};
use ristobot_types::error::{SchemaError, VectorDbError};
use ristobot_types::schema::{CollectionSchema, DataType};
use ristobot_types::search::{
    IndexParams, InsertResult, MetricType, PrimaryKey, QueryRequest, SearchHit, SearchRequest,
};

/// First key handed out for auto-id collections.
const FIRST_AUTO_ID: i64 = 1;

#[derive(Debug, Clone)]
struct StoredRow {
    key: PrimaryKey,
    /// Every non-vector field, including the primary key.
    scalars: Row,
    vector: Vec<f32>,
}

#[derive(Debug)]
struct MemCollection {
    schema: CollectionSchema,
    sealed: Vec<StoredRow>,
    growing: Vec<StoredRow>,
    index: Option<IndexParams>,
    loaded: bool,
    next_auto_id: i64,
}

impl MemCollection {
    fn new(schema: CollectionSchema) -> Self {
        Self {
            schema,
            sealed: Vec::new(),
            growing: Vec::new(),
            index: None,
            loaded: false,
            next_auto_id: FIRST_AUTO_ID,
        }
    }

    fn rows(&self) -> impl Iterator<Item = &StoredRow> {
        self.sealed.iter().chain(self.growing.iter())
    }

    /// Validate `entity`, fill defaults and the auto id, and split it into
    /// scalars and vector.
    fn to_stored(&mut self, entity: &Entity) -> Result<StoredRow, SchemaError> {
        entity.validate(&self.schema)?;

        let primary = self.schema.primary_field().clone();
        let vector_name = self.schema.vector_field().name.clone();
        let mut scalars = Row::new();
        let mut vector = Vec::new();

        for field in self.schema.fields() {
            let value = match entity.get(&field.name) {
                Some(value) => value.clone(),
                None if field.is_primary && field.auto_id => {
                    let id = self.next_auto_id;
                    self.next_auto_id += 1;
                    FieldValue::Int64(id)
                }
                None => match &field.default_value {
                    Some(default) => default.clone(),
                    None => return Err(SchemaError::MissingField(field.name.clone())),
                },
            };

            match value {
                FieldValue::FloatVector(v) if field.name == vector_name => vector = v,
                other => {
                    scalars.insert(field.name.clone(), other.to_json());
                }
            }
        }

        let key = scalars
            .get(&primary.name)
            .and_then(PrimaryKey::from_json)
            .ok_or_else(|| SchemaError::MissingField(primary.name.clone()))?;

        Ok(StoredRow {
            key,
            scalars,
            vector,
        })
    }

    fn project(&self, row: &StoredRow, output_fields: &[String]) -> Result<Row, VectorDbError> {
        let primary = &self.schema.primary_field().name;
        let vector_name = &self.schema.vector_field().name;
        let mut out = Row::new();
        out.insert(primary.clone(), row.key_json());

        for name in output_fields {
            if name == vector_name {
                out.insert(name.clone(), Value::from(row.vector.clone()));
            } else if let Some(value) = row.scalars.get(name) {
                out.insert(name.clone(), value.clone());
            } else {
                return Err(SchemaError::UnknownField(name.clone()).into());
            }
        }
        Ok(out)
    }
}

impl StoredRow {
    fn key_json(&self) -> Value {
        match &self.key {
            PrimaryKey::Int(v) => Value::from(*v),
            PrimaryKey::Str(s) => Value::from(s.as_str()),
        }
    }
}

/// Distance (or similarity, for IP and COSINE) between two vectors.
fn score(metric: MetricType, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match metric {
        // Squared euclidean, as Milvus reports it.
        MetricType::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        MetricType::IP => dot,
        MetricType::Cosine => {
            let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                0.0
            } else {
                dot / (norm_a * norm_b)
            }
        }
    }
}

/// In-memory [`VectorDatabase`].
#[derive(Debug, Default)]
pub struct InMemoryVectorDb {
    collections: RwLock<HashMap<String, MemCollection>>,
}

impl InMemoryVectorDb {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(name: &str) -> VectorDbError {
    VectorDbError::CollectionNotFound(name.to_string())
}

fn filter_error(err: impl std::fmt::Display) -> VectorDbError {
    VectorDbError::Filter(err.to_string())
}

impl VectorDatabase for InMemoryVectorDb {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn list_collections(&self) -> Result<Vec<String>, VectorDbError> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn has_collection(&self, name: &str) -> Result<bool, VectorDbError> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
    ) -> Result<(), VectorDbError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(VectorDbError::CollectionExists(name.to_string()));
        }
        collections.insert(name.to_string(), MemCollection::new(schema.clone()));
        tracing::debug!(collection = name, "created in-memory collection");
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<(), VectorDbError> {
        self.collections
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn insert(
        &self,
        collection: &str,
        entities: &[Entity],
    ) -> Result<InsertResult, VectorDbError> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection))?;

        // Validate the whole batch before any row becomes visible.
        let saved_auto_id = coll.next_auto_id;
        let mut stored = Vec::with_capacity(entities.len());
        for entity in entities {
            match coll.to_stored(entity) {
                Ok(row) => stored.push(row),
                Err(err) => {
                    coll.next_auto_id = saved_auto_id;
                    return Err(err.into());
                }
            }
        }

        let ids: Vec<PrimaryKey> = stored.iter().map(|r| r.key.clone()).collect();
        coll.growing.extend(stored);

        Ok(InsertResult {
            insert_count: ids.len() as u64,
            ids,
        })
    }

    async fn flush(&self, collection: &str) -> Result<(), VectorDbError> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection))?;
        let growing = std::mem::take(&mut coll.growing);
        coll.sealed.extend(growing);
        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        params: &IndexParams,
    ) -> Result<(), VectorDbError> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection))?;

        let field = coll
            .schema
            .field(&params.field_name)
            .ok_or_else(|| SchemaError::UnknownField(params.field_name.clone()))?;
        if !matches!(field.data_type, DataType::FloatVector { .. }) {
            return Err(SchemaError::TypeMismatch {
                field: params.field_name.clone(),
                expected: "FloatVector".to_string(),
                actual: field.data_type.wire_name().to_string(),
            }
            .into());
        }

        coll.index = Some(params.clone());
        Ok(())
    }

    async fn load_collection(&self, collection: &str) -> Result<(), VectorDbError> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection))?;
        if coll.index.is_none() {
            return Err(VectorDbError::MissingIndex {
                collection: collection.to_string(),
                field: coll.schema.vector_field().name.clone(),
            });
        }
        coll.loaded = true;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, VectorDbError> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| not_found(collection))?;
        Ok(coll.sealed.len() as u64)
    }

    async fn search(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, VectorDbError> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| not_found(collection))?;
        if !coll.loaded {
            return Err(VectorDbError::NotLoaded(collection.to_string()));
        }
        if let Some(index) = &coll.index {
            if index.metric_type != request.params.metric_type {
                return Err(VectorDbError::MetricMismatch {
                    collection: collection.to_string(),
                    indexed: index.metric_type.to_string(),
                    requested: request.params.metric_type.to_string(),
                });
            }
        }
        if request.anns_field != coll.schema.vector_field().name {
            return Err(SchemaError::UnknownField(request.anns_field.clone()).into());
        }
        let dimension = coll.schema.dimension();
        if request.vector.len() != dimension {
            return Err(SchemaError::DimensionMismatch {
                field: request.anns_field.clone(),
                expected: dimension,
                actual: request.vector.len(),
            }
            .into());
        }

        let filter = request.filter.as_deref().filter(|f| !f.trim().is_empty());
        let evaluator = FilterEvaluator::new();
        let metric = request.params.metric_type;

        let mut scored = Vec::new();
        for row in coll.rows() {
            if let Some(expr) = filter {
                if !evaluator.matches(expr, &row.scalars).map_err(filter_error)? {
                    continue;
                }
            }
            scored.push((score(metric, &request.vector, &row.vector), row));
        }

        scored.sort_by(|(a, _), (b, _)| {
            let ord = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            if metric.smaller_is_closer() { ord } else { ord.reverse() }
        });
        scored.truncate(request.limit);

        scored
            .into_iter()
            .map(|(distance, row)| {
                Ok(SearchHit {
                    id: row.key.clone(),
                    distance,
                    fields: coll.project(row, &request.output_fields)?,
                })
            })
            .collect()
    }

    async fn query(
        &self,
        collection: &str,
        request: &QueryRequest,
    ) -> Result<Vec<Row>, VectorDbError> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| not_found(collection))?;
        if !coll.loaded {
            return Err(VectorDbError::NotLoaded(collection.to_string()));
        }

        let evaluator = FilterEvaluator::new();
        let limit = request.limit.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        for row in coll.rows() {
            if rows.len() >= limit {
                break;
            }
            if evaluator
                .matches(&request.filter, &row.scalars)
                .map_err(filter_error)?
            {
                rows.push(coll.project(row, &request.output_fields)?);
            }
        }
        Ok(rows)
    }

    async fn close(&self) -> Result<(), VectorDbError> {
        let collections = self.collections.read().await;
        tracing::debug!(collections = collections.len(), "closing in-memory store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ristobot_types::schema::FieldSchema;
    use ristobot_types::search::SearchParams;

    use super::*;

    fn schema() -> CollectionSchema {
        CollectionSchema::new(
            vec![
                FieldSchema::int64("book_id").primary(),
                FieldSchema::int64("word_count"),
                FieldSchema::float_vector("book_intro", 2),
                FieldSchema::varchar("sentence", 16).with_default(FieldValue::VarChar(String::new())),
            ],
            "books",
        )
        .unwrap()
    }

    fn book(id: i64, words: i64, vector: Vec<f32>) -> Entity {
        Entity::new()
            .with("book_id", id)
            .with("word_count", words)
            .with("book_intro", vector)
    }

    fn search_request(vector: Vec<f32>, limit: usize) -> SearchRequest {
        SearchRequest {
            vector,
            anns_field: "book_intro".to_string(),
            params: SearchParams::new(MetricType::L2),
            limit,
            output_fields: vec!["book_id".to_string()],
            filter: None,
            primary_field: "book_id".to_string(),
        }
    }

    async fn loaded_db() -> InMemoryVectorDb {
        loaded_db_with(MetricType::L2).await
    }

    async fn loaded_db_with(metric: MetricType) -> InMemoryVectorDb {
        let db = InMemoryVectorDb::new();
        db.create_collection("book", &schema()).await.unwrap();
        db.insert(
            "book",
            &[
                book(0, 10_i64, vec![0.0_f32, 0.0]),
                book(1, 20_i64, vec![1.0_f32, 0.0]),
                book(2, 30_i64, vec![0.0_f32, 3.0]),
            ],
        )
        .await
        .unwrap();
        db.flush("book").await.unwrap();
        db.create_index("book", &IndexParams::auto("book_intro", metric))
            .await
            .unwrap();
        db.load_collection("book").await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_twice_is_error() {
        let db = InMemoryVectorDb::new();
        db.create_collection("book", &schema()).await.unwrap();
        let err = db.create_collection("book", &schema()).await.unwrap_err();
        assert!(matches!(err, VectorDbError::CollectionExists(_)));
    }

    #[tokio::test]
    async fn test_drop_missing_is_error() {
        let db = InMemoryVectorDb::new();
        let err = db.drop_collection("nope").await.unwrap_err();
        assert!(matches!(err, VectorDbError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_count_only_sees_flushed_rows() {
        let db = InMemoryVectorDb::new();
        db.create_collection("book", &schema()).await.unwrap();
        db.insert("book", &[book(0, 1_i64, vec![0.0_f32, 1.0])])
            .await
            .unwrap();
        assert_eq!(db.count("book").await.unwrap(), 0);
        db.flush("book").await.unwrap();
        assert_eq!(db.count("book").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_fills_defaults_and_rejects_bad_batch() {
        let db = loaded_db().await;
        let rows = db
            .query("book", &QueryRequest::new("book_id == 0", vec!["sentence".into()]))
            .await
            .unwrap();
        assert_eq!(rows[0]["sentence"], "");

        let bad = vec![
            book(3, 1_i64, vec![0.0_f32, 1.0]),
            book(4, 1_i64, vec![0.0_f32, 1.0, 2.0]),
        ];
        let err = db.insert("book", &bad).await.unwrap_err();
        assert!(matches!(
            err,
            VectorDbError::Schema(SchemaError::DimensionMismatch { .. })
        ));
        db.flush("book").await.unwrap();
        assert_eq!(db.count("book").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_auto_ids_are_sequential() {
        let schema = CollectionSchema::new(
            vec![
                FieldSchema::int64("id").primary().auto_id(),
                FieldSchema::float_vector("v", 2),
            ],
            "",
        )
        .unwrap();
        let db = InMemoryVectorDb::new();
        db.create_collection("auto", &schema).await.unwrap();
        let result = db
            .insert(
                "auto",
                &[
                    Entity::new().with("v", vec![0.0_f32, 1.0]),
                    Entity::new().with("v", vec![1.0_f32, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(result.insert_count, 2);
        assert_eq!(result.ids, vec![PrimaryKey::Int(1), PrimaryKey::Int(2)]);
    }

    #[tokio::test]
    async fn test_load_requires_index() {
        let db = InMemoryVectorDb::new();
        db.create_collection("book", &schema()).await.unwrap();
        let err = db.load_collection("book").await.unwrap_err();
        assert!(matches!(err, VectorDbError::MissingIndex { .. }));
    }

    #[tokio::test]
    async fn test_search_requires_load() {
        let db = InMemoryVectorDb::new();
        db.create_collection("book", &schema()).await.unwrap();
        let err = db
            .search("book", &search_request(vec![0.0, 0.0], 1))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDbError::NotLoaded(_)));
    }

    #[tokio::test]
    async fn test_search_orders_by_l2() {
        let db = loaded_db().await;
        let hits = db
            .search("book", &search_request(vec![0.9, 0.0], 3))
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.clone()).collect();
        assert_eq!(
            ids,
            vec![PrimaryKey::Int(1), PrimaryKey::Int(0), PrimaryKey::Int(2)]
        );
        assert!((hits[0].distance - 0.01).abs() < 1e-5);
        assert_eq!(hits[0].fields["book_id"], 1);
    }

    #[tokio::test]
    async fn test_search_limit_and_filter() {
        let db = loaded_db().await;
        let mut request = search_request(vec![0.0, 0.0], 1);
        request.filter = Some("word_count >= 20".to_string());
        let hits = db.search("book", &request).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, PrimaryKey::Int(1));
    }

    #[tokio::test]
    async fn test_search_dimension_mismatch() {
        let db = loaded_db().await;
        let err = db
            .search("book", &search_request(vec![0.0, 0.0, 0.0], 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VectorDbError::Schema(SchemaError::DimensionMismatch { expected: 2, actual: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_ip_sorts_descending() {
        let db = loaded_db_with(MetricType::IP).await;
        let mut request = search_request(vec![0.0, 1.0], 1);
        request.params = SearchParams::new(MetricType::IP);
        let hits = db.search("book", &request).await.unwrap();
        assert_eq!(hits[0].id, PrimaryKey::Int(2));
        assert!((hits[0].distance - 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_metric_must_match_index() {
        let db = loaded_db().await;
        let mut request = search_request(vec![0.0, 1.0], 1);
        request.params = SearchParams::new(MetricType::IP);
        let err = db.search("book", &request).await.unwrap_err();
        assert!(matches!(
            err,
            VectorDbError::MetricMismatch { ref indexed, ref requested, .. }
                if indexed == "L2" && requested == "IP"
        ));

        request.params = SearchParams::new(MetricType::Cosine);
        assert!(db.search("book", &request).await.is_err());
    }

    #[tokio::test]
    async fn test_query_projects_fields() {
        let db = loaded_db().await;
        let rows = db
            .query(
                "book",
                &QueryRequest::new("book_id == 2", vec!["word_count".into()]),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["book_id"], 2);
        assert_eq!(rows[0]["word_count"], 30);
        assert!(!rows[0].contains_key("book_intro"));
    }

    #[tokio::test]
    async fn test_query_unknown_output_field() {
        let db = loaded_db().await;
        let err = db
            .query("book", &QueryRequest::new("book_id == 2", vec!["nope".into()]))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDbError::Schema(SchemaError::UnknownField(_))));
    }

    #[tokio::test]
    async fn test_query_bad_filter() {
        let db = loaded_db().await;
        let err = db
            .query("book", &QueryRequest::new("", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDbError::Filter(_)));
    }

    #[test]
    fn test_cosine_score() {
        assert!((score(MetricType::Cosine, &[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(score(MetricType::Cosine, &[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
