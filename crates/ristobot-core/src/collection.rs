//! Collection lifecycle helpers.
//!
//! The demo pipelines always start from a clean collection: an existing
//! collection with the same name is dropped before a fresh one is created
//! from the schema. There is no rollback: if creation fails after the drop,
//! the collection stays absent.

use ristobot_types::error::VectorDbError;
use ristobot_types::schema::CollectionSchema;

use crate::vectordb::VectorDatabase;

/// Drop `name` if it exists. Returns whether a drop happened.
pub async fn drop_if_exists<D: VectorDatabase>(db: &D, name: &str) -> Result<bool, VectorDbError> {
    if db.has_collection(name).await? {
        tracing::info!(collection = name, backend = db.backend_name(), "dropping existing collection");
        db.drop_collection(name).await?;
        Ok(true)
    } else {
        tracing::debug!(collection = name, "no existing collection to drop");
        Ok(false)
    }
}

/// Drop-then-create. Returns whether an existing collection was dropped.
pub async fn reset_collection<D: VectorDatabase>(
    db: &D,
    name: &str,
    schema: &CollectionSchema,
) -> Result<bool, VectorDbError> {
    let dropped = drop_if_exists(db, name).await?;
    db.create_collection(name, schema).await?;
    tracing::info!(collection = name, fields = schema.fields().len(), "collection created");
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ristobot_types::entity::{Entity, Row};
    use ristobot_types::schema::FieldSchema;
    use ristobot_types::search::{IndexParams, InsertResult, QueryRequest, SearchHit, SearchRequest};

    use super::*;

    /// Records the lifecycle calls it receives; only collection CRUD is used.
    #[derive(Default)]
    struct RecordingDb {
        existing: Mutex<Vec<String>>,
        calls: Mutex<Vec<String>>,
        fail_create: bool,
    }

    impl RecordingDb {
        fn with_existing(name: &str) -> Self {
            Self {
                existing: Mutex::new(vec![name.to_string()]),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl VectorDatabase for RecordingDb {
        fn backend_name(&self) -> &str {
            "recording"
        }

        async fn list_collections(&self) -> Result<Vec<String>, VectorDbError> {
            Ok(self.existing.lock().unwrap().clone())
        }

        async fn has_collection(&self, name: &str) -> Result<bool, VectorDbError> {
            self.calls.lock().unwrap().push(format!("has:{name}"));
            Ok(self.existing.lock().unwrap().iter().any(|n| n == name))
        }

        async fn create_collection(
            &self,
            name: &str,
            _schema: &CollectionSchema,
        ) -> Result<(), VectorDbError> {
            self.calls.lock().unwrap().push(format!("create:{name}"));
            if self.fail_create {
                return Err(VectorDbError::Server {
                    code: 65535,
                    message: "create failed".to_string(),
                });
            }
            self.existing.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn drop_collection(&self, name: &str) -> Result<(), VectorDbError> {
            self.calls.lock().unwrap().push(format!("drop:{name}"));
            self.existing.lock().unwrap().retain(|n| n != name);
            Ok(())
        }

        async fn insert(&self, _: &str, _: &[Entity]) -> Result<InsertResult, VectorDbError> {
            unimplemented!()
        }

        async fn flush(&self, _: &str) -> Result<(), VectorDbError> {
            unimplemented!()
        }

        async fn create_index(&self, _: &str, _: &IndexParams) -> Result<(), VectorDbError> {
            unimplemented!()
        }

        async fn load_collection(&self, _: &str) -> Result<(), VectorDbError> {
            unimplemented!()
        }

        async fn count(&self, _: &str) -> Result<u64, VectorDbError> {
            unimplemented!()
        }

        async fn search(&self, _: &str, _: &SearchRequest) -> Result<Vec<SearchHit>, VectorDbError> {
            unimplemented!()
        }

        async fn query(&self, _: &str, _: &QueryRequest) -> Result<Vec<Row>, VectorDbError> {
            unimplemented!()
        }

        async fn close(&self) -> Result<(), VectorDbError> {
            Ok(())
        }
    }

    fn schema() -> CollectionSchema {
        CollectionSchema::new(
            vec![
                FieldSchema::int64("id").primary().auto_id(),
                FieldSchema::float_vector("ristodata", 4),
            ],
            "test",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_drop_existing_before_create() {
        let db = RecordingDb::with_existing("ristobot");
        assert!(drop_if_exists(&db, "ristobot").await.unwrap());
        db.create_collection("ristobot", &schema()).await.unwrap();
        assert_eq!(
            db.calls(),
            vec!["has:ristobot", "drop:ristobot", "create:ristobot"]
        );
        assert_eq!(db.list_collections().await.unwrap(), vec!["ristobot"]);
    }

    #[tokio::test]
    async fn test_missing_collection_skips_drop() {
        let db = RecordingDb::default();
        assert!(!drop_if_exists(&db, "book").await.unwrap());
        assert_eq!(db.calls(), vec!["has:book"]);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_collection_absent() {
        let db = RecordingDb {
            existing: Mutex::new(vec!["book".to_string()]),
            fail_create: true,
            ..Default::default()
        };
        assert!(reset_collection(&db, "book", &schema()).await.is_err());
        assert!(!db.has_collection("book").await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_drops_existing_before_create() {
        let db = RecordingDb::with_existing("ristobot");
        assert!(reset_collection(&db, "ristobot", &schema()).await.unwrap());
        assert_eq!(
            db.calls(),
            vec!["has:ristobot", "drop:ristobot", "create:ristobot"]
        );
    }

    #[tokio::test]
    async fn test_reset_without_existing_skips_drop() {
        let db = RecordingDb::default();
        assert!(!reset_collection(&db, "book", &schema()).await.unwrap());
        assert_eq!(db.calls(), vec!["has:book", "create:book"]);
    }
}
