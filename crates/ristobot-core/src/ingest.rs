//! Schema-checked ingest into a single collection.

use ristobot_types::entity::Entity;
use ristobot_types::error::VectorDbError;
use ristobot_types::schema::CollectionSchema;
use ristobot_types::search::InsertResult;

use crate::vectordb::VectorDatabase;

/// Inserts rows into one collection after validating them against its schema.
///
/// Every row is checked before anything is sent, so a single bad vector
/// dimension rejects the whole batch. No chunking: the caller's batch is
/// submitted as-is.
pub struct Ingestor<'a, D: VectorDatabase> {
    db: &'a D,
    collection: &'a str,
    schema: &'a CollectionSchema,
}

impl<'a, D: VectorDatabase> Ingestor<'a, D> {
    pub fn new(db: &'a D, collection: &'a str, schema: &'a CollectionSchema) -> Self {
        Self {
            db,
            collection,
            schema,
        }
    }

    /// Validate and insert `entities`.
    pub async fn insert(&self, entities: &[Entity]) -> Result<InsertResult, VectorDbError> {
        for entity in entities {
            entity.validate(self.schema)?;
        }

        let result = self.db.insert(self.collection, entities).await?;
        if result.insert_count != entities.len() as u64 {
            return Err(VectorDbError::InvalidResponse(format!(
                "inserted {} of {} rows into '{}'",
                result.insert_count,
                entities.len(),
                self.collection
            )));
        }

        tracing::debug!(
            collection = self.collection,
            rows = result.insert_count,
            "rows inserted"
        );
        Ok(result)
    }

    /// Block until inserted rows are durable and visible.
    pub async fn flush(&self) -> Result<(), VectorDbError> {
        self.db.flush(self.collection).await
    }
}
