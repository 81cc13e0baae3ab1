//! Vector database trait.
//!
//! Defines the collection lifecycle, ingest, index, and retrieval operations
//! the pipelines need. Implementations (Milvus REST, in-memory) live in
//! ristobot-infra.

use ristobot_types::entity::{Entity, Row};
use ristobot_types::error::VectorDbError;
use ristobot_types::schema::CollectionSchema;
use ristobot_types::search::{IndexParams, InsertResult, QueryRequest, SearchHit, SearchRequest};

/// Trait for a vector database holding named, schema-bound collections.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Every call completes before returning; there is no background work the
/// caller has to wait on.
pub trait VectorDatabase: Send + Sync {
    /// Short backend name for logs (e.g. "milvus", "memory").
    fn backend_name(&self) -> &str;

    /// Names of all collections.
    fn list_collections(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, VectorDbError>> + Send;

    /// Whether a collection with this name exists.
    fn has_collection(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<bool, VectorDbError>> + Send;

    /// Create an empty collection bound to `schema`.
    fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Drop a collection and all of its data.
    fn drop_collection(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Insert rows. Returns the echoed or generated primary keys.
    fn insert(
        &self,
        collection: &str,
        entities: &[Entity],
    ) -> impl std::future::Future<Output = Result<InsertResult, VectorDbError>> + Send;

    /// Make every prior insert durable and visible to reads.
    fn flush(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Build a similarity index over a vector field.
    fn create_index(
        &self,
        collection: &str,
        params: &IndexParams,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Bring the collection into a searchable state.
    fn load_collection(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Number of flushed rows.
    fn count(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<u64, VectorDbError>> + Send;

    /// Nearest-neighbour search, best match first.
    fn search(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> impl std::future::Future<Output = Result<Vec<SearchHit>, VectorDbError>> + Send;

    /// Structured filter query.
    fn query(
        &self,
        collection: &str,
        request: &QueryRequest,
    ) -> impl std::future::Future<Output = Result<Vec<Row>, VectorDbError>> + Send;

    /// End the session. The handle must not be used afterwards.
    fn close(&self) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;
}
