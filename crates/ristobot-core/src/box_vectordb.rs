//! BoxVectorDatabase -- object-safe dynamic dispatch wrapper for VectorDatabase.
//!
//! Same blanket-impl pattern used for every RPITIT trait in this crate:
//! 1. Define an object-safe `VectorDatabaseDyn` trait with boxed futures
//! 2. Blanket-impl `VectorDatabaseDyn` for all `T: VectorDatabase`
//! 3. `BoxVectorDatabase` wraps `Box<dyn VectorDatabaseDyn>` and delegates
//!
//! Unlike a plain wrapper, `BoxVectorDatabase` itself implements
//! [`VectorDatabase`], so the pipelines accept it wherever they accept a
//! concrete backend.

use std::future::Future;
use std::pin::Pin;

use ristobot_types::entity::{Entity, Row};
use ristobot_types::error::VectorDbError;
use ristobot_types::schema::CollectionSchema;
use ristobot_types::search::{IndexParams, InsertResult, QueryRequest, SearchHit, SearchRequest};

use crate::vectordb::VectorDatabase;

type DbFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, VectorDbError>> + Send + 'a>>;

/// Object-safe version of [`VectorDatabase`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn VectorDatabaseDyn`).
/// A blanket implementation is provided for all types implementing `VectorDatabase`.
pub trait VectorDatabaseDyn: Send + Sync {
    fn backend_name_dyn(&self) -> &str;

    fn list_collections_boxed(&self) -> DbFuture<'_, Vec<String>>;

    fn has_collection_boxed<'a>(&'a self, name: &'a str) -> DbFuture<'a, bool>;

    fn create_collection_boxed<'a>(
        &'a self,
        name: &'a str,
        schema: &'a CollectionSchema,
    ) -> DbFuture<'a, ()>;

    fn drop_collection_boxed<'a>(&'a self, name: &'a str) -> DbFuture<'a, ()>;

    fn insert_boxed<'a>(
        &'a self,
        collection: &'a str,
        entities: &'a [Entity],
    ) -> DbFuture<'a, InsertResult>;

    fn flush_boxed<'a>(&'a self, collection: &'a str) -> DbFuture<'a, ()>;

    fn create_index_boxed<'a>(
        &'a self,
        collection: &'a str,
        params: &'a IndexParams,
    ) -> DbFuture<'a, ()>;

    fn load_collection_boxed<'a>(&'a self, collection: &'a str) -> DbFuture<'a, ()>;

    fn count_boxed<'a>(&'a self, collection: &'a str) -> DbFuture<'a, u64>;

    fn search_boxed<'a>(
        &'a self,
        collection: &'a str,
        request: &'a SearchRequest,
    ) -> DbFuture<'a, Vec<SearchHit>>;

    fn query_boxed<'a>(
        &'a self,
        collection: &'a str,
        request: &'a QueryRequest,
    ) -> DbFuture<'a, Vec<Row>>;

    fn close_boxed(&self) -> DbFuture<'_, ()>;
}

/// Blanket implementation: any `VectorDatabase` automatically implements `VectorDatabaseDyn`.
impl<T: VectorDatabase> VectorDatabaseDyn for T {
    fn backend_name_dyn(&self) -> &str {
        self.backend_name()
    }

    fn list_collections_boxed(&self) -> DbFuture<'_, Vec<String>> {
        Box::pin(self.list_collections())
    }

    fn has_collection_boxed<'a>(&'a self, name: &'a str) -> DbFuture<'a, bool> {
        Box::pin(self.has_collection(name))
    }

    fn create_collection_boxed<'a>(
        &'a self,
        name: &'a str,
        schema: &'a CollectionSchema,
    ) -> DbFuture<'a, ()> {
        Box::pin(self.create_collection(name, schema))
    }

    fn drop_collection_boxed<'a>(&'a self, name: &'a str) -> DbFuture<'a, ()> {
        Box::pin(self.drop_collection(name))
    }

    fn insert_boxed<'a>(
        &'a self,
        collection: &'a str,
        entities: &'a [Entity],
    ) -> DbFuture<'a, InsertResult> {
        Box::pin(self.insert(collection, entities))
    }

    fn flush_boxed<'a>(&'a self, collection: &'a str) -> DbFuture<'a, ()> {
        Box::pin(self.flush(collection))
    }

    fn create_index_boxed<'a>(
        &'a self,
        collection: &'a str,
        params: &'a IndexParams,
    ) -> DbFuture<'a, ()> {
        Box::pin(self.create_index(collection, params))
    }

    fn load_collection_boxed<'a>(&'a self, collection: &'a str) -> DbFuture<'a, ()> {
        Box::pin(self.load_collection(collection))
    }

    fn count_boxed<'a>(&'a self, collection: &'a str) -> DbFuture<'a, u64> {
        Box::pin(self.count(collection))
    }

    fn search_boxed<'a>(
        &'a self,
        collection: &'a str,
        request: &'a SearchRequest,
    ) -> DbFuture<'a, Vec<SearchHit>> {
        Box::pin(self.search(collection, request))
    }

    fn query_boxed<'a>(
        &'a self,
        collection: &'a str,
        request: &'a QueryRequest,
    ) -> DbFuture<'a, Vec<Row>> {
        Box::pin(self.query(collection, request))
    }

    fn close_boxed(&self) -> DbFuture<'_, ()> {
        Box::pin(self.close())
    }
}

/// Type-erased vector database for runtime backend selection.
///
/// Wraps any `VectorDatabase` implementation behind dynamic dispatch,
/// enabling `--backend milvus` or `--backend memory` to be chosen at runtime.
pub struct BoxVectorDatabase {
    inner: Box<dyn VectorDatabaseDyn + Send + Sync>,
}

impl BoxVectorDatabase {
    /// Wrap a concrete `VectorDatabase` in a type-erased box.
    pub fn new<T: VectorDatabase + 'static>(db: T) -> Self {
        Self {
            inner: Box::new(db),
        }
    }
}

impl VectorDatabase for BoxVectorDatabase {
    fn backend_name(&self) -> &str {
        self.inner.backend_name_dyn()
    }

    fn list_collections(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, VectorDbError>> + Send {
        async move { self.inner.list_collections_boxed().await }
    }

    fn has_collection(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<bool, VectorDbError>> + Send {
        async move { self.inner.has_collection_boxed(name).await }
    }

    fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
    ) -> impl Future<Output = Result<(), VectorDbError>> + Send {
        async move { self.inner.create_collection_boxed(name, schema).await }
    }

    fn drop_collection(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<(), VectorDbError>> + Send {
        async move { self.inner.drop_collection_boxed(name).await }
    }

    fn insert(
        &self,
        collection: &str,
        entities: &[Entity],
    ) -> impl Future<Output = Result<InsertResult, VectorDbError>> + Send {
        async move { self.inner.insert_boxed(collection, entities).await }
    }

    fn flush(&self, collection: &str) -> impl Future<Output = Result<(), VectorDbError>> + Send {
        async move { self.inner.flush_boxed(collection).await }
    }

    fn create_index(
        &self,
        collection: &str,
        params: &IndexParams,
    ) -> impl Future<Output = Result<(), VectorDbError>> + Send {
        async move { self.inner.create_index_boxed(collection, params).await }
    }

    fn load_collection(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<(), VectorDbError>> + Send {
        async move { self.inner.load_collection_boxed(collection).await }
    }

    fn count(&self, collection: &str) -> impl Future<Output = Result<u64, VectorDbError>> + Send {
        async move { self.inner.count_boxed(collection).await }
    }

    fn search(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<Vec<SearchHit>, VectorDbError>> + Send {
        async move { self.inner.search_boxed(collection, request).await }
    }

    fn query(
        &self,
        collection: &str,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<Vec<Row>, VectorDbError>> + Send {
        async move { self.inner.query_boxed(collection, request).await }
    }

    fn close(&self) -> impl Future<Output = Result<(), VectorDbError>> + Send {
        async move { self.inner.close_boxed().await }
    }
}
