//! The collection seam between entity services and a document store.

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use tracing::debug;

use crate::error::{MongoError, MongoResult};

/// The operations entity services need from one collection.
///
/// Implemented by [`MongoCollection`] for a live server and by
/// [`MemoryCollection`](crate::memory::MemoryCollection) for tests and
/// embedding.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Run an aggregation pipeline.
    async fn aggregate(&self, pipeline: Vec<Document>) -> MongoResult<Vec<Document>>;

    /// All documents matching `filter`, in stored order.
    async fn find(&self, filter: Document) -> MongoResult<Vec<Document>>;

    /// The first document matching `filter`.
    async fn find_one(&self, filter: Document) -> MongoResult<Option<Document>>;

    /// Insert a document, returning its identifier.
    async fn insert_one(&self, document: Document) -> MongoResult<ObjectId>;

    /// Apply an update to the first match and return it as updated.
    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> MongoResult<Option<Document>>;

    /// Delete the first match and return it.
    async fn find_one_and_delete(&self, filter: Document) -> MongoResult<Option<Document>>;

    /// Delete every match, returning how many were removed.
    async fn delete_many(&self, filter: Document) -> MongoResult<u64>;
}

/// [`DocumentCollection`] over a MongoDB collection.
#[derive(Clone)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

impl MongoCollection {
    /// Wrap a driver collection.
    pub fn new(inner: Collection<Document>) -> Self {
        Self { inner }
    }

    /// The driver collection.
    pub fn inner(&self) -> &Collection<Document> {
        &self.inner
    }
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> MongoResult<Vec<Document>> {
        debug!(collection = %self.name(), stages = pipeline.len(), "Running aggregation");
        let cursor = self.inner.aggregate(pipeline, None).await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }

    async fn find(&self, filter: Document) -> MongoResult<Vec<Document>> {
        debug!(collection = %self.name(), filter = %filter, "Finding documents");
        let cursor = self.inner.find(filter, None).await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }

    async fn find_one(&self, filter: Document) -> MongoResult<Option<Document>> {
        Ok(self.inner.find_one(filter, None).await?)
    }

    async fn insert_one(&self, document: Document) -> MongoResult<ObjectId> {
        let result = self.inner.insert_one(document, None).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| MongoError::Internal("inserted _id is not an ObjectId".to_string()))
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> MongoResult<Option<Document>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .inner
            .find_one_and_update(filter, update, options)
            .await?)
    }

    async fn find_one_and_delete(&self, filter: Document) -> MongoResult<Option<Document>> {
        Ok(self.inner.find_one_and_delete(filter, None).await?)
    }

    async fn delete_many(&self, filter: Document) -> MongoResult<u64> {
        let result = self.inner.delete_many(filter, None).await?;
        Ok(result.deleted_count)
    }
}
