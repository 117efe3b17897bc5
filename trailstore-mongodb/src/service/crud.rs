//! Generic entity service.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::{DateTime, Document, doc, oid::ObjectId};
use tracing::{debug, info, warn};
use trailstore_query::{FilterSet, Pagination, PaginationResult, QueryError, QueryResult};

use crate::document::{from_document, to_document};
use crate::filter::{by_id, by_ids};
use crate::models::{CREATED_AT, Entity, UPDATED_AT};
use crate::pipeline::{MatchPlan, Projection, count_stages, listing_stages, read_count};
use crate::store::DocumentCollection;

/// CRUD and filtered listing for one entity type.
///
/// All filtering goes through the shared filter compiler; the service only
/// owns its collection handle.
pub struct CrudService<E: Entity> {
    collection: Arc<dyn DocumentCollection>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for CrudService<E> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for CrudService<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudService")
            .field("model", &E::MODEL_NAME)
            .field("collection", &self.collection.name())
            .finish()
    }
}

impl<E: Entity> CrudService<E> {
    /// Create a service over `collection`.
    pub fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        Self {
            collection,
            _entity: PhantomData,
        }
    }

    /// The collection handle.
    pub fn collection(&self) -> &Arc<dyn DocumentCollection> {
        &self.collection
    }

    pub(crate) fn not_found(&self, operation: &str, id: ObjectId) -> QueryError {
        QueryError::not_found(E::MODEL_NAME).with_context(format!("{} {}", operation, id))
    }

    /// Every entity, paginated.
    pub async fn get_all(&self, pagination: Pagination) -> QueryResult<PaginationResult<E>> {
        self.get_filtered(&FilterSet::new(), pagination, Projection::Full)
            .await
    }

    /// The entity with `id`.
    pub async fn get(&self, id: ObjectId) -> QueryResult<E> {
        let document = self
            .collection
            .find_one(by_id(id))
            .await?
            .ok_or_else(|| self.not_found("get", id))?;
        from_document(document)
    }

    /// Store a new entity and return it.
    pub async fn create(&self, params: &E::CreateParams) -> QueryResult<E> {
        let id = ObjectId::new();
        let now = DateTime::now();

        let mut document = doc! { "_id": id };
        for (key, value) in to_document(params)? {
            document.insert(key, value);
        }
        document.insert(CREATED_AT, now);
        document.insert(UPDATED_AT, now);

        self.collection.insert_one(document.clone()).await?;
        info!(model = E::MODEL_NAME, id = %id, "Created entity");
        from_document(document)
    }

    /// Apply `params` to the entity with `id` and return the result.
    pub async fn update(&self, id: ObjectId, params: &E::UpdateParams) -> QueryResult<E> {
        let mut set = to_document(params)?;
        set.insert(UPDATED_AT, DateTime::now());

        let document = self
            .collection
            .find_one_and_update(by_id(id), doc! { "$set": set })
            .await?
            .ok_or_else(|| self.not_found("update", id))?;
        info!(model = E::MODEL_NAME, id = %id, "Updated entity");
        from_document(document)
    }

    /// Remove the entity with `id` and return it.
    pub async fn delete(&self, id: ObjectId) -> QueryResult<E> {
        let document = self
            .collection
            .find_one_and_delete(by_id(id))
            .await?
            .ok_or_else(|| self.not_found("delete", id))?;
        info!(model = E::MODEL_NAME, id = %id, "Deleted entity");
        from_document(document)
    }

    /// Remove every entity whose id is in `ids`.
    ///
    /// Returns the entities that existed. Unknown ids are skipped without
    /// error.
    pub async fn delete_many(&self, ids: &[ObjectId]) -> QueryResult<Vec<E>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let distinct: HashSet<ObjectId> = ids.iter().copied().collect();
        let filter = by_ids(ids);
        let found = self.collection.find(filter.clone()).await?;
        let deleted = self.collection.delete_many(filter).await?;

        if found.len() < distinct.len() {
            warn!(
                model = E::MODEL_NAME,
                requested = distinct.len(),
                found = found.len(),
                "Skipped unknown ids in delete_many"
            );
        }
        info!(model = E::MODEL_NAME, deleted, "Deleted entities");

        found.into_iter().map(from_document).collect()
    }

    /// Entities matching `filter_set`, paginated.
    ///
    /// `total_count` is read with a separate count pipeline before the page
    /// is fetched; the two reads are not isolated from concurrent writes.
    pub async fn get_filtered(
        &self,
        filter_set: &FilterSet,
        pagination: Pagination,
        projection: Projection,
    ) -> QueryResult<PaginationResult<E>> {
        let plan = MatchPlan::from_filter_set(filter_set)?;
        let documents = self.run_plan(plan, pagination, projection).await?;
        documents.try_map(from_document)
    }

    pub(crate) async fn run_plan(
        &self,
        plan: MatchPlan,
        pagination: Pagination,
        projection: Projection,
    ) -> QueryResult<PaginationResult<Document>> {
        let count = count_stages(plan.clone());
        let total_count = read_count(&self.collection.aggregate(count).await?);

        let pipeline = listing_stages(plan, &pagination, projection, E::BULK_DATA_FIELD);
        let results = self.collection.aggregate(pipeline).await?;

        debug!(
            model = E::MODEL_NAME,
            total_count,
            returned = results.len(),
            "Filtered query complete"
        );
        Ok(PaginationResult::new(&pagination, total_count, results))
    }
}
