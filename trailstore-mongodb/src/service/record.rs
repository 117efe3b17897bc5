//! Record-only operations.

use bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use tracing::{info, warn};
use trailstore_query::{FieldPath, FilterSet, Pagination, PaginationResult, QueryError, QueryResult};

use super::CrudService;
use crate::document::{DocumentExt, from_document};
use crate::filter::by_id;
use crate::models::{Record, UPDATED_AT};
use crate::pipeline::{MatchPlan, Projection};

fn writable_path(path: &FieldPath) -> QueryResult<&FieldPath> {
    if path.is_empty() {
        return Err(QueryError::invalid_input("path", "must not be empty"));
    }
    if path.is_identifier() || path.as_str().starts_with("_id.") {
        return Err(QueryError::invalid_input("path", "the identifier is immutable"));
    }
    Ok(path)
}

impl CrudService<Record> {
    /// Every record, paginated, optionally without the bulk payload.
    pub async fn get_all_extended(
        &self,
        projection: Projection,
        pagination: Pagination,
    ) -> QueryResult<PaginationResult<Record>> {
        self.get_filtered(&FilterSet::new(), pagination, projection)
            .await
    }

    /// Raw documents matching `filter_set`.
    ///
    /// Used when the caller wants the stored shape rather than [`Record`].
    pub async fn get_filtered_documents(
        &self,
        filter_set: &FilterSet,
        pagination: Pagination,
        projection: Projection,
    ) -> QueryResult<PaginationResult<Document>> {
        let plan = MatchPlan::from_filter_set(filter_set)?;
        self.run_plan(plan, pagination, projection).await
    }

    /// The value at `path` inside the record with `id`.
    ///
    /// A missing or null value is not found.
    pub async fn get_nested_value(&self, id: ObjectId, path: &FieldPath) -> QueryResult<Bson> {
        let document = self
            .collection()
            .find_one(by_id(id))
            .await?
            .ok_or_else(|| self.not_found("get_nested_value", id))?;

        match document.get_path(path) {
            Some(Bson::Null) | None => Err(QueryError::not_found("value")
                .with_field(path.as_str())
                .with_context(format!("no value at '{}' in record {}", path, id))),
            Some(value) => Ok(value.clone()),
        }
    }

    /// Set `value` at `path` in every record in `ids`, in order.
    ///
    /// Fails on the first id that does not resolve; records before it stay
    /// updated.
    pub async fn update_nested_value(
        &self,
        ids: &[ObjectId],
        path: &FieldPath,
        value: Bson,
    ) -> QueryResult<Vec<Record>> {
        let path = writable_path(path)?;
        let mut updated = Vec::with_capacity(ids.len());

        for &id in ids {
            let mut set = Document::new();
            set.insert(path.as_str(), value.clone());
            set.insert(UPDATED_AT, DateTime::now());

            let document = self
                .collection()
                .find_one_and_update(by_id(id), doc! { "$set": set })
                .await?
                .ok_or_else(|| self.not_found("update_nested_value", id))?;
            updated.push(from_document(document)?);
        }

        info!(path = %path, records = updated.len(), "Updated nested value");
        Ok(updated)
    }

    /// Remove the value at `path` from every record in `ids`.
    ///
    /// Ids that do not resolve are skipped.
    pub async fn delete_nested_value(
        &self,
        ids: &[ObjectId],
        path: &FieldPath,
    ) -> QueryResult<Vec<Record>> {
        let path = writable_path(path)?;
        let mut updated = Vec::with_capacity(ids.len());

        for &id in ids {
            let mut unset = Document::new();
            unset.insert(path.as_str(), "");

            let mut set = Document::new();
            set.insert(UPDATED_AT, DateTime::now());
            let update = doc! { "$unset": unset, "$set": set };
            match self.collection().find_one_and_update(by_id(id), update).await? {
                Some(document) => updated.push(from_document(document)?),
                None => warn!(id = %id, "Skipped unknown record in delete_nested_value"),
            }
        }

        info!(path = %path, records = updated.len(), "Deleted nested value");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCollection;
    use crate::models::{Content, RecordCreateParams};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use trailstore_query::ErrorCode;

    async fn seeded() -> (CrudService<Record>, Record) {
        let service = CrudService::new(Arc::new(MemoryCollection::new("records")));
        let record = service
            .create(&RecordCreateParams::inline(
                "sensor",
                doc! { "rows": [ { "t": 1.5 }, { "t": 2.5 } ], "unit": "C" },
            ))
            .await
            .unwrap();
        (service, record)
    }

    // ========== Nested Value Tests ==========

    #[tokio::test]
    async fn test_get_nested_value_with_brackets() {
        let (service, record) = seeded().await;
        let value = service
            .get_nested_value(record.id, &FieldPath::new("content.data.rows[1].t"))
            .await
            .unwrap();
        assert_eq!(value, Bson::Double(2.5));
    }

    #[tokio::test]
    async fn test_get_nested_value_missing_path() {
        let (service, record) = seeded().await;
        let err = service
            .get_nested_value(record.id, &FieldPath::new("content.data.nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RecordNotFound);
        assert_eq!(err.context.field.as_deref(), Some("content.data.nope"));
    }

    #[tokio::test]
    async fn test_update_nested_value() {
        let (service, record) = seeded().await;
        let updated = service
            .update_nested_value(&[record.id], &FieldPath::new("content.data.unit"), Bson::from("K"))
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(
            updated[0].content.data(),
            Some(&Bson::Document(
                doc! { "rows": [ { "t": 1.5 }, { "t": 2.5 } ], "unit": "K" }
            ))
        );
    }

    #[tokio::test]
    async fn test_update_nested_value_far_index_is_an_error() {
        let (service, record) = seeded().await;
        for path in [
            format!("content.data.rows.{}", usize::MAX),
            "content.data.rows.100000000".to_string(),
        ] {
            let err = service
                .update_nested_value(&[record.id], &FieldPath::new(path), Bson::Int32(1))
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::DatabaseError);
        }

        let rows = service
            .get_nested_value(record.id, &FieldPath::new("content.data.rows"))
            .await
            .unwrap();
        assert_eq!(rows.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_update_nested_value_unknown_id_fails() {
        let (service, record) = seeded().await;
        let err = service
            .update_nested_value(
                &[record.id, ObjectId::new()],
                &FieldPath::new("content.data.unit"),
                Bson::from("K"),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // the first record was already written
        let value = service
            .get_nested_value(record.id, &FieldPath::new("content.data.unit"))
            .await
            .unwrap();
        assert_eq!(value, Bson::from("K"));
    }

    #[tokio::test]
    async fn test_update_nested_value_rejects_identifier() {
        let (service, record) = seeded().await;
        let err = service
            .update_nested_value(&[record.id], &FieldPath::id(), Bson::from("x"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_delete_nested_value_skips_unknown() {
        let (service, record) = seeded().await;
        let updated = service
            .delete_nested_value(&[ObjectId::new(), record.id], &FieldPath::new("content.data.unit"))
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert!(matches!(
            &updated[0].content,
            Content::Inline { data: Some(Bson::Document(data)), .. } if !data.contains_key("unit")
        ));
    }

    // ========== Projection Tests ==========

    #[tokio::test]
    async fn test_get_all_extended_metadata_only() {
        let (service, _) = seeded().await;
        let page = service
            .get_all_extended(Projection::MetadataOnly, Pagination::default())
            .await
            .unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.results[0].content.data(), None);

        let full = service
            .get_all_extended(Projection::Full, Pagination::default())
            .await
            .unwrap();
        assert!(full.results[0].content.data().is_some());
    }
}
