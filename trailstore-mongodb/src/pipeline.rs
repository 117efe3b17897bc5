//! Aggregation pipelines for filtered, paginated listings.
//!
//! A filter set compiles to a [`MatchPlan`]: one conjunct per filter-set
//! entry. The plan is a conjunction by construction; emitting it as one
//! `$match` stage per entry ([`MatchPlan::into_stages`]) and as a single
//! `$match` over `$and` ([`MatchPlan::to_single_match`]) select the same
//! documents.
//!
//! ```rust
//! use bson::doc;
//! use trailstore_mongodb::pipeline::{Projection, build_pipeline};
//! use trailstore_query::{Filter, FilterSet, Pagination};
//!
//! let set = FilterSet::new().push(Filter::is("public", true));
//! let pipeline = build_pipeline(&set, &Pagination::new(20, 10).unwrap(), Projection::MetadataOnly)
//!     .unwrap();
//!
//! assert_eq!(
//!     pipeline,
//!     vec![
//!         doc! { "$match": { "public": { "$eq": true } } },
//!         doc! { "$skip": 20_i64 },
//!         doc! { "$limit": 10_i64 },
//!         doc! { "$unset": ["content.data"] },
//!     ]
//! );
//! ```

use bson::{Bson, Document, doc};
use tracing::debug;
use trailstore_query::{FilterSet, Pagination, QueryResult};

use crate::filter::compile_any;

/// Field the count pipeline writes the number of matches to.
pub const COUNT_FIELD: &str = "totalCount";

/// Bulk payload that metadata-only listings drop.
pub const BULK_DATA_FIELD: &str = "content.data";

/// Which parts of each document a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Projection {
    /// Entire documents.
    #[default]
    Full,
    /// Everything except the bulk payload.
    MetadataOnly,
}

impl Projection {
    /// `MetadataOnly` when `only_metadata` is set.
    pub fn from_only_metadata(only_metadata: bool) -> Self {
        if only_metadata {
            Self::MetadataOnly
        } else {
            Self::Full
        }
    }
}

/// Conjunction of compiled filter-set entries, in filter-set order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPlan {
    conjuncts: Vec<Document>,
}

impl MatchPlan {
    /// A plan that matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Compile every entry of `filter_set`.
    pub fn from_filter_set(filter_set: &FilterSet) -> QueryResult<Self> {
        let conjuncts = filter_set
            .iter()
            .map(compile_any)
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Self { conjuncts })
    }

    /// Add one more conjunct.
    pub fn and(mut self, predicate: Document) -> Self {
        self.conjuncts.push(predicate);
        self
    }

    /// The compiled predicates.
    pub fn conjuncts(&self) -> &[Document] {
        &self.conjuncts
    }

    /// Whether the plan matches every document.
    pub fn is_empty(&self) -> bool {
        self.conjuncts.is_empty()
    }

    /// One `$match` stage per conjunct.
    pub fn into_stages(self) -> Vec<Document> {
        self.conjuncts.into_iter().map(stages::match_stage).collect()
    }

    /// One `$match` stage over the whole conjunction.
    pub fn to_single_match(&self) -> Document {
        let filter = match self.conjuncts.as_slice() {
            [] => Document::new(),
            [only] => only.clone(),
            many => doc! { "$and": many.iter().cloned().map(Bson::Document).collect::<Vec<_>>() },
        };
        stages::match_stage(filter)
    }
}

/// Builder for aggregation pipelines.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    pipeline: Vec<Document>,
}

impl PipelineBuilder {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the match stages of a plan.
    pub fn match_plan(mut self, plan: MatchPlan) -> Self {
        self.pipeline.extend(plan.into_stages());
        self
    }

    /// Add a $match stage.
    pub fn match_stage(mut self, filter: Document) -> Self {
        self.pipeline.push(stages::match_stage(filter));
        self
    }

    /// Add a $skip stage.
    pub fn skip(mut self, n: u64) -> Self {
        self.pipeline.push(stages::skip(n));
        self
    }

    /// Add a $limit stage.
    pub fn limit(mut self, n: u64) -> Self {
        self.pipeline.push(stages::limit(n));
        self
    }

    /// Add $skip then $limit for a window.
    pub fn paginate(self, pagination: &Pagination) -> Self {
        self.skip(pagination.skip()).limit(pagination.limit())
    }

    /// Add an $unset stage.
    pub fn unset<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pipeline.push(stages::unset(fields));
        self
    }

    /// Drop `bulk_field` when the projection is metadata-only.
    pub fn project(self, projection: Projection, bulk_field: Option<&str>) -> Self {
        match (projection, bulk_field) {
            (Projection::MetadataOnly, Some(field)) => self.unset([field]),
            _ => self,
        }
    }

    /// Add a $count stage.
    pub fn count(mut self, field: impl Into<String>) -> Self {
        self.pipeline.push(stages::count(field));
        self
    }

    /// Number of stages so far.
    pub fn len(&self) -> usize {
        self.pipeline.len()
    }

    /// Whether no stage was added.
    pub fn is_empty(&self) -> bool {
        self.pipeline.is_empty()
    }

    /// Finish the pipeline.
    pub fn build(self) -> Vec<Document> {
        debug!(stages = self.pipeline.len(), "Built aggregation pipeline");
        self.pipeline
    }
}

/// Listing stages for `plan`: match stages, `$skip`, `$limit`, then the
/// projection of `bulk_field`.
pub fn listing_stages(
    plan: MatchPlan,
    pagination: &Pagination,
    projection: Projection,
    bulk_field: Option<&str>,
) -> Vec<Document> {
    PipelineBuilder::new()
        .match_plan(plan)
        .paginate(pagination)
        .project(projection, bulk_field)
        .build()
}

/// Count stages for `plan`: match stages, then `{ $count: "totalCount" }`.
///
/// The store returns no document at all when nothing matches.
pub fn count_stages(plan: MatchPlan) -> Vec<Document> {
    PipelineBuilder::new().match_plan(plan).count(COUNT_FIELD).build()
}

/// Record listing pipeline; metadata-only drops [`BULK_DATA_FIELD`].
pub fn build_pipeline(
    filter_set: &FilterSet,
    pagination: &Pagination,
    projection: Projection,
) -> QueryResult<Vec<Document>> {
    build_pipeline_with(filter_set, pagination, projection, Some(BULK_DATA_FIELD))
}

/// Listing pipeline for an entity whose bulk payload is `bulk_field`.
pub fn build_pipeline_with(
    filter_set: &FilterSet,
    pagination: &Pagination,
    projection: Projection,
    bulk_field: Option<&str>,
) -> QueryResult<Vec<Document>> {
    let plan = MatchPlan::from_filter_set(filter_set)?;
    Ok(listing_stages(plan, pagination, projection, bulk_field))
}

/// Count pipeline for `filter_set`; see [`count_stages`].
pub fn build_count_pipeline(filter_set: &FilterSet) -> QueryResult<Vec<Document>> {
    MatchPlan::from_filter_set(filter_set).map(count_stages)
}

/// Read the result of a count pipeline.
pub fn read_count(results: &[Document]) -> u64 {
    results
        .first()
        .and_then(|doc| doc.get(COUNT_FIELD))
        .and_then(crate::document::bson_as_f64)
        .map(|n| n as u64)
        .unwrap_or(0)
}

/// Helper functions for the stages trailstore emits.
pub mod stages {
    use bson::{Document, doc};

    fn clamp(n: u64) -> i64 {
        i64::try_from(n).unwrap_or(i64::MAX)
    }

    /// Create a $match stage.
    pub fn match_stage(filter: Document) -> Document {
        doc! { "$match": filter }
    }

    /// Create a $skip stage.
    pub fn skip(n: u64) -> Document {
        doc! { "$skip": clamp(n) }
    }

    /// Create a $limit stage.
    pub fn limit(n: u64) -> Document {
        doc! { "$limit": clamp(n) }
    }

    /// Create an $unset stage.
    pub fn unset<I, S>(fields: I) -> Document
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        doc! { "$unset": fields }
    }

    /// Create a $count stage.
    pub fn count(field: impl Into<String>) -> Document {
        doc! { "$count": field.into() }
    }
}
