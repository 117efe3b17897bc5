//! # trailstore
//!
//! A typed filter algebra for geotagged records, compiled to MongoDB
//! aggregation pipelines.
//!
//! trailstore provides:
//! - String, number, boolean and geospatial predicates with negation
//! - AND/OR concatenations and ordered, conjunctive filter sets
//! - Pagination with a total count taken before skip/limit
//! - Record, journey and trace services over MongoDB or in memory
//!
//! ## Quick Start
//!
//! ```rust
//! use trailstore::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let store = Datastore::in_memory();
//! store
//!     .records
//!     .create(&RecordCreateParams::inline("ride", doc! { "km": 12 }).tags(["bike"]))
//!     .await?;
//!
//! let filters = FilterSet::new()
//!     .push(Filter::contains("tags", "bik"))
//!     .push(Filter::gte("content.data.km", 10));
//!
//! let page = store
//!     .records
//!     .get_filtered(&filters, Pagination::default(), Projection::Full)
//!     .await?;
//! assert_eq!(page.total_count, 1);
//! # Ok::<(), QueryError>(())
//! # }).unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Store-agnostic filter algebra, pagination and errors.
pub mod query {
    pub use trailstore_query::*;
}

/// MongoDB compiler, pipelines and entity services.
pub mod mongodb {
    pub use trailstore_mongodb::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use trailstore_mongodb::models::{
        JourneyCollection, JourneyCreateParams, RecordCreateParams, TraceCreateParams,
    };
    pub use trailstore_mongodb::prelude::*;
}

// Re-export key types at the crate root
pub use trailstore_mongodb::{Datastore, MongoConfig, Projection};
pub use trailstore_query::{
    AnyFilter, ConcatenationFilter, Filter, FilterSet, Pagination, PaginationResult, QueryError,
    QueryResult,
};
