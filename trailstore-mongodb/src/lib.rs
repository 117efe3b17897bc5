//! # trailstore-mongodb
//!
//! MongoDB backend for trailstore: the filter compiler, aggregation
//! pipelines and the record, journey and trace services.
//!
//! This crate provides:
//! - Predicate builders and the filter/concatenation compiler
//! - Pipeline assembly with pagination and metadata-only projection
//! - A [`DocumentCollection`] seam with MongoDB and in-memory backends
//! - Entity models and one generic CRUD service
//!
//! ## Example
//!
//! ```rust,ignore
//! use trailstore_mongodb::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Datastore::connect(MongoConfig::from_env()?).await?;
//!
//!     let filters = FilterSet::from_json_str(r#"{
//!         "filterSet": [
//!             { "key": "tags", "operation": "CONTAINS", "value": "photo" },
//!             { "key": "content.location", "operation": "RADIUS",
//!               "value": { "center": [13.418964, 52.530173], "radius": 10 } }
//!         ]
//!     }"#)?;
//!
//!     let page = store
//!         .records
//!         .get_filtered(&filters, Pagination::new(0, 20)?, Projection::MetadataOnly)
//!         .await?;
//!     println!("{} of {}", page.len(), page.total_count);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod datastore;
pub mod document;
pub mod error;
pub mod filter;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod store;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use client::{MongoClient, MongoClientBuilder};
pub use config::{MongoConfig, MongoConfigBuilder};
pub use datastore::Datastore;
pub use error::{MongoError, MongoResult};
pub use filter::{compile_any, compile_concatenation, compile_filter};
pub use memory::MemoryCollection;
pub use pipeline::{
    MatchPlan, PipelineBuilder, Projection, build_count_pipeline, build_pipeline,
    build_pipeline_with, count_stages, listing_stages,
};
pub use service::{CrudService, JourneyService, RecordService, TraceService};
pub use store::{DocumentCollection, MongoCollection};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{MongoConfig, MongoConfigBuilder};
    pub use crate::datastore::Datastore;
    pub use crate::document::DocumentExt;
    pub use crate::error::{MongoError, MongoResult};
    pub use crate::filter::{compile_any, compile_concatenation, compile_filter};
    pub use crate::memory::MemoryCollection;
    pub use crate::models::{Entity, Journey, Record, Trace, Visibility};
    pub use crate::pipeline::{MatchPlan, PipelineBuilder, Projection, stages};
    pub use crate::service::{CrudService, JourneyService, RecordService, TraceService};
    pub use crate::store::DocumentCollection;
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
    pub use trailstore_query::prelude::*;
}
