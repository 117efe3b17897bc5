//! The three entity services over one backend.

use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::info;
use trailstore_query::{Pagination, PaginationResult, QueryResult};

use crate::client::MongoClient;
use crate::config::MongoConfig;
use crate::error::MongoResult;
use crate::memory::MemoryCollection;
use crate::models::{Entity, Journey, Record, Trace};
use crate::pipeline::Projection;
use crate::service::{JourneyService, RecordService, TraceService};
use crate::store::DocumentCollection;

/// Record, journey and trace services sharing one backend.
#[derive(Debug, Clone)]
pub struct Datastore {
    /// Records.
    pub records: RecordService,
    /// Journeys.
    pub journeys: JourneyService,
    /// Traces.
    pub traces: TraceService,
}

impl Datastore {
    /// Build the services from a collection factory.
    pub fn with_collections<F>(mut open: F) -> Self
    where
        F: FnMut(&str) -> Arc<dyn DocumentCollection>,
    {
        Self {
            records: RecordService::new(open(Record::COLLECTION)),
            journeys: JourneyService::new(open(Journey::COLLECTION)),
            traces: TraceService::new(open(Trace::COLLECTION)),
        }
    }

    /// Connect to MongoDB.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let client = MongoClient::new(config).await?;
        Ok(Self::from_client(&client))
    }

    /// Use collections of an existing client.
    pub fn from_client(client: &MongoClient) -> Self {
        Self::with_collections(|name| client.collection_handle(name))
    }

    /// Empty in-memory collections.
    pub fn in_memory() -> Self {
        info!("Using in-memory datastore");
        Self::with_collections(|name| -> Arc<dyn DocumentCollection> {
            Arc::new(MemoryCollection::new(name))
        })
    }

    /// Records selected by the saved filters of trace `id`.
    pub async fn trace_records(
        &self,
        id: ObjectId,
        pagination: Pagination,
        projection: Projection,
    ) -> QueryResult<PaginationResult<Record>> {
        let trace = self.traces.get(id).await?;
        self.records
            .get_filtered(&trace.filter_set(), pagination, projection)
            .await
    }
}
