//! MongoDB client wrapper.

use std::sync::Arc;

use bson::{Document, doc};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::error::{MongoError, MongoResult};
use crate::store::{DocumentCollection, MongoCollection};

/// A MongoDB client bound to one database.
///
/// Connection pooling is the driver's; clones share the pool.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
}

impl MongoClient {
    /// Create a new client from configuration.
    pub async fn new(config: MongoConfig) -> MongoResult<Self> {
        let options = config.to_client_options().await?;

        let client = Client::with_options(options)
            .map_err(|e| MongoError::connection(format!("failed to create client: {}", e)))?;

        let database = client.database(&config.database);

        info!(
            database = %config.database,
            app_name = config.app_name.as_deref().unwrap_or(""),
            "MongoDB client created"
        );

        Ok(Self {
            client,
            database,
            config: Arc::new(config),
        })
    }

    /// Create a builder for the client.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::new()
    }

    /// Get a collection of raw documents.
    pub fn collection_doc(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// A shareable collection handle for entity services.
    pub fn collection_handle(&self, name: &str) -> Arc<dyn DocumentCollection> {
        debug!(collection = %name, "Opening collection handle");
        Arc::new(MongoCollection::new(self.collection_doc(name)))
    }

    /// Get the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the underlying MongoDB client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the configuration.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Check if the client is healthy by pinging the server.
    ///
    /// The ping is bounded by the configured connect timeout.
    pub async fn is_healthy(&self) -> bool {
        let ping = self.database.run_command(doc! { "ping": 1 }, None);
        match self.config.connect_timeout {
            Some(limit) => matches!(tokio::time::timeout(limit, ping).await, Ok(Ok(_))),
            None => ping.await.is_ok(),
        }
    }
}

/// Builder for MongoClient.
#[derive(Debug, Default)]
pub struct MongoClientBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    connect_timeout: Option<std::time::Duration>,
    direct_connection: Option<bool>,
}

impl MongoClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: std::time::Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Resolve the configuration without connecting.
    pub fn config(self) -> MongoResult<MongoConfig> {
        let mut config_builder = MongoConfig::builder();

        if let Some(uri) = self.uri {
            config_builder = config_builder.uri(uri);
        }
        if let Some(database) = self.database {
            config_builder = config_builder.database(database);
        }
        if let Some(app_name) = self.app_name {
            config_builder = config_builder.app_name(app_name);
        }
        if let Some(max_pool) = self.max_pool_size {
            config_builder = config_builder.max_pool_size(max_pool);
        }
        if let Some(timeout) = self.connect_timeout {
            config_builder = config_builder.connect_timeout(timeout);
        }
        if let Some(direct) = self.direct_connection {
            config_builder = config_builder.direct_connection(direct);
        }

        config_builder.build()
    }

    /// Build the client.
    pub async fn build(self) -> MongoResult<MongoClient> {
        let config = self.config()?;
        MongoClient::new(config).await
    }
}
