//! MongoDB connection configuration.

use std::time::Duration;

use mongodb::options::{
    Acknowledgment, ClientOptions, ReadPreference as DriverReadPreference, SelectionCriteria,
};
use trailstore_query::env::{EnvSource, StdEnvSource};

use crate::error::{MongoError, MongoResult};

/// Connection URI variable.
pub const URL_VAR: &str = "MONGODB_URL";
/// Database name override variable.
pub const DATABASE_VAR: &str = "TRAILSTORE_DATABASE";
/// URI used when `MONGODB_URL` is unset.
pub const DEFAULT_URL: &str = "mongodb://localhost:27017/datastore";
/// Database used when neither the URI nor the override names one.
pub const DEFAULT_DATABASE: &str = "datastore";

/// MongoDB connection configuration.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Minimum connection pool size.
    pub min_pool_size: Option<u32>,
    /// Maximum connection pool size.
    pub max_pool_size: Option<u32>,
    /// Maximum idle time for connections.
    pub max_idle_time: Option<Duration>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Read preference.
    pub read_preference: Option<ReadPreference>,
    /// Write concern.
    pub write_concern: Option<WriteConcern>,
    /// Driver-level retryable writes; `None` keeps the driver default.
    pub retry_writes: Option<bool>,
    /// Driver-level retryable reads; `None` keeps the driver default.
    pub retry_reads: Option<bool>,
    /// Direct connection (bypass replica set discovery).
    pub direct_connection: Option<bool>,
}

/// MongoDB read preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPreference {
    /// Read from primary only.
    #[default]
    Primary,
    /// Read from primary preferred, fallback to secondary.
    PrimaryPreferred,
    /// Read from secondary only.
    Secondary,
    /// Read from secondary preferred, fallback to primary.
    SecondaryPreferred,
    /// Read from nearest member.
    Nearest,
}

impl ReadPreference {
    fn to_driver(self) -> DriverReadPreference {
        match self {
            Self::Primary => DriverReadPreference::Primary,
            Self::PrimaryPreferred => DriverReadPreference::PrimaryPreferred {
                options: Default::default(),
            },
            Self::Secondary => DriverReadPreference::Secondary {
                options: Default::default(),
            },
            Self::SecondaryPreferred => DriverReadPreference::SecondaryPreferred {
                options: Default::default(),
            },
            Self::Nearest => DriverReadPreference::Nearest {
                options: Default::default(),
            },
        }
    }
}

/// MongoDB write concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteConcern {
    /// Acknowledge writes from the specified number of nodes.
    W(u32),
    /// Acknowledge writes from majority of nodes.
    Majority,
    /// Custom tag set.
    Custom(String),
}

impl WriteConcern {
    fn to_driver(&self) -> mongodb::options::WriteConcern {
        let w = match self {
            Self::W(n) => Acknowledgment::Nodes(*n),
            Self::Majority => Acknowledgment::Majority,
            Self::Custom(tag) => Acknowledgment::Custom(tag.clone()),
        };
        mongodb::options::WriteConcern::builder().w(w).build()
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URL.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            app_name: Some("trailstore".to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            max_idle_time: Some(Duration::from_secs(300)),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            read_preference: Some(ReadPreference::Primary),
            write_concern: None,
            retry_writes: None,
            retry_reads: None,
            direct_connection: None,
        }
    }
}

impl MongoConfig {
    /// Create a new configuration from a MongoDB URI.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// See [`from_source`](Self::from_source).
    pub fn from_env() -> MongoResult<Self> {
        Self::from_source(&StdEnvSource)
    }

    /// Read the configuration from an environment source.
    ///
    /// `MONGODB_URL` selects the server (default
    /// `mongodb://localhost:27017/datastore`). The database is
    /// `TRAILSTORE_DATABASE` when set, otherwise the path of the URI,
    /// otherwise `datastore`.
    pub fn from_source(env: &dyn EnvSource) -> MongoResult<Self> {
        let uri = env
            .get_non_empty(URL_VAR)
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(MongoError::config(format!(
                "{} must be a mongodb:// or mongodb+srv:// URI",
                URL_VAR
            )));
        }

        let database = env
            .get_non_empty(DATABASE_VAR)
            .or_else(|| database_from_uri(&uri))
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        Ok(Self::from_uri(uri, database))
    }

    /// Create a builder for configuration.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Convert to MongoDB ClientOptions.
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoError::config(format!("failed to parse URI: {}", e)))?;

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }
        if let Some(min_pool) = self.min_pool_size {
            options.min_pool_size = Some(min_pool);
        }
        if let Some(max_pool) = self.max_pool_size {
            options.max_pool_size = Some(max_pool);
        }
        if let Some(max_idle) = self.max_idle_time {
            options.max_idle_time = Some(max_idle);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            options.connect_timeout = Some(connect_timeout);
        }
        if let Some(selection_timeout) = self.server_selection_timeout {
            options.server_selection_timeout = Some(selection_timeout);
        }
        if let Some(read_pref) = self.read_preference {
            options.selection_criteria =
                Some(SelectionCriteria::ReadPreference(read_pref.to_driver()));
        }
        if let Some(ref wc) = self.write_concern {
            options.write_concern = Some(wc.to_driver());
        }
        if let Some(retry_writes) = self.retry_writes {
            options.retry_writes = Some(retry_writes);
        }
        if let Some(retry_reads) = self.retry_reads {
            options.retry_reads = Some(retry_reads);
        }
        if let Some(direct) = self.direct_connection {
            options.direct_connection = Some(direct);
        }

        Ok(options)
    }
}

/// Database name from the path of a MongoDB URI, if it has one.
///
/// `mongodb://user:pw@host:27017/trails?authSource=admin` yields `trails`.
pub fn database_from_uri(uri: &str) -> Option<String> {
    let rest = uri.split_once("://").map(|(_, rest)| rest)?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (_, path) = rest.split_once('/')?;
    let name = path.trim_matches('/');
    (!name.is_empty()).then(|| name.to_string())
}

/// Builder for MongoDB configuration.
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    min_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    max_idle_time: Option<Duration>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    read_preference: Option<ReadPreference>,
    write_concern: Option<WriteConcern>,
    retry_writes: Option<bool>,
    retry_reads: Option<bool>,
    direct_connection: Option<bool>,
}

impl MongoConfigBuilder {
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

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the maximum idle time for connections.
    pub fn max_idle_time(mut self, duration: Duration) -> Self {
        self.max_idle_time = Some(duration);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.server_selection_timeout = Some(duration);
        self
    }

    /// Set the read preference.
    pub fn read_preference(mut self, pref: ReadPreference) -> Self {
        self.read_preference = Some(pref);
        self
    }

    /// Set the write concern.
    pub fn write_concern(mut self, wc: WriteConcern) -> Self {
        self.write_concern = Some(wc);
        self
    }

    /// Enable or disable driver retryable writes.
    pub fn retry_writes(mut self, enabled: bool) -> Self {
        self.retry_writes = Some(enabled);
        self
    }

    /// Enable or disable driver retryable reads.
    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.retry_reads = Some(enabled);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Build the configuration.
    ///
    /// Without an explicit database the name is taken from the URI path.
    pub fn build(self) -> MongoResult<MongoConfig> {
        let uri = self.uri.unwrap_or_else(|| DEFAULT_URL.to_string());
        let database = self
            .database
            .filter(|db| !db.is_empty())
            .or_else(|| database_from_uri(&uri))
            .ok_or_else(|| MongoError::config("database name is required"))?;

        Ok(MongoConfig {
            uri,
            database,
            app_name: self.app_name.or(Some("trailstore".to_string())),
            min_pool_size: self.min_pool_size,
            max_pool_size: self.max_pool_size.or(Some(10)),
            max_idle_time: self.max_idle_time.or(Some(Duration::from_secs(300))),
            connect_timeout: self.connect_timeout.or(Some(Duration::from_secs(10))),
            server_selection_timeout: self
                .server_selection_timeout
                .or(Some(Duration::from_secs(30))),
            read_preference: self.read_preference.or(Some(ReadPreference::Primary)),
            write_concern: self.write_concern,
            retry_writes: self.retry_writes,
            retry_reads: self.retry_reads,
            direct_connection: self.direct_connection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailstore_query::env::MapEnvSource;

    #[test]
    fn test_config_from_uri() {
        let config = MongoConfig::from_uri("mongodb://localhost:27017", "mydb");
        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "mydb");
    }

    #[test]
    fn test_config_builder() {
        let config = MongoConfig::builder()
            .uri("mongodb://localhost:27017")
            .database("trails")
            .app_name("test-app")
            .max_pool_size(20)
            .build()
            .unwrap();

        assert_eq!(config.database, "trails");
        assert_eq!(config.app_name, Some("test-app".to_string()));
        assert_eq!(config.max_pool_size, Some(20));
        assert_eq!(config.retry_writes, None);
    }

    #[test]
    fn test_config_builder_database_from_uri() {
        let config = MongoConfig::builder()
            .uri("mongodb://db.internal:27017/archive")
            .build()
            .unwrap();
        assert_eq!(config.database, "archive");
    }

    #[test]
    fn test_config_builder_missing_database() {
        let result = MongoConfig::builder()
            .uri("mongodb://localhost:27017")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_database_from_uri() {
        assert_eq!(
            database_from_uri("mongodb://u:p@host:27017/trails?authSource=admin").as_deref(),
            Some("trails")
        );
        assert_eq!(database_from_uri("mongodb://host:27017/"), None);
        assert_eq!(database_from_uri("mongodb://host:27017"), None);
        assert_eq!(database_from_uri("mongodb://host/?replicaSet=rs0"), None);
    }

    #[test]
    fn test_from_source_defaults() {
        let config = MongoConfig::from_source(&MapEnvSource::new()).unwrap();
        assert_eq!(config.uri, DEFAULT_URL);
        assert_eq!(config.database, "datastore");
    }

    #[test]
    fn test_from_source_override() {
        let env = MapEnvSource::new()
            .set(URL_VAR, "mongodb://mongo:27017/trails")
            .set(DATABASE_VAR, "trails_test");
        let config = MongoConfig::from_source(&env).unwrap();
        assert_eq!(config.uri, "mongodb://mongo:27017/trails");
        assert_eq!(config.database, "trails_test");

        let env = MapEnvSource::new().set(URL_VAR, "mongodb://mongo:27017/trails");
        assert_eq!(MongoConfig::from_source(&env).unwrap().database, "trails");
    }

    #[test]
    fn test_from_source_rejects_other_schemes() {
        let env = MapEnvSource::new().set(URL_VAR, "postgres://localhost/db");
        assert!(matches!(
            MongoConfig::from_source(&env),
            Err(MongoError::Config(_))
        ));
    }

    #[test]
    fn test_read_preference_default() {
        let pref: ReadPreference = Default::default();
        assert_eq!(pref, ReadPreference::Primary);
    }
}
