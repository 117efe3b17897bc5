//! Error types for MongoDB operations.

use mongodb::error::ErrorKind;
use thiserror::Error;
use trailstore_query::QueryError;

/// Result type for MongoDB operations.
pub type MongoResult<T> = Result<T, MongoError>;

/// Errors raised below the service layer.
#[derive(Error, Debug)]
pub enum MongoError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// BSON serialization error.
    #[error("bson error: {0}")]
    Bson(#[from] bson::ser::Error),

    /// BSON deserialization error.
    #[error("bson deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Query execution error, including operators the in-memory store rejects.
    #[error("query error: {0}")]
    Query(String),

    /// Invalid ObjectId.
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MongoError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create an invalid object id error.
    pub fn invalid_object_id(message: impl Into<String>) -> Self {
        Self::InvalidObjectId(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Driver(e) => matches!(
                *e.kind,
                ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. }
            ),
            _ => false,
        }
    }
}

impl From<bson::oid::Error> for MongoError {
    fn from(err: bson::oid::Error) -> Self {
        MongoError::InvalidObjectId(err.to_string())
    }
}

impl From<MongoError> for QueryError {
    fn from(err: MongoError) -> Self {
        if err.is_connection_error() {
            let msg = err.to_string();
            return match err {
                MongoError::Driver(e) => QueryError::connection(msg).with_source(e),
                _ => QueryError::connection(msg),
            };
        }

        match err {
            MongoError::Driver(e) => QueryError::database(e.to_string()).with_source(e),
            MongoError::Bson(e) => QueryError::serialization(e.to_string()).with_source(e),
            MongoError::BsonDe(e) => QueryError::deserialization(e.to_string()).with_source(e),
            MongoError::Config(msg) => QueryError::configuration(msg),
            MongoError::Connection(msg) => QueryError::connection(msg),
            MongoError::Query(msg) => QueryError::database(msg),
            MongoError::InvalidObjectId(msg) => QueryError::invalid_input("_id", msg),
            MongoError::Internal(msg) => QueryError::internal(msg),
        }
    }
}
