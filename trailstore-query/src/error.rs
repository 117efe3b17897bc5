//! Error types for filter compilation and store operations.
//!
//! Every failure surfaced by trailstore is a [`QueryError`] carrying an
//! [`ErrorCode`], a message and optional context. Codes follow the pattern
//! `T{category}{number}`:
//!
//! - 1xxx: Request errors (not found, unsupported operation, bad filter value)
//! - 3xxx: Connection errors
//! - 5xxx: Execution errors raised by the store
//! - 6xxx: Data mapping errors
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use trailstore_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::not_found("Record");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert_eq!(err.http_status(), 404);
//!
//! let err = QueryError::operation_not_supported("BETWEEN");
//! assert!(err.is_caller_error());
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for trailstore operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request errors (1xxx)
    /// Identifier does not resolve to a document (T1001).
    RecordNotFound = 1001,
    /// Unknown filter operation or boolean operator (T1002).
    OperationNotSupported = 1002,
    /// Filter value does not have the shape its operation requires (T1003).
    InvalidFilter = 1003,
    /// Malformed request parameter such as an identifier or a page size (T1004).
    InvalidInput = 1004,
    /// The selected document has the wrong type for the operation (T1005).
    WrongObjectType = 1005,
    /// Input could not be parsed (T1006).
    FailedToParse = 1006,

    // Connection errors (3xxx)
    /// The store could not be reached (T3001).
    ConnectionFailed = 3001,
    /// Connection attempt timed out (T3002).
    ConnectionTimeout = 3002,

    // Execution errors (5xxx)
    /// Error reported by the store (T5001).
    DatabaseError = 5001,
    /// Store operation timed out (T5002).
    QueryTimeout = 5002,

    // Data errors (6xxx)
    /// Value could not be encoded for the store (T6001).
    SerializationError = 6001,
    /// Stored document could not be decoded (T6002).
    DeserializationError = 6002,

    // Configuration errors (7xxx)
    /// Invalid configuration (T7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (T9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "T1001").
    pub fn code(&self) -> String {
        format!("T{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Not found",
            Self::OperationNotSupported => "Operation not supported",
            Self::InvalidFilter => "Invalid filter value",
            Self::InvalidInput => "Invalid input",
            Self::WrongObjectType => "Wrong type of object selected",
            Self::FailedToParse => "Failed to parse input",
            Self::ConnectionFailed => "Database connection failed",
            Self::ConnectionTimeout => "Connection timeout",
            Self::DatabaseError => "Database error",
            Self::QueryTimeout => "Query timeout",
            Self::SerializationError => "Serialization error",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }

    /// HTTP status an API layer should answer with for this code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::RecordNotFound => 404,
            Self::OperationNotSupported
            | Self::InvalidFilter
            | Self::InvalidInput
            | Self::WrongObjectType
            | Self::FailedToParse => 400,
            _ => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field path involved.
    pub field: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

/// Errors that can occur during trailstore operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} found for the given identifier", model),
        )
        .with_model(&model)
    }

    /// Create an error for an unknown filter operation or boolean operator.
    pub fn operation_not_supported(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        Self::new(
            ErrorCode::OperationNotSupported,
            format!("Operation not supported: {}", operation),
        )
        .with_suggestion(
            "Use one of CONTAINS, MATCHES, EQ, GT, GTE, LT, LTE, IS, RADIUS, AREA or AND, OR",
        )
    }

    /// Create an error for a filter value that does not fit its operation.
    pub fn invalid_filter(key: impl Into<String>, message: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(
            ErrorCode::InvalidFilter,
            format!("Invalid filter on '{}': {}", key, message.into()),
        )
        .with_field(&key)
    }

    /// Create an invalid input error.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::InvalidInput,
            format!("Invalid input for {}: {}", field, message.into()),
        )
        .with_field(&field)
    }

    /// Create a wrong object type error.
    pub fn wrong_object_type(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::WrongObjectType, message)
    }

    /// Create a parse failure error.
    pub fn failed_to_parse(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::FailedToParse,
            format!("Failed to parse: {}", message.into()),
        )
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConnectionFailed,
            format!("Connection error: {}", message.into()),
        )
        .with_suggestion("Check that the database server is running")
        .with_suggestion("Verify the connection URL is correct")
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("Operation timed out after {}ms", duration_ms),
        )
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to decode stored document: {}", message.into()),
        )
        .with_suggestion("Check that the stored documents match the entity model")
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfiguration,
            format!("Configuration error: {}", message.into()),
        )
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is an unsupported operation error.
    pub fn is_operation_not_supported(&self) -> bool {
        self.code == ErrorCode::OperationNotSupported
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self.code, ErrorCode::QueryTimeout | ErrorCode::ConnectionTimeout)
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionFailed | ErrorCode::ConnectionTimeout
        )
    }

    /// Check if the caller has to change the request to succeed.
    pub fn is_caller_error(&self) -> bool {
        (400..500).contains(&self.code.http_status())
    }

    /// HTTP status an API layer should answer with.
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Display the full error with context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = format!("Error [{}]: {}\n", self.code.code(), self.message);

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  -> While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  -> Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  -> Field: {}\n", field));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::RecordNotFound.code(), "T1001");
        assert_eq!(ErrorCode::OperationNotSupported.code(), "T1002");
        assert_eq!(ErrorCode::DatabaseError.code(), "T5001");
    }

    #[test]
    fn test_not_found_error() {
        let err = QueryError::not_found("Journey");
        assert!(err.is_not_found());
        assert!(err.message.contains("Journey"));
        assert_eq!(err.context.model, Some("Journey".to_string()));
    }

    #[test]
    fn test_operation_not_supported() {
        let err = QueryError::operation_not_supported("XOR");
        assert!(err.is_operation_not_supported());
        assert!(err.to_string().contains("XOR"));
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(QueryError::not_found("Record").http_status(), 404);
        assert_eq!(QueryError::invalid_filter("tags", "bad").http_status(), 400);
        assert_eq!(QueryError::wrong_object_type("x").http_status(), 400);
        assert_eq!(QueryError::failed_to_parse("x").http_status(), 400);
        assert_eq!(QueryError::database("boom").http_status(), 500);
        assert_eq!(QueryError::connection("refused").http_status(), 500);
    }

    #[test]
    fn test_caller_errors() {
        assert!(QueryError::invalid_input("limit", "zero").is_caller_error());
        assert!(!QueryError::database("boom").is_caller_error());
        assert!(!QueryError::internal("bug").is_caller_error());
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::invalid_filter("content.location", "center needs two coordinates")
            .with_context("Parsing filter set");

        let output = err.display_full();
        assert!(output.contains("T1003"));
        assert!(output.contains("content.location"));
        assert!(output.contains("Parsing filter set"));
    }

    #[test]
    fn test_with_source() {
        let io = std::io::Error::other("socket closed");
        let err = QueryError::connection("lost").with_source(io);
        assert!(err.is_connection_error());
        assert!(std::error::Error::source(&err).is_some());
    }
}
