//! # trailstore-query
//!
//! Store-agnostic building blocks of the trailstore filter compiler.
//!
//! This crate provides:
//! - The filter algebra (`Filter`, `ConcatenationFilter`, `AnyFilter`, `FilterSet`)
//!   with validated wire parsing
//! - Normalised field paths
//! - Offset pagination and the paginated result envelope
//! - The error taxonomy shared by every trailstore crate
//! - Logging initialisation and environment sources
//!
//! Compilation to the document store lives in `trailstore-mongodb`.
//!
//! ## Filters
//!
//! ```rust
//! use trailstore_query::{ConcatenationFilter, Filter, FilterSet};
//!
//! let set = FilterSet::new()
//!     .push(Filter::radius("content.location", [13.418964, 52.530173], 10.0))
//!     .push(ConcatenationFilter::and([
//!         Filter::contains("tags", "photo"),
//!         Filter::contains("tags", "test").negated(),
//!     ]));
//!
//! assert_eq!(set.len(), 2);
//! ```
//!
//! ## Field Paths
//!
//! ```rust
//! use trailstore_query::FieldPath;
//!
//! let path = FieldPath::new("content.data[0].title");
//! assert_eq!(path.as_str(), "content.data.0.title");
//! assert!(FieldPath::new("_id").is_identifier());
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use trailstore_query::{ErrorCode, FilterSet};
//!
//! let err = FilterSet::from_json_str(r#"{"filterSet":[{"key":"a","operation":"NEAR","value":1}]}"#)
//!     .unwrap_err();
//! assert_eq!(err.code, ErrorCode::OperationNotSupported);
//! assert_eq!(err.http_status(), 400);
//! ```

#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod filter;
pub mod logging;
pub mod pagination;
pub mod path;

pub use env::{EnvSource, MapEnvSource, StdEnvSource};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult};
pub use filter::{
    AnyFilter, AreaValue, BooleanOperation, ConcatenationFilter, Filter, FilterOperation,
    FilterSet, Number, OperationKind, Position, RadiusValue, check_pattern,
};
pub use pagination::{DEFAULT_LIMIT, Pagination, PaginationResult};
pub use path::{FieldPath, ID_FIELD};

// Re-export logging utilities
pub use logging::{LogFormat, LogSettings, init as init_logging, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{
        AnyFilter, BooleanOperation, ConcatenationFilter, Filter, FilterOperation, FilterSet,
        Number, OperationKind,
    };
    pub use crate::pagination::{Pagination, PaginationResult};
    pub use crate::path::FieldPath;
}
