//! Offset pagination and the paginated result envelope.
//!
//! ```rust
//! use trailstore_query::{Pagination, PaginationResult};
//!
//! let pagination = Pagination::new(20, 10).unwrap();
//! assert_eq!(pagination.skip(), 20);
//! assert_eq!(pagination.limit(), 10);
//!
//! // Page 3 with 25 items per page (1-indexed)
//! let page = Pagination::page(3, 25).unwrap();
//! assert_eq!(page.skip(), 50);
//!
//! let result = PaginationResult::new(&page, 120, vec!["a", "b"]);
//! assert_eq!(result.total_count, 120);
//! assert!(result.has_next());
//! ```

use crate::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};

/// Page size used when the caller does not pick one.
pub const DEFAULT_LIMIT: u64 = 10;

/// Skip/limit window over an ordered result set.
///
/// The limit is always at least one; the store rejects an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pagination {
    skip: u64,
    limit: u64,
}

impl Pagination {
    /// Create a window, rejecting a zero limit.
    pub fn new(skip: u64, limit: u64) -> QueryResult<Self> {
        if limit == 0 {
            return Err(QueryError::invalid_input("limit", "must be at least 1"));
        }
        Ok(Self { skip, limit })
    }

    /// The first `limit` documents.
    pub fn first(limit: u64) -> QueryResult<Self> {
        Self::new(0, limit)
    }

    /// Get pagination for a page (1-indexed).
    pub fn page(page: u64, page_size: u64) -> QueryResult<Self> {
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        Self::new(skip, page_size)
    }

    /// Number of documents to skip.
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Maximum number of documents to return.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A page of results plus the number of documents matched before paging.
///
/// `total_count` and `results` come from two separate store reads; a
/// concurrent write between them can make the two disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult<T> {
    /// Documents skipped before this page.
    pub skip: u64,
    /// Requested page size.
    pub limit: u64,
    /// Matching documents before skip/limit were applied.
    pub total_count: u64,
    /// The page.
    pub results: Vec<T>,
}

impl<T> PaginationResult<T> {
    /// Build the envelope for a window.
    pub fn new(pagination: &Pagination, total_count: u64, results: Vec<T>) -> Self {
        Self {
            skip: pagination.skip(),
            limit: pagination.limit(),
            total_count,
            results,
        }
    }

    /// Convert the page items, keeping the paging metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginationResult<U> {
        PaginationResult {
            skip: self.skip,
            limit: self.limit,
            total_count: self.total_count,
            results: self.results.into_iter().map(f).collect(),
        }
    }

    /// Fallible variant of [`map`](Self::map).
    pub fn try_map<U, E, F: FnMut(T) -> Result<U, E>>(self, f: F) -> Result<PaginationResult<U>, E> {
        Ok(PaginationResult {
            skip: self.skip,
            limit: self.limit,
            total_count: self.total_count,
            results: self.results.into_iter().map(f).collect::<Result<_, _>>()?,
        })
    }

    /// Whether documents remain after this page.
    pub fn has_next(&self) -> bool {
        self.skip.saturating_add(self.results.len() as u64) < self.total_count
    }

    /// Number of items in this page.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the page is empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<T> IntoIterator for PaginationResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_zero_limit_rejected() {
        let err = Pagination::new(0, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.context.field.as_deref(), Some("limit"));
    }

    #[test]
    fn test_page() {
        let page = Pagination::page(3, 10).unwrap();
        assert_eq!(page.skip(), 20);
        assert_eq!(page.limit(), 10);

        let first = Pagination::page(0, 10).unwrap();
        assert_eq!(first.skip(), 0);
    }

    #[test]
    fn test_default() {
        let pagination = Pagination::default();
        assert_eq!(pagination.skip(), 0);
        assert_eq!(pagination.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let pagination = Pagination::new(1, 1).unwrap();
        let result = PaginationResult::new(&pagination, 3, vec![2]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "skip": 1, "limit": 1, "totalCount": 3, "results": [2] })
        );
    }

    #[test]
    fn test_map_keeps_metadata() {
        let pagination = Pagination::new(0, 2).unwrap();
        let result = PaginationResult::new(&pagination, 5, vec![1, 2]).map(|n| n * 10);
        assert_eq!(result.results, vec![10, 20]);
        assert_eq!(result.total_count, 5);
        assert!(result.has_next());
    }

    #[test]
    fn test_try_map_short_circuits() {
        let pagination = Pagination::default();
        let result = PaginationResult::new(&pagination, 2, vec!["1", "x"]);
        assert!(result.try_map(|s| s.parse::<i32>()).is_err());
    }
}
