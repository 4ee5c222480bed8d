//! Shared pagination types for API query parameters.
//!
//! List endpoints use offset-based pagination with `skip` and `limit`.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 20;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// Standard pagination parameters for list endpoints.
///
/// `limit` is clamped between 1 and [`MAX_LIMIT`]; `skip` is never negative.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub skip: Option<i64>,

    /// Maximum number of items to return (default: 20, max: 100)
    #[param(default = 20, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Both values as a tuple, useful for destructuring.
    #[inline]
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }
}

/// Paginated list wrapper with the total count before pagination.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    pub data: Vec<T>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self {
            data,
            total_count,
            skip,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let p = Pagination::default();
        assert_eq!(p.params(), (0, DEFAULT_LIMIT));
    }

    #[test]
    fn test_clamping() {
        let p = Pagination {
            skip: Some(-10),
            limit: Some(0),
        };
        assert_eq!(p.params(), (0, 1));

        let p = Pagination {
            skip: Some(40),
            limit: Some(1000),
        };
        assert_eq!(p.params(), (40, MAX_LIMIT));
    }
}
