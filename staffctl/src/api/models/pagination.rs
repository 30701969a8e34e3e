//! Shared pagination, search and sorting types for list endpoints.
//!
//! All list endpoints use offset-based pagination with `skip` and `limit` parameters, an optional
//! `name` substring filter, and a whitelisted sort (`sortBy` in `id|name|email|phone`,
//! `sortDir` in `asc|desc`).

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 20;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// Standard pagination parameters for list endpoints.
///
/// The `limit` is clamped to ensure it's always between 1 and 100,
/// preventing both zero-result queries and excessive data fetching.
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
    /// Get the skip value, defaulting to 0 if not specified.
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    /// Get the limit value, clamped between 1 and MAX_LIMIT.
    /// Defaults to DEFAULT_LIMIT if not specified.
    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Columns a list may be ordered by. Anything else falls back to `id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Email,
    Phone,
}

impl SortField {
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("name") => SortField::Name,
            Some("email") => SortField::Email,
            Some("phone") => SortField::Phone,
            _ => SortField::Id,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Email => "email",
            SortField::Phone => "phone",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value {
            Some(dir) if dir.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Query parameters shared by the company, manager and employee list endpoints
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on `name`
    pub name: Option<String>,

    /// One of `id`, `name`, `email`, `phone` (default `id`)
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,

    /// `asc` (default) or `desc`
    #[serde(rename = "sortDir")]
    pub sort_dir: Option<String>,
}

impl ListQuery {
    pub fn sort(&self) -> Sort {
        Sort {
            field: SortField::parse_or_default(self.sort_by.as_deref()),
            direction: SortDirection::parse_or_default(self.sort_dir.as_deref()),
        }
    }

    /// The name filter, ignoring blank input
    pub fn name_filter(&self) -> Option<String> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(str::to_string)
    }
}

/// Generic paginated response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    /// The items for the current page
    pub data: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total_count: i64,
    /// Number of items skipped
    pub skip: i64,
    /// Maximum items returned per page
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
