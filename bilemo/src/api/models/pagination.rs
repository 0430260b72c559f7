//! Page-based pagination for list endpoints.
//!
//! `GET /api/products?page=2&limit=5` returns the second page of five products. Both parameters
//! are optional and out-of-range values are clamped rather than rejected, so the cache key is
//! always built from the effective values.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use utoipa::IntoParams;

/// Page returned when `page` is not specified.
pub const DEFAULT_PAGE: i64 = 1;

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 3;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page number (default: 1)
    #[param(default = 1, minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub page: Option<i64>,

    /// Items per page (default: 3, max: 100)
    #[param(default = 3, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Get the page, defaulting to 1 and never below it.
    #[inline]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE).clamp(1, u32::MAX as i64) as u32
    }

    /// Get the limit value, clamped between 1 and MAX_LIMIT.
    #[inline]
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as u32
    }

    /// Number of rows to skip for the effective page.
    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.limit() as i64
    }
}
