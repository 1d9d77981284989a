//! Pagination over swap cards
//!
//! The unit of pagination is a whole card, so a swap's proposals are never
//! split across pages.

use crate::error::StorageError;

/// Validated `(limit, offset)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: usize,
    offset: usize,
}

impl PageRequest {
    /// Build a request; `limit` must be positive
    pub fn new(limit: usize, offset: usize) -> Result<Self, StorageError> {
        if limit == 0 {
            return Err(StorageError::InvalidInput("limit must be greater than 0".into()));
        }
        Ok(Self { limit, offset })
    }

    /// Validate raw query values at the API boundary
    pub fn from_query(
        limit: Option<i64>,
        offset: Option<i64>,
        default_limit: u32,
        max_limit: u32,
    ) -> Result<Self, StorageError> {
        let limit = limit.unwrap_or(default_limit as i64);
        let offset = offset.unwrap_or(0);

        if limit <= 0 {
            return Err(StorageError::InvalidInput("limit must be greater than 0".into()));
        }
        if limit > max_limit as i64 {
            return Err(StorageError::InvalidInput(format!(
                "limit must not exceed {}",
                max_limit
            )));
        }
        if offset < 0 {
            return Err(StorageError::InvalidInput("offset must not be negative".into()));
        }

        let offset = usize::try_from(offset)
            .map_err(|_| StorageError::InvalidInput("offset is too large".into()))?;
        Self::new(limit as usize, offset)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationMeta {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PaginationMeta,
}

/// Slice `[offset, offset + limit)` out of an already ordered list
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    let items: Vec<T> = items
        .into_iter()
        .skip(request.offset)
        .take(request.limit)
        .collect();
    let has_more = request.offset.saturating_add(items.len()) < total;

    Page {
        meta: PaginationMeta {
            total,
            limit: request.limit,
            offset: request.offset,
            has_more,
        },
        items,
    }
}
