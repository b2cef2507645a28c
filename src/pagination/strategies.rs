//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{extract_path, NextPage, PaginationState, Paginator};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination (Confluence search)
///
/// Uses `start` and `limit` parameters. When the server reports a total
/// (`totalSize`), paging continues while `start < min(total, ceiling)`.
/// Without a total, paging continues while pages come back full.
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for page size
    pub limit_param: String,
    /// Number of records requested per page
    pub page_size: u32,
    /// Path to the server-reported total, if any
    pub total_path: Option<String>,
}

impl OffsetPaginator {
    /// Create a new offset paginator
    pub fn new(
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            offset_param: offset_param.into(),
            limit_param: limit_param.into(),
            page_size: page_size.max(1),
            total_path: None,
        }
    }

    /// Confluence style: `start`, `limit`, `totalSize`
    pub fn confluence(page_size: u32) -> Self {
        Self::new("start", "limit", page_size).with_total_path("totalSize")
    }

    /// Read the total record count from this path
    #[must_use]
    pub fn with_total_path(mut self, path: impl Into<String>) -> Self {
        self.total_path = Some(path.into());
        self
    }

    fn params(&self, offset: u64) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(self.offset_param.clone(), offset.to_string());
        params.insert(self.limit_param.clone(), self.page_size.to_string());
        params
    }

    /// Page step: the server may clamp `limit` below what was asked for
    fn step(&self, body: &Value) -> u64 {
        let requested = u64::from(self.page_size);
        extract_path(body, &self.limit_param)
            .and_then(Value::as_u64)
            .filter(|echoed| *echoed > 0 && *echoed < requested)
            .unwrap_or(requested)
    }

    fn total(&self, body: &Value) -> Option<u64> {
        let path = self.total_path.as_deref()?;
        let value = extract_path(body, path)?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }
}

impl Paginator for OffsetPaginator {
    fn initial_params(&self, state: &PaginationState) -> HashMap<String, String> {
        self.params(state.offset)
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count as u64);

        if records_count == 0 {
            state.mark_done();
            return NextPage::Done;
        }

        let step = self.step(body);
        state.add_offset(step);

        let total = self.total(body);
        let cap = match (total, state.ceiling) {
            (Some(total), Some(ceiling)) => Some(total.min(ceiling)),
            (Some(total), None) => Some(total),
            (None, ceiling) => ceiling,
        };

        let exhausted = match cap {
            Some(cap) if state.offset >= cap => true,
            // Without a reported total a short page is the last one
            _ if total.is_none() => (records_count as u64) < step,
            _ => false,
        };

        if exhausted {
            state.mark_done();
            return NextPage::Done;
        }

        NextPage::with_params(self.params(state.offset))
    }
}

// ============================================================================
// Next Link Pagination
// ============================================================================

/// Next link pagination (continuation link in response body)
///
/// Confluence returns `{"_links": {"next": "/rest/api/space?start=25&limit=25"}}`
/// until the last page. The link replaces the request target verbatim.
#[derive(Debug, Clone)]
pub struct NextLinkPaginator {
    /// Path to the continuation link in the response body
    pub path: String,
}

impl Default for NextLinkPaginator {
    fn default() -> Self {
        Self {
            path: "_links.next".to_string(),
        }
    }
}

impl NextLinkPaginator {
    /// Create a new next link paginator
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Paginator for NextLinkPaginator {
    fn initial_params(&self, _state: &PaginationState) -> HashMap<String, String> {
        HashMap::new()
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count as u64);

        if records_count > 0 {
            if let Some(next) = extract_path(body, &self.path).and_then(Value::as_str) {
                if !next.is_empty() {
                    state.next_page();
                    state.set_cursor(next.to_string());
                    return NextPage::with_url(next);
                }
            }
        }

        state.mark_done();
        NextPage::Done
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn initial_params(&self, _state: &PaginationState) -> HashMap<String, String> {
        HashMap::new()
    }

    fn process_response(
        &self,
        _body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count as u64);
        state.mark_done();
        NextPage::Done
    }
}
