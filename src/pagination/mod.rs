//! Pagination module
//!
//! Supports: Offset (`start`/`limit` with `totalSize`), Next Link (`_links.next`)
//!
//! # Overview
//!
//! Each strategy reads a response body, advances the [`PaginationState`],
//! and tells the collector whether another page exists and how to request
//! it. Exactly one style is active per endpoint family.

mod strategies;
mod types;

pub use strategies::{NextLinkPaginator, NoPaginator, OffsetPaginator};
pub use types::{extract_path, NextPage, PaginationState, Paginator};
