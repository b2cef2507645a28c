//! Confluence REST API surface
//!
//! Records for spaces, pages, attachments, search hits and group members,
//! plus [`ConfluenceApi`] which maps each operation onto the collector.

mod api;
mod models;

pub use api::{
    cql_text_query, group_members_endpoint, ConfluenceApi, DEFAULT_MEMBERS_ENDPOINT,
    LIST_PAGE_SIZE, SEARCH_PAGE_SIZE,
};
pub use models::{Attachment, HitKey, Member, PageRef, SearchHit, Space};
