//! Confluence REST endpoints
//!
//! Each operation is one `PageQuery`, one paginator and one extractor
//! handed to the shared [`Collector`].

use super::models::{Attachment, Member, PageRef, SearchHit, Space};
use crate::collect::{
    Collection, Collector, PageQuery, PageSource, ResultSet, TreeCollection, TreeLimits,
};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::join_url;
use crate::pagination::{NextLinkPaginator, OffsetPaginator};
use serde_json::Value;
use url::Url;

/// Page size used by keyword search
pub const SEARCH_PAGE_SIZE: u32 = 250;

/// Page size used by space, page and attachment listings
pub const LIST_PAGE_SIZE: u32 = 100;

/// Default group member endpoint
pub const DEFAULT_MEMBERS_ENDPOINT: &str = "/rest/api/group/confluence-users/member";

/// Build the CQL full-text clause for a term
///
/// Backslashes and double quotes are escaped so the term stays one literal.
pub fn cql_text_query(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('"', "\\\"");
    format!("text~\"{escaped}\"")
}

/// Member endpoint for a named group, with the name percent-encoded
pub fn group_members_endpoint(group: &str) -> Result<String> {
    let mut url = Url::parse("http://confluence.invalid/rest/api/group")?;
    url.path_segments_mut()
        .map_err(|()| Error::invalid_value("group", "cannot build endpoint"))?
        .push(group)
        .push("member");
    Ok(url.path().to_string())
}

/// Typed access to the Confluence REST API
pub struct ConfluenceApi<S = HttpClient> {
    base_url: String,
    collector: Collector<S>,
    search_page_size: u32,
    list_page_size: u32,
}

impl<S: PageSource> ConfluenceApi<S> {
    /// Create an API over `base_url` (any trailing `/` is dropped)
    pub fn new(base_url: impl Into<String>, collector: Collector<S>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collector,
            search_page_size: SEARCH_PAGE_SIZE,
            list_page_size: LIST_PAGE_SIZE,
        }
    }

    /// Override page sizes
    #[must_use]
    pub fn with_page_sizes(mut self, search: u32, list: u32) -> Self {
        self.search_page_size = search.max(1);
        self.list_page_size = list.max(1);
        self
    }

    /// Instance base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying collector
    pub fn collector(&self) -> &Collector<S> {
        &self.collector
    }

    /// Turn a relative `webui` or `download` link into a full URL
    pub fn absolute_url(&self, link: &str) -> String {
        join_url(&self.base_url, link)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    fn listing(&self, path: impl Into<String>) -> PageQuery {
        PageQuery::new(&self.base_url, path)
            .page_size(self.list_page_size)
            .param("limit", self.list_page_size.to_string())
    }

    /// `/rest/api/space`
    pub fn spaces_query(&self) -> PageQuery {
        self.listing("/rest/api/space")
    }

    /// Pages of a space, flat
    pub fn pages_query(&self, space_key: &str) -> PageQuery {
        self.listing("/rest/api/content")
            .param("spaceKey", space_key)
            .param("type", "page")
            .param("expand", "space,version")
    }

    /// Top-level pages of a space
    pub fn root_pages_query(&self, space_key: &str) -> PageQuery {
        self.listing(format!("/rest/api/space/{space_key}/content/page"))
            .param("depth", "root")
    }

    /// Direct children of a page
    pub fn children_query(&self, page_id: &str) -> PageQuery {
        self.listing(format!("/rest/api/content/{page_id}/child/page"))
    }

    /// Attachments of a page
    pub fn attachments_query(&self, page_id: &str) -> PageQuery {
        self.listing(format!("/rest/api/content/{page_id}/child/attachment"))
    }

    /// Full-text search for one term
    pub fn search_query(&self, term: &str, limit: Option<usize>) -> PageQuery {
        PageQuery::new(&self.base_url, "/rest/api/search")
            .param("cql", cql_text_query(term))
            .page_size(self.search_page_size)
            .limit(limit)
    }

    /// Members of a group, at a caller-supplied endpoint
    pub fn members_query(&self, endpoint: &str) -> PageQuery {
        PageQuery::new(&self.base_url, endpoint)
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Collect every space
    pub async fn spaces(&self, acc: ResultSet<Space>) -> Collection<Space> {
        self.collector
            .collect(
                &self.spaces_query(),
                &NextLinkPaginator::default(),
                &Space::from_item,
                acc,
            )
            .await
    }

    /// Collect every page of a space
    pub async fn pages_in_space(
        &self,
        space_key: &str,
        acc: ResultSet<PageRef>,
    ) -> Collection<PageRef> {
        let extract = |item: &Value| PageRef::from_item(item, Some(space_key));
        self.collector
            .collect(
                &self.pages_query(space_key),
                &NextLinkPaginator::default(),
                &extract,
                acc,
            )
            .await
    }

    /// Collect the top-level pages of a space
    pub async fn root_pages(
        &self,
        space_key: &str,
        acc: ResultSet<PageRef>,
    ) -> Collection<PageRef> {
        let extract = |item: &Value| PageRef::from_item(item, Some(space_key));
        self.collector
            .collect(
                &self.root_pages_query(space_key),
                &NextLinkPaginator::default(),
                &extract,
                acc,
            )
            .await
    }

    /// Walk the page hierarchy of a space from its root pages
    pub async fn page_tree(
        &self,
        space_key: &str,
        limits: TreeLimits,
        acc: ResultSet<PageRef>,
    ) -> TreeCollection<PageRef> {
        let extract = |item: &Value| PageRef::from_item(item, Some(space_key));
        self.collector
            .collect_tree(
                &self.root_pages_query(space_key),
                &NextLinkPaginator::default(),
                &extract,
                |page: &PageRef| Some(self.children_query(&page.id)),
                limits,
                acc,
            )
            .await
    }

    /// Collect the attachments of a page
    pub async fn attachments(
        &self,
        page_id: &str,
        acc: ResultSet<Attachment>,
    ) -> Collection<Attachment> {
        let extract = |item: &Value| Attachment::from_item(item, page_id);
        self.collector
            .collect(
                &self.attachments_query(page_id),
                &NextLinkPaginator::default(),
                &extract,
                acc,
            )
            .await
    }

    /// Search for one term, attributing every hit to it
    pub async fn search(
        &self,
        term: &str,
        limit: Option<usize>,
        acc: ResultSet<SearchHit>,
    ) -> Collection<SearchHit> {
        let extract = |item: &Value| SearchHit::from_item(item, term);
        self.collector
            .collect(
                &self.search_query(term, limit),
                &OffsetPaginator::confluence(self.search_page_size),
                &extract,
                acc,
            )
            .await
    }

    /// Collect the members listed at `endpoint`
    pub async fn group_members(
        &self,
        endpoint: &str,
        acc: ResultSet<Member>,
    ) -> Collection<Member> {
        self.collector
            .collect(
                &self.members_query(endpoint),
                &NextLinkPaginator::default(),
                &Member::from_item,
                acc,
            )
            .await
    }
}

impl<S> std::fmt::Debug for ConfluenceApi<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluenceApi")
            .field("base_url", &self.base_url)
            .field("search_page_size", &self.search_page_size)
            .field("list_page_size", &self.list_page_size)
            .finish_non_exhaustive()
    }
}
