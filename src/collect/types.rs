//! Collector types
//!
//! Query descriptors, deduplicated result sets, extraction, and run
//! statistics.

use crate::error::{Error, ErrorClass, Result};
use crate::http::{HttpClient, RequestConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use url::Url;

// ============================================================================
// Page Query
// ============================================================================

/// Describes one paginated collection run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Instance base URL, including any context path (`https://host/wiki`)
    pub base_url: String,
    /// Endpoint path (`/rest/api/space`)
    pub path: String,
    /// Query parameters sent with the first request
    pub parameters: HashMap<String, String>,
    /// Requested page size
    pub page_size: u32,
    /// Stop once this many records have been accepted by the run
    pub limit: Option<usize>,
    /// Field of the body holding the page's items
    pub records_field: String,
}

impl PageQuery {
    /// Create a query for `path` under `base_url`
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            path: path.into(),
            parameters: HashMap::new(),
            page_size: 25,
            limit: None,
            records_field: "results".to_string(),
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Set the result ceiling
    #[must_use]
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Set the field holding the page's items
    #[must_use]
    pub fn records_field(mut self, field: impl Into<String>) -> Self {
        self.records_field = field.into();
        self
    }

    /// Full URL of the first request
    pub fn url(&self) -> String {
        self.resolve(&self.path)
    }

    /// Resolve a path or continuation link against the base URL
    pub fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        format!("{}/{}", self.base_url, target.trim_start_matches('/'))
    }

    /// Whether `target` stays on the base URL's scheme, host and port
    ///
    /// Relative targets always do. Unparseable ones never do.
    pub fn is_same_origin(&self, target: &str) -> bool {
        let Ok(base) = Url::parse(&self.base_url) else {
            return false;
        };
        match Url::parse(target) {
            Ok(url) => url.origin() == base.origin(),
            Err(url::ParseError::RelativeUrlWithoutBase) => true,
            Err(_) => false,
        }
    }
}

// ============================================================================
// Records and Result Sets
// ============================================================================

/// A record extracted from one item of a response page
pub trait Record: Clone + Send + Sync {
    /// Dedup key; two records with equal keys are the same entity
    type Key: Ord + Clone + Debug + Send + Sync;

    /// Compute this record's dedup key
    fn key(&self) -> Self::Key;
}

/// Deduplicated set of records
///
/// Membership is decided by `Record::key`. Iteration follows first
/// insertion, so output stays in fetch order.
#[derive(Debug, Clone)]
pub struct ResultSet<R: Record> {
    index: BTreeMap<R::Key, usize>,
    records: Vec<R>,
}

impl<R: Record> Default for ResultSet<R> {
    fn default() -> Self {
        Self {
            index: BTreeMap::new(),
            records: Vec::new(),
        }
    }
}

impl<R: Record> ResultSet<R> {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning `true` if its key was new
    pub fn insert(&mut self, record: R) -> bool {
        let key = record.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.records.len());
        self.records.push(record);
        true
    }

    /// Check if a key is present
    pub fn contains(&self, key: &R::Key) -> bool {
        self.index.contains_key(key)
    }

    /// Look up a record by key
    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Number of unique records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    /// Merge another set into this one, returning how many records were new
    pub fn merge(&mut self, other: ResultSet<R>) -> usize {
        other
            .records
            .into_iter()
            .filter(|record| self.insert(record.clone()))
            .count()
    }

    /// Consume into a vector in insertion order
    pub fn into_vec(self) -> Vec<R> {
        self.records
    }
}

impl<R: Record> Extend<R> for ResultSet<R> {
    fn extend<I: IntoIterator<Item = R>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl<R: Record> FromIterator<R> for ResultSet<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<R: Record> IntoIterator for ResultSet<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a, R: Record> IntoIterator for &'a ResultSet<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Maps one item of a page to a record
pub trait Extractor<R>: Send + Sync {
    /// Extract a record; an error skips the item
    fn extract(&self, item: &Value) -> Result<R>;
}

impl<R, F> Extractor<R> for F
where
    F: Fn(&Value) -> Result<R> + Send + Sync,
{
    fn extract(&self, item: &Value) -> Result<R> {
        self(item)
    }
}

// ============================================================================
// Page Source
// ============================================================================

/// Fetches one page of JSON
#[async_trait]
pub trait PageSource: Send + Sync {
    /// GET `url` with `params` and parse the body
    async fn fetch_page(&self, url: &str, params: &HashMap<String, String>) -> Result<Value>;
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_page(&self, url: &str, params: &HashMap<String, String>) -> Result<Value> {
        self.get_json_with_config(url, RequestConfig::new().queries(params))
            .await
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// A failure that ended a run early
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectFailure {
    /// URL that failed
    pub url: String,
    /// Error class
    pub class: ErrorClass,
    /// Rendered error
    pub message: String,
}

impl CollectFailure {
    /// Record an error for a URL
    pub fn new(url: impl Into<String>, error: &Error) -> Self {
        Self {
            url: url.into(),
            class: error.class(),
            message: error.to_string(),
        }
    }
}

/// Statistics for one or more collection runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Requests issued
    pub pages_fetched: u32,
    /// Raw items seen across all pages
    pub items_seen: u64,
    /// Items turned into records
    pub records_extracted: u64,
    /// Records that were new to the accumulator
    pub records_added: u64,
    /// Items skipped because extraction failed
    pub records_skipped: u64,
    /// The caller's limit stopped a run
    pub limit_reached: bool,
    /// A page or node cap stopped a run
    pub truncated: bool,
    /// Failures that ended runs early
    pub failures: Vec<CollectFailure>,
}

impl CollectStats {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a fetched page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Record a run-ending failure
    pub fn add_failure(&mut self, url: &str, error: &Error) {
        self.failures.push(CollectFailure::new(url, error));
    }

    /// Whether every run finished without failure
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another run's statistics into these
    pub fn merge(&mut self, other: &CollectStats) {
        self.pages_fetched += other.pages_fetched;
        self.items_seen += other.items_seen;
        self.records_extracted += other.records_extracted;
        self.records_added += other.records_added;
        self.records_skipped += other.records_skipped;
        self.limit_reached |= other.limit_reached;
        self.truncated |= other.truncated;
        self.failures.extend(other.failures.iter().cloned());
    }
}

/// Output of a collection run: the accumulator handed back plus stats
#[derive(Debug, Clone)]
pub struct Collection<R: Record> {
    /// Accumulated records
    pub records: ResultSet<R>,
    /// Run statistics
    pub stats: CollectStats,
}

// ============================================================================
// Tree Collection
// ============================================================================

/// Bounds for recursive collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLimits {
    /// Records at this depth are kept but not expanded (roots are depth 0)
    pub max_depth: usize,
    /// Stop accepting records once the accumulator holds this many
    pub max_nodes: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_nodes: 10_000,
        }
    }
}

/// Where a record sits in the walked tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeVisit<K> {
    /// Record key
    pub key: K,
    /// Key of the record whose expansion produced it
    pub parent: Option<K>,
    /// Distance from the root query
    pub depth: usize,
}

/// Output of a recursive collection
#[derive(Debug, Clone)]
pub struct TreeCollection<R: Record> {
    /// Every record reached, each exactly once
    pub records: ResultSet<R>,
    /// Visit log in the order records were accepted
    pub visits: Vec<TreeVisit<R::Key>>,
    /// Aggregated statistics
    pub stats: CollectStats,
}

impl<R: Record> TreeCollection<R> {
    /// Records returned by the root query
    pub fn roots(&self) -> impl Iterator<Item = &TreeVisit<R::Key>> {
        self.visits.iter().filter(|v| v.parent.is_none())
    }

    /// Direct children of a record
    pub fn children_of(&self, key: &R::Key) -> impl Iterator<Item = &TreeVisit<R::Key>> + '_ {
        let key = key.clone();
        self.visits
            .iter()
            .filter(move |v| v.parent.as_ref() == Some(&key))
    }
}
