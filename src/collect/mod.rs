//! Paginated collection
//!
//! Walks every page of a paginated endpoint and folds the extracted
//! records into a deduplicated [`ResultSet`].
//!
//! # Overview
//!
//! The collect module provides:
//! - `Collector` - Runs the page loop against a [`PageSource`]
//! - `PageQuery` - Describes the endpoint, parameters, page size and limit
//! - `ResultSet` - Accumulator keyed by [`Record::key`]
//! - `Collector::collect_tree` - Recursive collection bounded by [`TreeLimits`]
//!
//! A failing page ends its run but never discards what earlier pages
//! produced; the failure is reported in [`CollectStats::failures`].

mod types;

pub use types::{
    CollectFailure, CollectStats, Collection, Extractor, PageQuery, PageSource, Record,
    ResultSet, TreeCollection, TreeLimits, TreeVisit,
};

use crate::error::Error;
use crate::http::Pacer;
use crate::pagination::{NextPage, PaginationState, Paginator};
use serde_json::Value;
use tracing::{debug, warn};

/// Default cap on requests issued by a single run
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Page loop driver
pub struct Collector<S> {
    source: S,
    pacer: Pacer,
    max_pages: u32,
}

impl<S: PageSource> Collector<S> {
    /// Create a collector over a page source
    pub fn new(source: S) -> Self {
        Self {
            source,
            pacer: Pacer::none(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Pause after every request
    #[must_use]
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Cap requests per run
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Get the page source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get the pacer
    pub fn pacer(&self) -> Pacer {
        self.pacer
    }

    /// Collect every page of `query` into `acc`
    ///
    /// Records whose key is already present are counted but not added.
    /// Items the extractor rejects are skipped with a warning. The run
    /// stops when the paginator is done, a page is empty, the limit is
    /// reached, the page cap is hit, or a request fails.
    pub async fn collect<R: Record>(
        &self,
        query: &PageQuery,
        paginator: &dyn Paginator,
        extract: &dyn Extractor<R>,
        mut acc: ResultSet<R>,
    ) -> Collection<R> {
        let mut stats = CollectStats::new();
        if query.limit == Some(0) {
            stats.limit_reached = true;
            return Collection { records: acc, stats };
        }

        let mut state = PaginationState::with_ceiling(query.limit.map(|l| l as u64));
        let mut target = query.url();
        let mut params = query.parameters.clone();
        params.extend(paginator.initial_params(&state));
        let mut accepted = 0usize;

        loop {
            if stats.pages_fetched >= self.max_pages {
                warn!("Stopping {} after {} pages", query.path, self.max_pages);
                stats.truncated = true;
                break;
            }

            let result = self.source.fetch_page(&target, &params).await;
            stats.add_page();
            self.pacer.pause().await;

            let body = match result {
                Ok(body) => body,
                Err(e) => {
                    warn!("Request to {target} failed: {e}");
                    stats.add_failure(&target, &e);
                    break;
                }
            };

            let Some(items) = body.get(&query.records_field).and_then(Value::as_array) else {
                let e = Error::malformed(format!(
                    "response has no '{}' array",
                    query.records_field
                ));
                warn!("Unexpected response from {target}: {e}");
                stats.add_failure(&target, &e);
                break;
            };

            stats.items_seen += items.len() as u64;
            let limit_hit = |accepted: usize| query.limit.is_some_and(|l| accepted >= l);

            for item in items {
                if limit_hit(accepted) {
                    break;
                }
                match extract.extract(item) {
                    Ok(record) => {
                        accepted += 1;
                        stats.records_extracted += 1;
                        if acc.insert(record) {
                            stats.records_added += 1;
                        }
                    }
                    Err(e) => {
                        stats.records_skipped += 1;
                        warn!("Skipping item from {target}: {e}");
                    }
                }
            }

            debug!(
                "Page {}: {} items from {target}",
                stats.pages_fetched,
                items.len()
            );

            if items.is_empty() {
                break;
            }
            if limit_hit(accepted) {
                stats.limit_reached = true;
                break;
            }

            match paginator.process_response(&body, items.len(), &mut state) {
                NextPage::Continue { query_params, url } => {
                    if let Some(url) = url {
                        if !query.is_same_origin(&url) {
                            let e = Error::malformed(format!(
                                "continuation link {url} leaves {}",
                                query.base_url
                            ));
                            warn!("Not following {url}: {e}");
                            stats.add_failure(&url, &e);
                            break;
                        }
                        // Continuation links carry their own query string
                        target = query.resolve(&url);
                        params.clear();
                    }
                    params.extend(query_params);
                }
                NextPage::Done => break,
            }
        }

        Collection { records: acc, stats }
    }

    /// Collect `root`, then recursively the queries `children` derives
    /// from each new record
    ///
    /// Every record is visited at most once, so cycles terminate. Records
    /// at `max_depth` are kept but not expanded; collection stops
    /// accepting records once the accumulator holds `max_nodes`. A
    /// failing child query does not stop its siblings.
    pub async fn collect_tree<R, F>(
        &self,
        root: &PageQuery,
        paginator: &dyn Paginator,
        extract: &dyn Extractor<R>,
        children: F,
        limits: TreeLimits,
        mut acc: ResultSet<R>,
    ) -> TreeCollection<R>
    where
        R: Record,
        F: Fn(&R) -> Option<PageQuery>,
    {
        let mut stats = CollectStats::new();
        let mut visits = Vec::new();
        let mut pending: Vec<(PageQuery, Option<R::Key>, usize)> = vec![(root.clone(), None, 0)];

        while let Some((query, parent, depth)) = pending.pop() {
            if acc.len() >= limits.max_nodes {
                warn!("Node cap of {} reached; stopping", limits.max_nodes);
                stats.truncated = true;
                break;
            }

            let Collection {
                records,
                stats: mut batch_stats,
            } = self
                .collect(&query, paginator, extract, ResultSet::new())
                .await;
            // Additions are counted against the shared accumulator below
            batch_stats.records_added = 0;
            stats.merge(&batch_stats);

            let mut expansions = Vec::new();
            for record in records {
                let key = record.key();
                if acc.contains(&key) {
                    continue;
                }
                if acc.len() >= limits.max_nodes {
                    stats.truncated = true;
                    break;
                }
                if depth < limits.max_depth {
                    if let Some(child) = children(&record) {
                        expansions.push((child, Some(key.clone()), depth + 1));
                    }
                }
                acc.insert(record);
                stats.records_added += 1;
                visits.push(TreeVisit {
                    key,
                    parent: parent.clone(),
                    depth,
                });
            }

            // First child is expanded first
            pending.extend(expansions.into_iter().rev());
        }

        TreeCollection {
            records: acc,
            visits,
            stats,
        }
    }
}

impl<S> std::fmt::Debug for Collector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("pacer", &self.pacer)
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
