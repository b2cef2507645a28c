//! Keyword search across a word list

use crate::collect::{CollectStats, Collection, PageSource, ResultSet};
use crate::confluence::{ConfluenceApi, SearchHit};
use crate::progress::Progress;
use tracing::{info, warn};

/// What one term contributed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermOutcome {
    /// Search term
    pub term: String,
    /// Hits that were new to the shared result set
    pub added: usize,
    /// Collection statistics for this term
    pub stats: CollectStats,
}

/// Result of a word-list search
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Every unique (content, term) hit
    pub hits: ResultSet<SearchHit>,
    /// Per-term outcomes in word-list order
    pub terms: Vec<TermOutcome>,
}

impl SearchReport {
    /// Terms whose search ended early
    pub fn failed_terms(&self) -> impl Iterator<Item = &TermOutcome> {
        self.terms.iter().filter(|t| !t.stats.is_complete())
    }

    /// Aggregated statistics over all terms
    pub fn stats(&self) -> CollectStats {
        let mut total = CollectStats::new();
        for outcome in &self.terms {
            total.merge(&outcome.stats);
        }
        total
    }
}

/// Search every term, threading one result set through the run
///
/// A term that fails is logged and the run moves on to the next one.
pub async fn run<S: PageSource>(
    api: &ConfluenceApi<S>,
    terms: &[String],
    limit: Option<usize>,
    progress: &Progress,
) -> SearchReport {
    info!(
        "Searching {} for {} keywords",
        api.base_url(),
        terms.len()
    );
    let bar = progress.bar(terms.len() as u64, "searching");

    let mut hits = ResultSet::new();
    let mut outcomes = Vec::with_capacity(terms.len());

    for term in terms {
        bar.set_message(term.clone());
        let before = hits.len();

        let Collection { records, stats } = api.search(term, limit, hits).await;
        hits = records;
        let added = hits.len() - before;

        if let Some(failure) = stats.failures.first() {
            warn!("Search for '{term}' ended early: {}", failure.message);
        }
        if stats.items_seen == 0 && stats.is_complete() {
            info!("No documents found for search term: {term}");
        } else {
            info!("{added} unique pages added for search term: {term}");
        }

        outcomes.push(TermOutcome {
            term: term.clone(),
            added,
            stats,
        });
        bar.inc(1);
    }

    bar.finish_and_clear();
    info!("Compiled set of {} unique pages", hits.len());

    SearchReport {
        hits,
        terms: outcomes,
    }
}
