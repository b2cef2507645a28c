//! Space, page and attachment inventory

use crate::collect::{CollectStats, PageSource, ResultSet, TreeCollection, TreeLimits};
use crate::confluence::{Attachment, ConfluenceApi, PageRef, Space};
use crate::progress::Progress;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// How pages are enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryOptions {
    /// Walk child pages from each space's root pages instead of the flat listing
    pub tree: bool,
    /// Bounds for the tree walk
    pub limits: TreeLimits,
    /// Also collect attachments of every page
    pub attachments: bool,
}

impl Default for InventoryOptions {
    fn default() -> Self {
        Self {
            tree: false,
            limits: TreeLimits::default(),
            attachments: true,
        }
    }
}

/// A page in listing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// The page
    pub page: PageRef,
    /// Nesting depth; always 0 for flat listings
    pub depth: usize,
    /// Parent page id in tree mode
    pub parent: Option<String>,
}

/// One space and its pages
#[derive(Debug, Clone)]
pub struct SpaceEntry {
    /// The space
    pub space: Space,
    /// Pages, parents before their children
    pub pages: Vec<PageEntry>,
    /// Page collection statistics for this space
    pub stats: CollectStats,
}

/// Everything a list run found
#[derive(Debug, Clone)]
pub struct Inventory {
    /// Spaces in fetch order
    pub spaces: Vec<SpaceEntry>,
    /// Attachments of every page, one shared accumulator
    pub attachments: ResultSet<Attachment>,
    /// Aggregated statistics (spaces, pages and attachments)
    pub stats: CollectStats,
}

impl Inventory {
    /// Attachments belonging to a page
    pub fn attachments_of<'a>(&'a self, page_id: &'a str) -> impl Iterator<Item = &'a Attachment> {
        self.attachments.iter().filter(move |a| a.page_id == page_id)
    }

    /// Number of pages across all spaces
    pub fn page_count(&self) -> usize {
        self.spaces.iter().map(|s| s.pages.len()).sum()
    }
}

/// Enumerate spaces, their pages, and the pages' attachments
///
/// A failing space or page is logged and skipped; the rest of the run
/// continues.
pub async fn run<S: PageSource>(
    api: &ConfluenceApi<S>,
    options: InventoryOptions,
    progress: &Progress,
) -> Inventory {
    info!("Retrieving all spaces from {}", api.base_url());
    let spaces = api.spaces(ResultSet::new()).await;
    let mut stats = spaces.stats.clone();
    if let Some(failure) = spaces.stats.failures.first() {
        warn!("Space listing ended early: {}", failure.message);
    }
    info!("Found {} spaces", spaces.records.len());

    let bar = progress.bar(spaces.records.len() as u64, "spaces");
    let mut attachments = ResultSet::new();
    let mut entries = Vec::with_capacity(spaces.records.len());

    for space in spaces.records {
        bar.set_message(space.key.clone());

        let (pages, page_stats) = if options.tree {
            let tree = api
                .page_tree(&space.key, options.limits, ResultSet::new())
                .await;
            let stats = tree.stats.clone();
            (tree_order(tree), stats)
        } else {
            let flat = api.pages_in_space(&space.key, ResultSet::new()).await;
            let pages = flat
                .records
                .into_iter()
                .map(|page| PageEntry {
                    page,
                    depth: 0,
                    parent: None,
                })
                .collect();
            (pages, flat.stats)
        };

        if let Some(failure) = page_stats.failures.first() {
            warn!("Pages of space {} incomplete: {}", space.key, failure.message);
        }
        debug!("Space {}: {} pages", space.key, pages.len());
        stats.merge(&page_stats);

        if options.attachments {
            for entry in &pages {
                let collected = api.attachments(&entry.page.id, attachments).await;
                attachments = collected.records;
                stats.merge(&collected.stats);
            }
        }

        entries.push(SpaceEntry {
            space,
            pages,
            stats: page_stats,
        });
        bar.inc(1);
    }

    bar.finish_and_clear();

    let inventory = Inventory {
        spaces: entries,
        attachments,
        stats,
    };
    info!(
        "Listed {} spaces, {} pages, {} attachments",
        inventory.spaces.len(),
        inventory.page_count(),
        inventory.attachments.len()
    );
    inventory
}

/// Flatten a page tree so every parent precedes its children
fn tree_order(tree: TreeCollection<PageRef>) -> Vec<PageEntry> {
    let mut children: HashMap<Option<String>, Vec<(String, usize)>> = HashMap::new();
    for visit in &tree.visits {
        children
            .entry(visit.parent.clone())
            .or_default()
            .push((visit.key.clone(), visit.depth));
    }

    let mut ordered = Vec::with_capacity(tree.visits.len());
    let mut stack: Vec<(Option<String>, String, usize)> = children
        .get(&None)
        .map(|roots| {
            roots
                .iter()
                .rev()
                .map(|(key, depth)| (None, key.clone(), *depth))
                .collect()
        })
        .unwrap_or_default();

    while let Some((parent, key, depth)) = stack.pop() {
        if let Some(kids) = children.get(&Some(key.clone())) {
            stack.extend(
                kids.iter()
                    .rev()
                    .map(|(child, d)| (Some(key.clone()), child.clone(), *d)),
            );
        }
        if let Some(page) = tree.records.get(&key) {
            ordered.push(PageEntry {
                page: page.clone(),
                depth,
                parent,
            });
        }
    }

    ordered
}
