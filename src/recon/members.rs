//! Group member enumeration

use crate::collect::{Collection, PageSource, ResultSet};
use crate::confluence::{ConfluenceApi, Member};
use tracing::{debug, info, warn};

/// Collect every member listed at `endpoint`
pub async fn run<S: PageSource>(api: &ConfluenceApi<S>, endpoint: &str) -> Collection<Member> {
    info!("Retrieving members from {}{endpoint}", api.base_url());
    let collection = api.group_members(endpoint, ResultSet::new()).await;

    for member in &collection.records {
        debug!("Retrieved user: {}", member.username);
    }
    if let Some(failure) = collection.stats.failures.first() {
        warn!("Error retrieving members: {}", failure.message);
    }
    info!("Retrieved {} members", collection.records.len());

    collection
}
