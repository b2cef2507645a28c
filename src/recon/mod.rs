//! Recon runs
//!
//! Each run strings together [`ConfluenceApi`](crate::confluence::ConfluenceApi)
//! operations, threading accumulators from one sub-query to the next.
//!
//! - `search` - keyword search over a word list with per-term attribution
//! - `inventory` - spaces, pages (flat or tree) and attachments
//! - `members` - group membership

pub mod inventory;
pub mod members;
pub mod search;

pub use inventory::{Inventory, InventoryOptions, PageEntry, SpaceEntry};
pub use search::{SearchReport, TermOutcome};
