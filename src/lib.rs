// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # confluence-recon
//!
//! Read-only enumeration of a Confluence instance over its REST API, plus
//! a small HTTP(S) port probe.
//!
//! ## Features
//!
//! - **Keyword Search**: CQL full-text search for every term of a word list,
//!   with each hit attributed to the term that found it
//! - **Inventory**: spaces, pages (flat or as a bounded tree) and attachments
//! - **Group Members**: any member endpoint, following `_links.next`
//! - **Port Probe**: HTTPS then HTTP per port, classified by response
//! - **One Collector**: every listing goes through the same paginated,
//!   deduplicating collection loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use confluence_recon::collect::{Collector, ResultSet};
//! use confluence_recon::confluence::ConfluenceApi;
//! use confluence_recon::http::{HttpClient, HttpClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> confluence_recon::Result<()> {
//!     let client = HttpClient::with_config(
//!         HttpClientConfig::builder()
//!             .base_url("https://wiki.example.com")
//!             .build(),
//!     )?;
//!     let api = ConfluenceApi::new("https://wiki.example.com", Collector::new(client));
//!
//!     let hits = api.search("password", None, ResultSet::new()).await;
//!     for hit in &hits.records {
//!         println!("{} ({})", hit.title, api.absolute_url(&hit.webui));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │   cli: search | list | members | probe                       │
//! └──────────────────────────────────────────────────────────────┘
//!                 │                                    │
//! ┌───────────────┴──────────────┐        ┌────────────┴─────────┐
//! │ recon: search/inventory/...  │        │ probe: Prober        │
//! │ confluence: ConfluenceApi    │        │                      │
//! │ collect: Collector           │        │                      │
//! │ pagination: offset/next link │        │                      │
//! └───────────────┬──────────────┘        └────────────┬─────────┘
//!                 │                                    │
//! ┌───────────────┴────────────────────────────────────┴─────────┐
//! │ http: retry, backoff, pacing, TLS toggle  │  auth  │ output  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Run configuration and YAML profiles
pub mod config;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry, pacing and rate limiting
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Paginated, deduplicating collection
pub mod collect;

/// Confluence REST endpoints and records
pub mod confluence;

/// Search, inventory and member runs
pub mod recon;

/// HTTP(S) port probe
pub mod probe;

/// Report rendering and file output
pub mod output;

/// Word-list loading
pub mod wordlist;

/// Progress bars
pub mod progress;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
