//! CLI module
//!
//! Command-line interface for the recon runs.
//!
//! # Commands
//!
//! - `search` - Keyword search over a word list
//! - `list` - Spaces, pages and attachments
//! - `members` - Members of a group
//! - `probe` - HTTP(S) port probe

mod commands;
mod runner;

pub use commands::{AuthArgs, Cli, Commands, HttpArgs};
pub use runner::Runner;
