//! Output module
//!
//! Handles report rendering and file writing.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Normalizing records into [`ReportRow`]s
//! - The per-command text layouts
//! - CSV and JSON-lines report files
//! - Row-flushed CSV writing for the port probe

mod csv;
mod writer;

pub use csv::{escape_field, format_row, CsvWriter};
pub use writer::{
    create_file, inventory_rows, inventory_text, join_url, member_rows, members_text, search_rows,
    search_text, ReportRow, ReportWriter, REPORT_HEADER,
};
