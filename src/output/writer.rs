//! Report files
//!
//! Every command writes either its own text layout or normalized
//! [`ReportRow`]s as CSV or JSON lines.

use super::csv::CsvWriter;
use crate::collect::ResultSet;
use crate::confluence::{Member, SearchHit};
use crate::error::{Error, Result};
use crate::recon::Inventory;
use crate::types::OutputFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// CSV header for report rows
pub const REPORT_HEADER: [&str; 7] = [
    "timestamp",
    "target",
    "identifier",
    "title",
    "derived_url",
    "source_term",
    "status",
];

/// One normalized output row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    /// When the row was produced
    pub timestamp: DateTime<Utc>,
    /// Instance base URL
    pub target: String,
    /// Record identifier (content id, space key, username)
    pub identifier: String,
    /// Human-readable title
    pub title: String,
    /// Absolute URL of the record, when it has one
    pub derived_url: Option<String>,
    /// Search term that produced the record
    pub source_term: Option<String>,
    /// Record kind (`hit`, `space`, `page`, `attachment`, `member`)
    pub status: String,
}

impl ReportRow {
    fn new(target: &str, identifier: &str, title: &str, status: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            target: target.to_string(),
            identifier: identifier.to_string(),
            title: title.to_string(),
            derived_url: None,
            source_term: None,
            status: status.to_string(),
        }
    }

    fn with_url(mut self, url: Option<String>) -> Self {
        self.derived_url = url;
        self
    }

    /// CSV fields in header order
    pub fn csv_fields(&self) -> [String; 7] {
        [
            self.timestamp.to_rfc3339(),
            self.target.clone(),
            self.identifier.clone(),
            self.title.clone(),
            self.derived_url.clone().unwrap_or_default(),
            self.source_term.clone().unwrap_or_default(),
            self.status.clone(),
        ]
    }
}

/// Join a base URL and a server-relative link
pub fn join_url(base: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    format!("{}{}", base.trim_end_matches('/'), link)
}

// ============================================================================
// Rows
// ============================================================================

/// Rows for search hits
pub fn search_rows(base: &str, hits: &ResultSet<SearchHit>) -> Vec<ReportRow> {
    hits.iter()
        .map(|hit| {
            let identifier = hit.id.as_deref().unwrap_or(&hit.webui);
            let mut row = ReportRow::new(base, identifier, &hit.title, "hit")
                .with_url(Some(join_url(base, &hit.webui)));
            row.source_term = Some(hit.term.clone());
            row
        })
        .collect()
}

/// Rows for spaces, pages and attachments
pub fn inventory_rows(base: &str, inventory: &Inventory) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for entry in &inventory.spaces {
        let space = &entry.space;
        rows.push(
            ReportRow::new(base, &space.key, &space.name, "space")
                .with_url(space.webui.as_deref().map(|w| join_url(base, w))),
        );
        for page in &entry.pages {
            rows.push(
                ReportRow::new(base, &page.page.id, &page.page.title, "page")
                    .with_url(page.page.webui.as_deref().map(|w| join_url(base, w))),
            );
            for attachment in inventory.attachments_of(&page.page.id) {
                rows.push(
                    ReportRow::new(base, &attachment.id, &attachment.title, "attachment")
                        .with_url(Some(join_url(base, &attachment.download))),
                );
            }
        }
    }
    rows
}

/// Rows for group members
pub fn member_rows(base: &str, members: &ResultSet<Member>) -> Vec<ReportRow> {
    members
        .iter()
        .map(|m| {
            ReportRow::new(
                base,
                &m.username,
                m.display_name.as_deref().unwrap_or(&m.username),
                "member",
            )
        })
        .collect()
}

// ============================================================================
// Text Layouts
// ============================================================================

/// `URL\n      title - Found using term: term` per hit
pub fn search_text(base: &str, hits: &ResultSet<SearchHit>) -> String {
    let mut out = String::new();
    for hit in hits {
        let _ = writeln!(out, "{}", join_url(base, &hit.webui));
        let _ = writeln!(out, "      {} - Found using term: {}", hit.title, hit.term);
    }
    out
}

/// Space / page / attachment listing, pages indented by tree depth
pub fn inventory_text(base: &str, inventory: &Inventory) -> String {
    let mut out = String::from("[*] Retrieving all spaces...\n");
    for entry in &inventory.spaces {
        let _ = writeln!(out, "[*] Space: {}", entry.space.key);
        for page in &entry.pages {
            let indent = "    ".repeat(page.depth + 1);
            let _ = writeln!(
                out,
                "{indent}[Page] {} (ID: {})",
                page.page.title, page.page.id
            );
            for attachment in inventory.attachments_of(&page.page.id) {
                let _ = writeln!(
                    out,
                    "{indent}    [Attachment] {} -> {}",
                    attachment.title,
                    join_url(base, &attachment.download)
                );
            }
        }
    }
    out
}

/// One username per line
pub fn members_text(members: &ResultSet<Member>) -> String {
    members.iter().fold(String::new(), |mut out, m| {
        let _ = writeln!(out, "{}", m.username);
        out
    })
}

// ============================================================================
// Writer
// ============================================================================

/// Writes one report file in the selected format
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
    format: OutputFormat,
}

impl ReportWriter {
    /// Create a writer for `path`
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write search hits, returning the number of records written
    pub fn write_search(&self, base: &str, hits: &ResultSet<SearchHit>) -> Result<usize> {
        match self.format {
            OutputFormat::Text => self.write_text(&search_text(base, hits), hits.len()),
            _ => self.write_rows(&search_rows(base, hits)),
        }
    }

    /// Write an inventory, returning the number of records written
    pub fn write_inventory(&self, base: &str, inventory: &Inventory) -> Result<usize> {
        match self.format {
            OutputFormat::Text => {
                let count =
                    inventory.spaces.len() + inventory.page_count() + inventory.attachments.len();
                self.write_text(&inventory_text(base, inventory), count)
            }
            _ => self.write_rows(&inventory_rows(base, inventory)),
        }
    }

    /// Write group members, returning the number of records written
    pub fn write_members(&self, base: &str, members: &ResultSet<Member>) -> Result<usize> {
        match self.format {
            OutputFormat::Text => self.write_text(&members_text(members), members.len()),
            _ => self.write_rows(&member_rows(base, members)),
        }
    }

    fn write_text(&self, text: &str, count: usize) -> Result<usize> {
        let mut file = self.create()?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        info!("Saved {count} records to {}", self.path.display());
        Ok(count)
    }

    fn write_rows(&self, rows: &[ReportRow]) -> Result<usize> {
        let file = self.create()?;
        match self.format {
            OutputFormat::Csv => {
                let mut csv = CsvWriter::new(file, &REPORT_HEADER)?;
                for row in rows {
                    csv.write_row(&row.csv_fields())?;
                }
                csv.into_inner()?;
            }
            _ => {
                let mut file = file;
                for row in rows {
                    serde_json::to_writer(&mut file, row)?;
                    file.write_all(b"\n")?;
                }
                file.flush()?;
            }
        }
        info!("Saved {} records to {}", rows.len(), self.path.display());
        Ok(rows.len())
    }

    fn create(&self) -> Result<BufWriter<File>> {
        create_file(&self.path)
    }
}

/// Create `path` for writing, making any missing parent directories
pub fn create_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::output(format!("cannot create {}: {e}", parent.display())))?;
        }
    }
    let file = File::create(path)
        .map_err(|e| Error::output(format!("cannot create {}: {e}", path.display())))?;
    Ok(BufWriter::new(file))
}
