//! Minimal CSV encoder
//!
//! RFC 4180 quoting: a field containing the delimiter, a quote, or a line
//! break is wrapped in quotes and inner quotes are doubled.

use crate::error::Result;
use std::borrow::Cow;
use std::io::Write;

/// Quote a field if needed
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Render one CSV line, without the line terminator
pub fn format_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Row-oriented CSV writer
///
/// With `flush_rows` every row reaches the underlying writer before
/// `write_row` returns, so an interrupted run leaves a usable file.
pub struct CsvWriter<W: Write> {
    inner: W,
    flush_rows: bool,
    rows: usize,
}

impl<W: Write> CsvWriter<W> {
    /// Create a writer and emit the header row
    pub fn new<S: AsRef<str>>(inner: W, header: &[S]) -> Result<Self> {
        let mut writer = Self {
            inner,
            flush_rows: false,
            rows: 0,
        };
        writer.write_line(header)?;
        Ok(writer)
    }

    /// Flush after every row
    #[must_use]
    pub fn flush_each_row(mut self, enabled: bool) -> Self {
        self.flush_rows = enabled;
        self
    }

    /// Write one data row
    pub fn write_row<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        self.write_line(fields)?;
        self.rows += 1;
        if self.flush_rows {
            self.inner.flush()?;
        }
        Ok(())
    }

    /// Data rows written so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and return the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write_line<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        writeln!(self.inner, "{}", format_row(fields))?;
        Ok(())
    }
}
