//! Search term lists
//!
//! One term per line. Surrounding whitespace is trimmed; blank lines and
//! lines starting with `#` are ignored.

use crate::error::{Error, Result};
use std::path::Path;

/// Parse terms from word-list text
pub fn parse(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Load terms from a file
///
/// An unreadable file or one without any terms is a configuration error.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| Error::Wordlist {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let terms = parse(&text);
    if terms.is_empty() {
        return Err(Error::Wordlist {
            path: path.display().to_string(),
            message: "no search terms".to_string(),
        });
    }
    Ok(terms)
}
