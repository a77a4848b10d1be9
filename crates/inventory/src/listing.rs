//! Parser for `pm list packages -f` output.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub path: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Listing line has no prefix: {0}")]
    MissingPrefix(String),
    #[error("Listing line has no path delimiter: {0}")]
    MissingDelimiter(String),
    #[error("Listing line has an empty package id: {0}")]
    EmptyId(String),
}

/// Parses one `<prefix>:<path>=<id>` line.
///
/// Paths may themselves contain `=`, so the id starts after the last one.
pub fn parse_line(line: &str) -> Result<ListingEntry, ParseError> {
    let line = line.trim();
    let Some((_, rest)) = line.split_once(':') else {
        return Err(ParseError::MissingPrefix(line.to_string()));
    };
    let Some((path, id)) = rest.rsplit_once('=') else {
        return Err(ParseError::MissingDelimiter(line.to_string()));
    };
    if id.is_empty() {
        return Err(ParseError::EmptyId(line.to_string()));
    }
    Ok(ListingEntry {
        path: path.to_string(),
        id: id.to_string(),
    })
}

/// Parses a whole listing. Blank lines are ignored; bad lines are returned
/// separately so one of them never sinks the rest.
pub fn parse_listing(output: &str) -> (Vec<ListingEntry>, Vec<ParseError>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        match parse_line(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => errors.push(e),
        }
    }

    (entries, errors)
}
