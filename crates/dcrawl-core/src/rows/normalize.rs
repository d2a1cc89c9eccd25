//! Category and issue-date normalization.

use chrono::{Datelike, NaiveDate};

/// Category used when a row has none (or only blank ones).
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Splits a `;`-separated category cell, trimming entries and dropping blanks.
/// Order is kept and duplicates are removed.
pub fn split_categories(cell: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in cell.split(';') {
        let part = part.trim();
        if !part.is_empty() && !out.iter().any(|c| c == part) {
            out.push(part.to_string());
        }
    }
    out
}

/// Extracts the issue year from a `dd/mm/yyyy` date (ISO `yyyy-mm-dd` is accepted too).
/// Returns `None` for missing or malformed dates; the caller picks the fallback.
pub fn issue_year(issued: Option<&str>) -> Option<String> {
    let text = issued?.trim();
    if text.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(text, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .ok()
        .map(|d| d.year().to_string())
}
