//! Local names for downloaded documents and category folders.
//!
//! Filenames come from the last segment of the document URL; category labels
//! become a single directory component. Both are sanitized so a label such as
//! `Tax/Finance` can never escape the downloads tree.

use crate::lock::LOCK_SUFFIX;

/// Fallback when a URL has no usable last path segment.
pub const DEFAULT_FILENAME: &str = "document.bin";

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Longest document filename; leaves room for the lock side file's suffix.
pub const DOCUMENT_NAME_MAX: usize = NAME_MAX - LOCK_SUFFIX.len();

/// Extensions longer than this are treated as part of the stem when truncating.
const MAX_EXTENSION_LEN: usize = 16;

fn truncate_at_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut take = max;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}

/// Extracts the last path segment from a URL for use as a filename hint.
///
/// Returns `None` if the URL cannot be parsed or the path is empty/root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Sanitizes one path component for Linux.
///
/// - Replaces NUL, `/`, `\`, and control characters with `_`
/// - Trims leading/trailing spaces and dots
/// - Limits length to 255 bytes (Linux NAME_MAX)
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '\0' || c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == ' ' || c == '.');

    truncate_at_boundary(trimmed, NAME_MAX).to_string()
}

/// Shortens `name` to at most `max` bytes, cutting the stem and keeping the
/// extension so per-extension stats stay correct.
pub fn fit_filename(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let ext = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LEN && name.len() - dot < max => &name[dot..],
        _ => "",
    };
    let stem = truncate_at_boundary(&name[..name.len() - ext.len()], max - ext.len());
    format!("{}{}", stem, ext)
}

/// Filename a document URL is saved under.
pub fn document_filename(url: &str) -> String {
    filename_from_url_path(url)
        .map(|s| sanitize_component(&s))
        .filter(|s| !s.is_empty())
        .map(|s| fit_filename(&s, DOCUMENT_NAME_MAX))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Directory name for a category label.
pub fn category_dir(category: &str) -> String {
    let name = sanitize_component(category);
    if name.is_empty() {
        crate::rows::UNKNOWN_CATEGORY.to_string()
    } else {
        name
    }
}
