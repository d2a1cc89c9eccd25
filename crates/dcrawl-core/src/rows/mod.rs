//! Work rows: one source page, its category labels, and its issue year.
//!
//! Rows are read from JSON Lines batch files. Malformed categories and dates
//! are recovered with defaults (`unknown`, current year) and logged, because a
//! single bad cell must not stop a batch. Those defaults can route a document
//! into the wrong bucket, so every fallback is reported at warn level.

mod normalize;
mod source;

pub use normalize::{issue_year, split_categories, UNKNOWN_CATEGORY};
pub use source::{read_rows, RowSourceError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized work row. `index` is the row's position in its batch file and
/// is the key under which its progress is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub index: usize,
    pub url: String,
    pub categories: Vec<String>,
    pub year: String,
}

/// Categories as they appear in a batch file: either `"Tax; Finance"` or a list.
/// Any other JSON value lands in `Other` and is filed under `unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawCategories {
    Text(String),
    List(Vec<String>),
    Other(Value),
}

/// One un-normalized line of a batch file. `url` and `issued` are kept as raw
/// JSON values so a cell of the wrong type only affects its own row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRow {
    #[serde(default, alias = "Url")]
    pub url: Option<Value>,
    #[serde(default)]
    pub categories: Option<RawCategories>,
    #[serde(default)]
    pub issued: Option<Value>,
}

fn as_text(value: &Option<Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

impl Row {
    /// Normalizes a raw row. Returns `None` when the row has no usable URL.
    pub fn from_raw(index: usize, raw: RawRow, current_year: i32) -> Option<Row> {
        let url = as_text(&raw.url)
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())?;

        let categories = match raw.categories {
            Some(RawCategories::Text(text)) => split_categories(&text),
            Some(RawCategories::List(list)) => split_categories(&list.join(";")),
            Some(RawCategories::Other(value)) => {
                tracing::warn!(row = index, url = %url, categories = %value, "categories cell is not text or a list");
                Vec::new()
            }
            None => Vec::new(),
        };
        let categories = if categories.is_empty() {
            tracing::warn!(row = index, url = %url, "missing categories, filing under '{}'", UNKNOWN_CATEGORY);
            vec![UNKNOWN_CATEGORY.to_string()]
        } else {
            categories
        };

        let year = match issue_year(as_text(&raw.issued)) {
            Some(year) => year,
            None => {
                let issued = match &raw.issued {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                tracing::warn!(
                    row = index,
                    url = %url,
                    issued = %issued,
                    "unparseable issue date, using current year {}",
                    current_year
                );
                current_year.to_string()
            }
        };

        Some(Row {
            index,
            url,
            categories,
            year,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(url: &str, categories: Option<&str>, issued: Option<&str>) -> RawRow {
        RawRow {
            url: Some(url.into()),
            categories: categories.map(|c| RawCategories::Text(c.to_string())),
            issued: issued.map(Value::from),
        }
    }

    #[test]
    fn normalizes_categories_and_year() {
        let row = Row::from_raw(7, raw("https://x/doc", Some("Tax; Finance"), Some("15/03/2022")), 2030)
            .unwrap();
        assert_eq!(row.index, 7);
        assert_eq!(row.categories, vec!["Tax", "Finance"]);
        assert_eq!(row.year, "2022");
    }

    #[test]
    fn malformed_fields_fall_back() {
        let row = Row::from_raw(0, raw("https://x/doc", Some(" ; "), Some("not a date")), 2030).unwrap();
        assert_eq!(row.categories, vec![UNKNOWN_CATEGORY]);
        assert_eq!(row.year, "2030");

        let row = Row::from_raw(1, raw("https://x/doc", None, None), 2031).unwrap();
        assert_eq!(row.categories, vec![UNKNOWN_CATEGORY]);
        assert_eq!(row.year, "2031");
    }

    #[test]
    fn list_categories_are_accepted() {
        let mut r = raw("https://x/doc", None, Some("01/01/2020"));
        r.categories = Some(RawCategories::List(vec!["A".into(), " B ".into(), "".into()]));
        let row = Row::from_raw(3, r, 2030).unwrap();
        assert_eq!(row.categories, vec!["A", "B"]);
    }

    #[test]
    fn wrongly_typed_cells_fall_back() {
        let raw: RawRow =
            serde_json::from_str(r#"{"url": "https://x/doc", "categories": 5, "issued": 20200201}"#).unwrap();
        let row = Row::from_raw(4, raw, 2030).unwrap();
        assert_eq!(row.categories, vec![UNKNOWN_CATEGORY]);
        assert_eq!(row.year, "2030");

        let raw: RawRow =
            serde_json::from_str(r#"{"url": "https://x/doc", "categories": ["A", {"b": 1}], "issued": null}"#)
                .unwrap();
        let row = Row::from_raw(5, raw, 2030).unwrap();
        assert_eq!(row.categories, vec![UNKNOWN_CATEGORY]);
    }

    #[test]
    fn row_without_url_is_dropped() {
        assert!(Row::from_raw(0, RawRow::default(), 2030).is_none());
        assert!(Row::from_raw(0, raw("   ", Some("A"), None), 2030).is_none());
        let numeric: RawRow = serde_json::from_str(r#"{"url": 42, "categories": "A"}"#).unwrap();
        assert!(Row::from_raw(0, numeric, 2030).is_none());
    }
}
