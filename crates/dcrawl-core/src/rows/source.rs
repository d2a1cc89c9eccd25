//! JSON Lines batch reader.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::Datelike;
use thiserror::Error;

use super::{RawRow, Row};

#[derive(Debug, Error)]
pub enum RowSourceError {
    #[error("read batch {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: invalid row: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads every row of a batch file. Blank lines are ignored; a row's index is
/// its zero-based line number so progress keys survive edits to other lines.
/// Rows without a URL are skipped with a warning.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, RowSourceError> {
    let io_err = |source| RowSourceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let current_year = chrono::Local::now().year();

    let mut rows = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawRow = serde_json::from_str(&line).map_err(|source| RowSourceError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        match Row::from_raw(index, raw, current_year) {
            Some(row) => rows.push(row),
            None => tracing::warn!(batch = %path.display(), row = index, "row has no url, skipped"),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_with_line_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"url": "https://a/1", "categories": "Tax", "issued": "01/02/2020"}"#, "\n",
                "\n",
                r#"{"categories": "Tax"}"#, "\n",
                r#"{"Url": "https://a/2", "categories": ["X", "Y"]}"#, "\n",
            ),
        )
        .unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 0);
        assert_eq!(rows[0].year, "2020");
        assert_eq!(rows[1].index, 3);
        assert_eq!(rows[1].categories, vec!["X", "Y"]);
    }

    #[test]
    fn bad_cell_types_do_not_drop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"url": "https://a/1", "categories": "Tax", "issued": "01/02/2020"}"#, "\n",
                r#"{"url": "https://a/2", "categories": 5, "issued": "01/02/2021"}"#, "\n",
                r#"{"url": "https://a/3", "categories": "Law", "issued": 20200201}"#, "\n",
            ),
        )
        .unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].categories, vec![crate::rows::UNKNOWN_CATEGORY]);
        assert_eq!(rows[1].year, "2021");
        assert_eq!(rows[2].categories, vec!["Law"]);
        assert_eq!(rows[2].year, chrono::Local::now().year().to_string());
    }

    #[test]
    fn invalid_json_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"url\": \"https://a/1\"}\n{not json\n").unwrap();
        match read_rows(&path) {
            Err(RowSourceError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_rows(Path::new("/nonexistent/batch.jsonl")).unwrap_err();
        assert!(matches!(err, RowSourceError::Io { .. }));
    }
}
