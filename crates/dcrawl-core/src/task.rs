//! Download tasks and the link × category fan-out.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::naming::{category_dir, document_filename};
use crate::rows::Row;

/// One concrete file fetch destined for one folder. Created by fan-out,
/// consumed once by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    pub url: String,
    pub filename: String,
    pub folder: PathBuf,
    /// Skip the per-destination lock (manual re-runs only).
    pub retry_mode: bool,
}

impl DownloadTask {
    pub fn destination(&self) -> PathBuf {
        self.folder.join(&self.filename)
    }
}

/// Expands every document link into one task per category of `row`:
/// N links × M categories → N×M tasks, each targeting
/// `<downloads_root>/<category>/<year>/<filename>`. A document listed under
/// several categories is fetched once per folder; copies are independent.
pub fn fan_out(row: &Row, links: &[String], downloads_root: &Path, retry_mode: bool) -> Vec<DownloadTask> {
    let mut tasks = Vec::with_capacity(links.len() * row.categories.len());
    for link in links {
        let filename = document_filename(link);
        for category in &row.categories {
            tasks.push(DownloadTask {
                url: link.clone(),
                filename: filename.clone(),
                folder: downloads_root.join(category_dir(category)).join(&row.year),
                retry_mode,
            });
        }
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(categories: &[&str]) -> Row {
        Row {
            index: 7,
            url: "https://example.com/page".into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            year: "2022".into(),
        }
    }

    #[test]
    fn one_link_two_categories() {
        let links = vec!["https://example.com/files/docA.pdf".to_string()];
        let tasks = fan_out(&row(&["Tax", "Finance"]), &links, Path::new("downloads"), false);
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.url == links[0] && t.filename == "docA.pdf"));
        assert_eq!(tasks[0].folder, Path::new("downloads/Tax/2022"));
        assert_eq!(tasks[1].folder, Path::new("downloads/Finance/2022"));
        assert_eq!(tasks[1].destination(), Path::new("downloads/Finance/2022/docA.pdf"));
    }

    #[test]
    fn n_links_by_m_categories() {
        let links: Vec<String> = (0..3).map(|i| format!("https://e.com/{}.doc", i)).collect();
        let tasks = fan_out(&row(&["A", "B"]), &links, Path::new("d"), true);
        assert_eq!(tasks.len(), 6);
        assert!(tasks.iter().all(|t| t.retry_mode));
    }

    #[test]
    fn no_links_no_tasks() {
        assert!(fan_out(&row(&["A"]), &[], Path::new("d"), false).is_empty());
    }
}
