//! `dcrawl probe <url>` – debug link extraction for one page.

use anyhow::{Context, Result};
use dcrawl_core::config::CrawlConfig;
use dcrawl_core::control::CancelToken;
use dcrawl_core::fetch::{Executor, HttpClient};
use dcrawl_core::links::{HtmlLinkExtractor, LinkExtractor, LinkOutcome};
use dcrawl_core::lock::LockManager;
use dcrawl_core::naming::document_filename;
use dcrawl_core::pool::{download_all, PoolSettings};
use dcrawl_core::session::{CookieSession, Session};
use dcrawl_core::task::DownloadTask;

pub async fn run_probe(cfg: &CrawlConfig, url: &str, download: bool) -> Result<()> {
    let cfg = cfg.clone();
    let url = url.to_string();
    tokio::task::spawn_blocking(move || probe_blocking(&cfg, &url, download)).await?
}

fn probe_blocking(cfg: &CrawlConfig, url: &str, download: bool) -> Result<()> {
    let http = HttpClient::new(&cfg.http);
    let artifact = cfg.session.resolved_artifact_path()?;
    let mut session = CookieSession::new(&cfg.session, &artifact, http.clone());
    if !session.check_login() {
        println!("warning: session is not valid; fetching anonymously");
    }
    let extractor = HtmlLinkExtractor::new(&cfg.links, &cfg.session.login_url_fragment, http.clone())
        .context("links config")?;

    let links = match extractor.find_document_links(url, &session) {
        LinkOutcome::Links(links) => links,
        LinkOutcome::AuthRequired => {
            println!("{}: login required", url);
            return Ok(());
        }
        LinkOutcome::Error(e) => anyhow::bail!("{}: {}", url, e),
    };
    println!("{} document link(s) on {}", links.len(), url);
    for l in &links {
        println!("  {}", l);
    }
    if !download || links.is_empty() {
        return Ok(());
    }

    let tasks: Vec<DownloadTask> = links
        .iter()
        .map(|l| DownloadTask {
            url: l.clone(),
            filename: document_filename(l),
            folder: cfg.downloads_dir.clone(),
            retry_mode: false,
        })
        .collect();
    let executor = Executor::new(
        http,
        LockManager::new(),
        std::time::Duration::from_secs(cfg.lock_timeout_secs),
    )
    .with_headers(session.headers());
    let status = download_all(&tasks, &PoolSettings::from_config(cfg), &executor, &CancelToken::new());
    for (_, path) in &status.successful {
        println!("  saved {}", path.display());
    }
    for (url, err) in &status.failed {
        println!("  failed {}: {}", url, err);
    }
    Ok(())
}
