//! `dcrawl run` – crawl every batch file in the batches folder.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dcrawl_core::config::CrawlConfig;
use dcrawl_core::control::CancelToken;
use dcrawl_core::coordinator::{BatchReport, Coordinator, RunOptions, WorkerCommand};
use dcrawl_core::fetch::HttpClient;
use dcrawl_core::rows::read_rows;
use dcrawl_core::session::{CookieSession, Session};
use dcrawl_core::stats::Stats;

use crate::cli::signal::cancel_on_signal;

const BATCH_EXTENSION: &str = "jsonl";

/// `*.jsonl` files in `dir`, sorted by name.
pub(crate) fn discover_batches(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == BATCH_EXTENSION) {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

pub(crate) fn format_stats(stats: &Stats) -> String {
    if stats.total == 0 {
        return "0 files".to_string();
    }
    let parts: Vec<String> = stats
        .by_extension
        .iter()
        .map(|(ext, n)| {
            let ext = if ext.is_empty() { "(none)" } else { ext.as_str() };
            format!("{} {}", ext, n)
        })
        .collect();
    format!("{} files ({})", stats.total, parts.join(", "))
}

fn print_report(report: &BatchReport) {
    let name = report
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.source.display().to_string());
    println!(
        "{}: {} rows, {} already done, {} succeeded, {} failed, {} chunk(s) failed; {}",
        name,
        report.rows_total,
        report.rows_skipped,
        report.rows_succeeded,
        report.rows_failed,
        report.chunks_failed,
        format_stats(&report.stats)
    );
}

pub async fn run_batches(cfg: &CrawlConfig, options: RunOptions) -> Result<()> {
    let batches_dir = &cfg.batches_dir;
    if !batches_dir.exists() {
        std::fs::create_dir_all(batches_dir)
            .with_context(|| format!("create batches folder {}", batches_dir.display()))?;
        println!(
            "Created {}. Put *.{} batch files there and run again.",
            batches_dir.display(),
            BATCH_EXTENSION
        );
        return Ok(());
    }
    let sources = discover_batches(batches_dir)?;
    if sources.is_empty() {
        println!("No *.{} batch files in {}.", BATCH_EXTENSION, batches_dir.display());
        return Ok(());
    }

    let artifact = cfg.session.resolved_artifact_path()?;
    let session_cfg = cfg.session.clone();
    let http = HttpClient::new(&cfg.http);
    let artifact_for_check = artifact.clone();
    let logged_in = tokio::task::spawn_blocking(move || {
        let mut session = CookieSession::new(&session_cfg, &artifact_for_check, http);
        session.check_login() || session.login()
    })
    .await?;
    if !logged_in {
        anyhow::bail!(
            "no valid session in {}; save one with `dcrawl session set --cookie NAME=VALUE`",
            artifact.display()
        );
    }

    let cancel = CancelToken::new();
    let signals = cancel_on_signal(cancel.clone());
    let worker = WorkerCommand::current_exe().context("locate dcrawl executable")?;
    let coordinator = Coordinator::new(cfg, options, artifact, worker);
    tracing::info!(
        batches = sources.len(),
        processes = cfg.process_count(),
        resume = options.resume,
        retry_mode = options.retry_mode,
        "run started"
    );

    let mut total = Stats::new();
    let (mut succeeded, mut failed) = (0usize, 0usize);
    for source in &sources {
        if cancel.is_cancelled() {
            break;
        }
        let rows = match read_rows(source) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("{}", e);
                eprintln!("skipping {}: {}", source.display(), e);
                continue;
            }
        };
        let report = coordinator.run_batch(source, rows, &cancel).await?;
        print_report(&report);
        total += &report.stats;
        succeeded += report.rows_succeeded;
        failed += report.rows_failed;
        if report.cancelled {
            break;
        }
    }
    signals.abort();

    println!(
        "Total: {} rows succeeded, {} failed; {}",
        succeeded,
        failed,
        format_stats(&total)
    );
    if cancel.is_cancelled() {
        println!("Interrupted. Progress is saved; run again to resume.");
    }
    Ok(())
}
