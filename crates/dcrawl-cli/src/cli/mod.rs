//! CLI for the dcrawl document crawler.

mod commands;
mod signal;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dcrawl_core::config::{self, CrawlConfig};
use dcrawl_core::coordinator::RunOptions;

use commands::{run_batches, run_check_session, run_clean_locks, run_probe, run_set_session, run_worker_process};

/// Top-level CLI for dcrawl.
#[derive(Debug, Parser)]
#[command(name = "dcrawl")]
#[command(about = "dcrawl: resumable multi-process document crawler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Overrides for `dcrawl run`; unset flags keep the config file values.
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Folder with `*.jsonl` batch files.
    #[arg(long, value_name = "DIR")]
    pub batches: Option<PathBuf>,
    /// Root of the `<category>/<year>/<file>` download tree.
    #[arg(long, value_name = "DIR")]
    pub downloads: Option<PathBuf>,
    /// Ignore progress files and process every row.
    #[arg(long)]
    pub no_resume: bool,
    /// Manual re-run: skip per-file locks.
    #[arg(long)]
    pub retry: bool,
    /// Worker processes per batch.
    #[arg(long, value_name = "N")]
    pub processes: Option<usize>,
    /// Download threads per worker process.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
    /// Downloads started per round inside a worker.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,
    /// Rows per worker process.
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,
}

impl RunArgs {
    pub fn apply(&self, cfg: &mut CrawlConfig) {
        if let Some(d) = &self.batches {
            cfg.batches_dir = d.clone();
        }
        if let Some(d) = &self.downloads {
            cfg.downloads_dir = d.clone();
        }
        if let Some(n) = self.processes {
            cfg.max_processes = Some(n.max(1));
        }
        if let Some(n) = self.workers {
            cfg.workers_per_process = n.max(1);
        }
        if let Some(n) = self.batch_size {
            cfg.inner_batch_size = n.max(1);
        }
        if let Some(n) = self.chunk_size {
            cfg.chunk_size = n.max(1);
        }
    }

    pub fn options(&self) -> RunOptions {
        RunOptions {
            resume: !self.no_resume,
            retry_mode: self.retry,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Crawl every batch file in the batches folder.
    Run(RunArgs),

    /// Show the document links found on one page; optionally download them.
    Probe {
        /// Page URL.
        url: String,
        /// Also download the links into the downloads folder.
        #[arg(long)]
        download: bool,
        #[arg(long, value_name = "DIR")]
        downloads: Option<PathBuf>,
    },

    /// Manage the saved login (auth artifact).
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Remove leftover `*.lock` files and staging dirs. Only run while no crawl is active.
    CleanLocks {
        #[arg(long, value_name = "DIR")]
        downloads: Option<PathBuf>,
    },

    /// Worker process entry point (spawned by `run`).
    #[command(hide = true)]
    Worker,
}

#[derive(Debug, Subcommand)]
pub enum SessionAction {
    /// Save cookies copied from a logged-in browser.
    Set {
        /// Cookie as NAME=VALUE; repeat for several.
        #[arg(long = "cookie", value_name = "NAME=VALUE", required = true)]
        cookies: Vec<String>,
    },
    /// Report whether the saved session is usable.
    Check,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run(args) => {
                let mut cfg = load_config()?;
                args.apply(&mut cfg);
                run_batches(&cfg, args.options()).await?;
            }
            CliCommand::Probe {
                url,
                download,
                downloads,
            } => {
                let mut cfg = load_config()?;
                if let Some(d) = downloads {
                    cfg.downloads_dir = d;
                }
                run_probe(&cfg, &url, download).await?;
            }
            CliCommand::Session { action } => {
                let cfg = load_config()?;
                match action {
                    SessionAction::Set { cookies } => run_set_session(&cfg, &cookies)?,
                    SessionAction::Check => run_check_session(&cfg).await?,
                }
            }
            CliCommand::CleanLocks { downloads } => {
                let root = match downloads {
                    Some(d) => d,
                    None => load_config()?.downloads_dir,
                };
                run_clean_locks(&root)?;
            }
            // Workers get their settings on stdin, not from the config file.
            CliCommand::Worker => run_worker_process().await?,
        }

        Ok(())
    }
}

fn load_config() -> Result<CrawlConfig> {
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests;
