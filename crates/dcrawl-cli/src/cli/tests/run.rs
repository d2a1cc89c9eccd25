//! Tests for the run subcommand and its config overrides.

use std::path::{Path, PathBuf};

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use dcrawl_core::config::CrawlConfig;

#[test]
fn cli_parse_run_defaults() {
    match parse(&["dcrawl", "run"]) {
        CliCommand::Run(args) => {
            assert!(args.batches.is_none());
            assert!(args.downloads.is_none());
            assert!(!args.no_resume);
            assert!(!args.retry);
            assert!(args.processes.is_none());
            let opts = args.options();
            assert!(opts.resume);
            assert!(!opts.retry_mode);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_all_flags() {
    match parse(&[
        "dcrawl",
        "run",
        "--batches",
        "in",
        "--downloads",
        "/data/out",
        "--no-resume",
        "--retry",
        "--processes",
        "2",
        "--workers",
        "8",
        "--batch-size",
        "3",
        "--chunk-size",
        "10",
    ]) {
        CliCommand::Run(args) => {
            let mut cfg = CrawlConfig::default();
            args.apply(&mut cfg);
            assert_eq!(cfg.batches_dir, PathBuf::from("in"));
            assert_eq!(cfg.downloads_dir, Path::new("/data/out"));
            assert_eq!(cfg.max_processes, Some(2));
            assert_eq!(cfg.process_count(), 2);
            assert_eq!(cfg.workers_per_process, 8);
            assert_eq!(cfg.inner_batch_size, 3);
            assert_eq!(cfg.chunk_size, 10);
            let opts = args.options();
            assert!(!opts.resume);
            assert!(opts.retry_mode);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn zero_overrides_are_clamped() {
    match parse(&["dcrawl", "run", "--workers", "0", "--chunk-size", "0"]) {
        CliCommand::Run(args) => {
            let mut cfg = CrawlConfig::default();
            args.apply(&mut cfg);
            assert_eq!(cfg.workers_per_process, 1);
            assert_eq!(cfg.chunk_size, 1);
            assert_eq!(cfg.inner_batch_size, 5);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_rejects_bad_number() {
    assert!(Cli::try_parse_from(["dcrawl", "run", "--processes", "many"]).is_err());
}
