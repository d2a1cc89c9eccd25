//! One chunk end to end inside the process: real link extraction, cookie
//! session, fan-out, pool and executor against a local server.

mod common;

use std::path::PathBuf;

use common::doc_server::{DocServer, Route};
use dcrawl_core::config::{CrawlConfig, HttpConfig, RetryConfig};
use dcrawl_core::control::CancelToken;
use dcrawl_core::fetch::HttpClient;
use dcrawl_core::links::HtmlLinkExtractor;
use dcrawl_core::partition::Chunk;
use dcrawl_core::rows::{Row, RawRow, RawCategories};
use dcrawl_core::session::CookieSession;
use dcrawl_core::worker::{ChunkRunner, RowReport, RowState, WorkerSettings};
use tempfile::tempdir;

fn settings(downloads: PathBuf) -> WorkerSettings {
    let mut s = WorkerSettings::from_config(&CrawlConfig::default(), false);
    s.downloads_dir = downloads;
    s.batch_pause_ms = 0;
    s.retry = RetryConfig {
        max_attempts: 3,
        delay_secs: 0.05,
        max_auth_refreshes: 2,
    };
    s
}

fn runner(settings: &WorkerSettings, artifact: &std::path::Path) -> ChunkRunner<CookieSession, HtmlLinkExtractor> {
    let http = HttpClient::new(&HttpConfig::default());
    let session = CookieSession::new(&settings.session, artifact, http.clone());
    let links = HtmlLinkExtractor::new(&settings.links, &settings.session.login_url_fragment, http).unwrap();
    ChunkRunner::new(session, links, settings, CancelToken::new())
}

fn run(runner: &mut ChunkRunner<CookieSession, HtmlLinkExtractor>, chunk: &Chunk) -> Vec<RowReport> {
    let mut reports = Vec::new();
    runner.run(chunk, &mut |r| reports.push(r)).unwrap();
    reports
}

#[test]
fn row_with_two_categories_lands_in_both_folders() {
    let server = DocServer::start();
    server.route(
        "/van-ban/7",
        Route::html(
            r#"<div class="the-document-entry"><div class="vn-doc">
                 <a href="/files/docA.pdf">Tải về</a>
               </div></div>"#,
        ),
    );
    server.route("/files/docA.pdf", Route::ok("%PDF-1.4 A"));

    let dir = tempdir().unwrap();
    let artifact = dir.path().join("session.json");
    common::write_artifact(&artifact);
    let downloads = dir.path().join("downloads");
    let settings = settings(downloads.clone());

    let raw = RawRow {
        url: Some(server.url("/van-ban/7").into()),
        categories: Some(RawCategories::Text("Tax; Finance".into())),
        issued: Some("15/03/2022".into()),
    };
    let row = Row::from_raw(7, raw, 2030).unwrap();
    assert_eq!(row.year, "2022");
    let chunk = Chunk { id: 0, rows: vec![row] };

    let reports = run(&mut runner(&settings, &artifact), &chunk);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].index, 7);
    assert_eq!(reports[0].state, RowState::Succeeded);

    let tax = downloads.join("Tax/2022/docA.pdf");
    let finance = downloads.join("Finance/2022/docA.pdf");
    let record = reports[0].record.as_ref().unwrap();
    assert!(record.success);
    let mut files = record.files.clone();
    files.sort();
    let mut expected = vec![tax.clone(), finance.clone()];
    expected.sort();
    assert_eq!(files, expected);
    assert_eq!(std::fs::read(&tax).unwrap(), b"%PDF-1.4 A");
    assert_eq!(std::fs::read(&finance).unwrap(), b"%PDF-1.4 A");
    // Fan-out means independent copies: one request per folder.
    assert_eq!(server.hits("/files/docA.pdf"), 2);
    assert!(server.cookies_seen().iter().all(|c| c == "sid=test"));

    // Second run: files exist, only the page is fetched again.
    let reports = run(&mut runner(&settings, &artifact), &chunk);
    assert_eq!(reports[0].state, RowState::Succeeded);
    assert_eq!(server.hits("/files/docA.pdf"), 2);
}

#[test]
fn partial_failure_is_recorded_alongside_success() {
    let server = DocServer::start();
    server.route(
        "/p",
        Route::html(r#"<a href="/ok.pdf">1</a><a href="/gone.doc">2</a>"#),
    );
    server.route("/ok.pdf", Route::ok("ok"));

    let dir = tempdir().unwrap();
    let artifact = dir.path().join("session.json");
    common::write_artifact(&artifact);
    let settings = settings(dir.path().join("downloads"));
    let chunk = Chunk {
        id: 0,
        rows: vec![Row {
            index: 0,
            url: server.url("/p"),
            categories: vec!["A".into()],
            year: "2021".into(),
        }],
    };

    let reports = run(&mut runner(&settings, &artifact), &chunk);
    let record = reports[0].record.as_ref().unwrap();
    assert_eq!(record.files.len(), 1);
    assert_eq!(record.failed.len(), 1);
    assert_eq!(record.failed[0].0, server.url("/gone.doc"));
    assert_eq!(record.failed[0].1, "HTTP 404");
    // Row succeeded on the first attempt; no retry for the missing file.
    assert_eq!(reports[0].attempts, 1);
    assert_eq!(server.hits("/gone.doc"), 1);
}

#[test]
fn all_downloads_failing_retries_the_row() {
    let server = DocServer::start();
    server.route("/p", Route::html(r#"<a href="/gone.pdf">x</a>"#));

    let dir = tempdir().unwrap();
    let artifact = dir.path().join("session.json");
    common::write_artifact(&artifact);
    let settings = settings(dir.path().join("downloads"));
    let chunk = Chunk {
        id: 0,
        rows: vec![Row {
            index: 3,
            url: server.url("/p"),
            categories: vec!["A".into()],
            year: "2021".into(),
        }],
    };

    let reports = run(&mut runner(&settings, &artifact), &chunk);
    assert_eq!(reports[0].state, RowState::Failed);
    assert_eq!(reports[0].attempts, 3);
    assert!(reports[0].record.is_none());
    assert_eq!(server.hits("/p"), 3);
    assert_eq!(server.hits("/gone.pdf"), 3);
}
