//! Worker process: one chunk, its own session, a bounded download pool.
//!
//! The CLI's hidden `worker` subcommand calls [`run_worker`] with the
//! process's stdin and stdout. Logging must not go to stdout.

mod protocol;
mod runner;

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::control::CancelToken;
use crate::fetch::HttpClient;
use crate::links::HtmlLinkExtractor;
use crate::session::CookieSession;

pub use protocol::{RowReport, RowState, WorkerEvent, WorkerJob, WorkerSettings};
pub use runner::{ChunkError, ChunkRunner};

fn emit<W: Write>(out: &mut W, event: &WorkerEvent) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Read one `WorkerJob` from `input`, run it, and stream `WorkerEvent`s to
/// `output`. Returns an error after emitting `Aborted` if the chunk could not
/// be completed.
pub fn run_worker<R: BufRead, W: Write>(input: R, mut output: W, cancel: &CancelToken) -> Result<()> {
    let job: WorkerJob = serde_json::from_reader(input).context("read worker job from stdin")?;
    let settings = &job.settings;
    tracing::info!(
        chunk = job.chunk.id,
        rows = job.chunk.rows.len(),
        pid = std::process::id(),
        "worker started"
    );

    let http = HttpClient::new(&settings.http);
    let session = CookieSession::new(&settings.session, &job.auth_artifact, http.clone());
    let links = HtmlLinkExtractor::new(&settings.links, &settings.session.login_url_fragment, http)?;
    let mut runner = ChunkRunner::new(session, links, settings, cancel.clone());

    let mut write_err: Option<std::io::Error> = None;
    let result = runner.run(&job.chunk, &mut |report| {
        if write_err.is_some() {
            return;
        }
        if let Err(e) = emit(&mut output, &WorkerEvent::Row(report)) {
            write_err = Some(e);
        }
    });

    let released = runner.locks().release_held();
    if released > 0 {
        tracing::warn!(chunk = job.chunk.id, released, "released leftover lock artifacts");
    }
    if let Some(e) = write_err {
        return Err(e).context("write row event");
    }

    match result {
        Ok(rows) => {
            emit(&mut output, &WorkerEvent::Finished { rows }).context("write finish event")?;
            tracing::info!(chunk = job.chunk.id, rows, "worker finished");
            Ok(())
        }
        Err(e) => {
            tracing::error!(chunk = job.chunk.id, "chunk aborted: {}", e);
            emit(&mut output, &WorkerEvent::Aborted { reason: e.to_string() }).context("write abort event")?;
            Err(e.into())
        }
    }
}
