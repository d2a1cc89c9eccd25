//! Hidden `dcrawl worker` – runs one chunk for the coordinator.

use anyhow::Result;
use dcrawl_core::control::CancelToken;
use dcrawl_core::worker::run_worker;

use crate::cli::signal::cancel_on_signal;

pub async fn run_worker_process() -> Result<()> {
    let cancel = CancelToken::new();
    let signals = cancel_on_signal(cancel.clone());

    let token = cancel.clone();
    let result = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        run_worker(stdin.lock(), stdout.lock(), &token)
    })
    .await?;

    signals.abort();
    if cancel.is_cancelled() {
        tracing::info!("worker stopped after interrupt");
    }
    result
}
