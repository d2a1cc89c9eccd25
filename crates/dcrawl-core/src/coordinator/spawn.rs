//! One worker child per chunk: send the job, relay events, report exit.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};

use crate::worker::{WorkerEvent, WorkerJob};

/// How to start a worker process. Defaults to `<current exe> worker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, ["worker"]))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

/// What a chunk task sends back to the coordinator loop.
#[derive(Debug)]
pub(super) enum ChunkMessage {
    Event(WorkerEvent),
    /// The child is gone. `success` is its exit status.
    Exited { success: bool, detail: String },
}

pub(super) fn spawn_worker(worker: &WorkerCommand) -> Result<Child> {
    worker
        .command()
        .spawn()
        .with_context(|| format!("spawn worker {}", worker.program.display()))
}

/// Drive one child to completion. Every event line is forwarded as it
/// arrives so progress is saved even if the child dies later.
pub(super) async fn drive_worker(
    mut child: Child,
    job: WorkerJob,
    tx: mpsc::UnboundedSender<(usize, ChunkMessage)>,
    mut stop: watch::Receiver<bool>,
) {
    let chunk_id = job.chunk.id;

    if let Some(mut stdin) = child.stdin.take() {
        let write = async {
            let payload = serde_json::to_vec(&job)?;
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
            anyhow::Ok(())
        };
        if let Err(e) = write.await {
            tracing::warn!(chunk = chunk_id, "send job to worker: {:#}", e);
        }
    }

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        let mut stop_sent = false;
        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<WorkerEvent>(&line) {
                            Ok(ev) => {
                                let _ = tx.send((chunk_id, ChunkMessage::Event(ev)));
                            }
                            Err(e) => tracing::warn!(chunk = chunk_id, "unreadable worker line {:?}: {}", line, e),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(chunk = chunk_id, "read worker output: {}", e);
                        break;
                    }
                },
                changed = stop.changed(), if !stop_sent => {
                    stop_sent = true;
                    if changed.is_ok() && *stop.borrow() {
                        interrupt(&mut child, chunk_id);
                    }
                }
            }
        }
    }

    let (success, detail) = match child.wait().await {
        Ok(status) => (status.success(), status.to_string()),
        Err(e) => (false, format!("wait: {}", e)),
    };
    let _ = tx.send((chunk_id, ChunkMessage::Exited { success, detail }));
}

/// Ask the child to stop taking new work. On unix this is SIGINT, which the
/// worker handles gracefully; elsewhere the child is killed.
fn interrupt(child: &mut Child, chunk_id: usize) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            tracing::info!(chunk = chunk_id, pid, "forwarding interrupt to worker");
            let r = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
            if r != 0 {
                tracing::warn!(chunk = chunk_id, pid, "kill(SIGINT): {}", std::io::Error::last_os_error());
            }
        }
    }
    #[cfg(not(unix))]
    {
        tracing::info!(chunk = chunk_id, "stopping worker");
        if let Err(e) = child.start_kill() {
            tracing::warn!(chunk = chunk_id, "kill worker: {}", e);
        }
    }
}
