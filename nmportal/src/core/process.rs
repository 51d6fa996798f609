//! Supervision of external helper processes.
//!
//! The portal runs `dnsmasq` next to the hotspot. Each helper is tracked
//! under a symbolic id while it runs; its stdout and stderr are forwarded
//! line by line to the log, and the entry disappears as soon as the process
//! exits, whatever the reason.

use log::{Level, debug, info, log, warn};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;

use crate::Result;
use crate::api::models::PortalError;

struct ManagedProcess {
    /// Launch counter, so a stale monitor never removes a newer process.
    generation: u64,
    kill: Option<oneshot::Sender<()>>,
    /// Flips to `true` once the process exited and its output was drained.
    done: watch::Receiver<bool>,
}

type ProcessTable = Arc<Mutex<HashMap<String, ManagedProcess>>>;

/// Launches, monitors and terminates helper processes by id.
#[derive(Default)]
pub struct ProcessSupervisor {
    processes: ProcessTable,
    generation: AtomicU64,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `program` and tracks it under `id`.
    ///
    /// A process already tracked under the same id is killed first. Fails if
    /// the program cannot be spawned or its output pipes are missing.
    pub async fn start<S: AsRef<OsStr>>(&self, id: &str, program: S, args: &[String]) -> Result<()> {
        if self.is_running(id).await {
            warn!("{id} is already running, restarting it");
            self.stop(id).await;
        }

        let mut child = Command::new(program.as_ref())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PortalError::Spawn {
                id: id.to_string(),
                source,
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill {id} after missing pipes: {e}");
            }
            return Err(PortalError::MissingPipe(id.to_string()));
        };

        info!(
            "Started {id} ({}) with pid {}",
            program.as_ref().to_string_lossy(),
            child.id().unwrap_or_default()
        );

        let stdout_task = drain(id.to_string(), stdout, Level::Info);
        let stderr_task = drain(id.to_string(), stderr, Level::Warn);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = watch::channel(false);

        self.processes.lock().await.insert(
            id.to_string(),
            ManagedProcess {
                generation,
                kill: Some(kill_tx),
                done: done_rx,
            },
        );

        let processes = Arc::clone(&self.processes);
        let id = id.to_string();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    if let Err(e) = child.start_kill() {
                        warn!("Failed to kill {id}: {e}");
                    }
                    child.wait().await
                }
            };

            match status {
                Ok(status) => info!("{id} exited: {status}"),
                Err(e) => warn!("Failed to collect exit status of {id}: {e}"),
            }

            {
                let mut table = processes.lock().await;
                if table.get(&id).is_some_and(|p| p.generation == generation) {
                    table.remove(&id);
                }
            }

            let _ = futures::join!(stdout_task, stderr_task);
            debug!("Output of {id} drained");
            let _ = done_tx.send(true);
        });

        Ok(())
    }

    /// Sends a kill signal to the process tracked under `id`.
    ///
    /// Returns without waiting for the exit; the entry is removed by the
    /// monitor once the process is gone.
    pub async fn stop(&self, id: &str) {
        let mut table = self.processes.lock().await;
        match table.get_mut(id).and_then(|p| p.kill.take()) {
            Some(kill) => {
                debug!("Stopping {id}");
                let _ = kill.send(());
            }
            None => debug!("{id} is not running, nothing to stop"),
        }
    }

    /// Like [`stop`](Self::stop), then waits up to `timeout` for the process
    /// to exit and its output to be drained.
    ///
    /// Returns `false` if the deadline passed first.
    pub async fn stop_and_wait(&self, id: &str, timeout: Duration) -> bool {
        let done = self.processes.lock().await.get(id).map(|p| p.done.clone());
        let Some(mut done) = done else {
            return true;
        };

        self.stop(id).await;

        match tokio::time::timeout(timeout, done.wait_for(|finished| *finished)).await {
            Ok(_) => true,
            Err(_) => {
                warn!("{id} did not finish within {timeout:?}");
                false
            }
        }
    }

    /// Whether a process is currently tracked under `id`.
    pub async fn is_running(&self, id: &str) -> bool {
        self.processes.lock().await.contains_key(id)
    }
}

fn drain<R>(id: String, reader: R, level: Level) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => log!(level, "[{id}] {line}"),
                Ok(None) => break,
                Err(e) => {
                    warn!("[{id}] output read failed: {e}");
                    break;
                }
            }
        }
    })
}
