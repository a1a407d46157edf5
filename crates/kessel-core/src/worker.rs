use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Span, debug, info, warn};

use crate::config::WorkerConfig;
use crate::error::QueueError;
use crate::ports::QueueBackend;
use crate::runtime::Runtime;

/// Worker group handle.
/// - Dropping the group (and with it `shutdown_tx`) stops every worker.
/// - `shutdown_and_join()` waits for all of them to finish.
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `config.workers` consumers on the current tokio runtime.
    pub fn spawn(
        config: &WorkerConfig,
        backend: Arc<dyn QueueBackend>,
        runtime: Arc<Runtime>,
        span: Span,
    ) -> Result<Self, QueueError> {
        config.validate()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poll_interval = config.poll_interval();

        let mut joins = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let backend = Arc::clone(&backend);
            let runtime = Arc::clone(&runtime);
            let mut rx = shutdown_rx.clone();
            let span = span.clone();

            let join = tokio::spawn(async move {
                info!(parent: &span, worker_id, "worker started");
                worker_loop(worker_id, backend, runtime, poll_interval, &mut rx, &span).await;
                info!(parent: &span, worker_id, "worker stopped");
            });
            joins.push(join);
        }

        Ok(Self { shutdown_tx, joins })
    }

    /// Request shutdown for all workers.
    /// A dequeue or handler already in flight runs to completion and its
    /// reservation is resolved; workers just stop reserving new jobs.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    backend: Arc<dyn QueueBackend>,
    runtime: Arc<Runtime>,
    poll_interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
    span: &Span,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // Never raced against shutdown: a dropped dequeue could strand a reservation.
        let reservation = match backend.dequeue().await {
            Ok(Some(reservation)) => reservation,
            Ok(None) => {
                if !idle(poll_interval, shutdown_rx).await {
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(parent: span, worker_id, error = %e, "dequeue failed");
                if !idle(poll_interval, shutdown_rx).await {
                    break;
                }
                continue;
            }
        };

        let job = reservation.job().clone();
        match runtime.execute(&job).await {
            Ok(()) => {
                if let Err(e) = reservation.commit().await {
                    warn!(parent: span, worker_id, error = %e, "commit failed");
                }
                debug!(parent: span, worker_id, sequence = ?job.sequence(), "job done");
            }
            Err(err) => {
                warn!(
                    parent: span,
                    worker_id,
                    sequence = ?job.sequence(),
                    job_type = %job.job_type(),
                    error = %err,
                    "job failed, rolling back"
                );
                if let Err(e) = reservation.rollback().await {
                    warn!(parent: span, worker_id, error = %e, "rollback failed");
                }
                // A rolled back job keeps its rank, so back off before it comes around again.
                if !idle(poll_interval, shutdown_rx).await {
                    break;
                }
            }
        }
    }
}

/// Sleep for one poll interval. Returns `false` once the worker should stop.
async fn idle(poll_interval: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(poll_interval) => true,
        changed = shutdown_rx.changed() => changed.is_ok() && !*shutdown_rx.borrow(),
    }
}
