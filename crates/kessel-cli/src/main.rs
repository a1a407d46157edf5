use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kessel_core::domain::{JobRequest, JobType};
use kessel_core::error::QueueError;
use kessel_core::observability::component_span;
use kessel_core::ports::{QueueBackend, SystemClock};
use kessel_core::queue::InMemoryQueue;
use kessel_core::runtime::{HandlerRegistry, JobHandler, Runtime};
use kessel_core::worker::WorkerGroup;
use kessel_core::{QueueConfig, WorkerConfig};

#[derive(Debug, Deserialize)]
struct Operands {
    operands: Vec<i64>,
}

/// Folds the operands of an arithmetic job with one operator.
struct ArithmeticHandler {
    name: &'static str,
    identity: i64,
    op: fn(i64, i64) -> Option<i64>,
}

#[async_trait]
impl JobHandler for ArithmeticHandler {
    async fn handle(&self, job: &JobRequest) -> Result<(), QueueError> {
        let Operands { operands } = serde_json::from_value(job.payload().clone())
            .map_err(|e| QueueError::handler(format!("json decode: {e}")))?;

        let value = operands
            .iter()
            .try_fold(self.identity, |acc, x| (self.op)(acc, *x))
            .ok_or_else(|| QueueError::handler(format!("{} overflowed", self.name)))?;

        info!(
            job_type = self.name,
            reference = job.reference(),
            ?operands,
            value,
            "job processed"
        );
        Ok(())
    }
}

fn registry() -> anyhow::Result<HandlerRegistry> {
    let mut reg = HandlerRegistry::new();
    reg.register(
        JobType::new("add")?,
        Arc::new(ArithmeticHandler {
            name: "add",
            identity: 0,
            op: i64::checked_add,
        }),
    )?;
    reg.register(
        JobType::new("multiply")?,
        Arc::new(ArithmeticHandler {
            name: "multiply",
            identity: 1,
            op: i64::checked_mul,
        }),
    )?;
    Ok(reg)
}

fn arithmetic(job_type: &str, operands: &[i64]) -> anyhow::Result<JobRequest> {
    Ok(JobRequest::new(
        JobType::new(job_type)?,
        serde_json::json!({ "operands": operands }),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let queue_config = QueueConfig::from_env().context("queue config")?;
    let worker_config = WorkerConfig::from_env().context("worker config")?;

    let queue = Arc::new(InMemoryQueue::new(
        &queue_config,
        Arc::new(SystemClock),
        component_span("queue"),
    ));
    let registry = registry()?;
    info!(job_types = ?registry.job_types(), "handlers registered");
    let runtime = Arc::new(Runtime::new(Arc::new(registry), component_span("runtime")));

    let now = Utc::now();
    let jobs = [
        arithmetic("add", &[1, 2])?.with_ref("plain"),
        arithmetic("multiply", &[3, 4])?.with_ref("urgent").with_priority(1),
        arithmetic("add", &[10, 20, 30])?
            .with_ref("delayed")
            .with_visible_at(now + ChronoDuration::milliseconds(500)),
        arithmetic("multiply", &[2, 2])?
            .with_ref("stale")
            .with_expires_at(now - ChronoDuration::seconds(1)),
        arithmetic("divide", &[1, 0])?.with_ref("unroutable").with_expires_at(now + ChronoDuration::seconds(1)),
    ];
    for job in jobs {
        let accepted = queue.enqueue(job).await.context("enqueue")?;
        info!(sequence = ?accepted.sequence(), reference = accepted.reference(), "enqueued");
    }

    let group = WorkerGroup::spawn(
        &worker_config,
        queue.clone(),
        runtime,
        component_span("worker"),
    )
    .context("worker group")?;

    while !queue.is_empty().await? || queue.counts().await.reserved > 0 {
        sleep(Duration::from_millis(50)).await;
    }
    info!(counts = ?queue.counts().await, "queue drained");

    group.shutdown_and_join().await;
    Ok(())
}
