//! Dispatch of dequeued jobs to the code that processes them.
//!
//! The queue never looks at `type`; routing lives here. A `HandlerRegistry` is
//! filled once at startup, frozen behind an `Arc`, and shared by every worker
//! through a `Runtime`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{Span, debug};

use crate::domain::{JobRequest, JobType};
use crate::error::QueueError;

/// Processes jobs of one type. Returning `Err` makes the worker roll the job
/// back.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &JobRequest) -> Result<(), QueueError>;
}

/// `JobType` to handler routing table.
#[derive(Default)]
pub struct HandlerRegistry {
    routes: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each job type gets exactly one handler.
    pub fn register(
        &mut self,
        job_type: JobType,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), QueueError> {
        match self.routes.entry(job_type) {
            Entry::Occupied(taken) => Err(QueueError::validation(format!(
                "job type {} already has a handler",
                taken.key()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(handler);
                Ok(())
            }
        }
    }

    pub fn get(&self, job_type: &JobType) -> Option<&Arc<dyn JobHandler>> {
        self.routes.get(job_type)
    }

    /// Registered job types, sorted.
    pub fn job_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.routes.keys().map(JobType::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

pub struct Runtime {
    registry: Arc<HandlerRegistry>,
    span: Span,
}

impl Runtime {
    pub fn new(registry: Arc<HandlerRegistry>, span: Span) -> Self {
        Self { registry, span }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Route `job` to its handler and run it. A job type nobody registered is
    /// `HandlerNotFound`.
    pub async fn execute(&self, job: &JobRequest) -> Result<(), QueueError> {
        let Some(handler) = self.registry.get(job.job_type()) else {
            return Err(QueueError::HandlerNotFound(job.job_type().clone()));
        };

        let started = Instant::now();
        let outcome = handler.handle(job).await;
        debug!(
            parent: &self.span,
            job_type = %job.job_type(),
            reference = job.reference(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "handler finished"
        );
        outcome
    }
}
