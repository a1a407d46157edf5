//! In-memory queue implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{Span, debug, info, warn};

use super::store::{QueueStore, Release};
use super::QueueEntry;
use crate::config::QueueConfig;
use crate::domain::{JobRequest, Sequence};
use crate::error::QueueError;
use crate::observability::QueueCounts;
use crate::ports::{Clock, QueueBackend, Reservation};

/// In-memory queue state.
struct InMemoryQueueState {
    store: QueueStore,

    /// Next sequence to assign. Survives truncate.
    next_sequence: Sequence,
}

impl InMemoryQueueState {
    fn new() -> Self {
        Self {
            store: QueueStore::new(),
            next_sequence: Sequence::FIRST,
        }
    }

    fn allocate_sequence(&mut self) -> Sequence {
        let sequence = self.next_sequence;
        self.next_sequence = sequence.next();
        sequence
    }
}

/// Volatile reference backend.
///
/// Every mutation goes through one mutex, so two consumers can never reserve
/// the same entry. Contents are lost when the queue is dropped.
pub struct InMemoryQueue {
    state: Arc<Mutex<InMemoryQueueState>>,
    clock: Arc<dyn Clock>,
    simulated_latency: Duration,
    span: Span,
}

impl InMemoryQueue {
    /// `span` is the logging context every event of this queue (and of the
    /// reservations it hands out) is recorded under. Pass `Span::none()` to
    /// keep the queue silent.
    pub fn new(config: &QueueConfig, clock: Arc<dyn Clock>, span: Span) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryQueueState::new())),
            clock,
            simulated_latency: config.simulated_latency(),
            span,
        }
    }

    pub async fn counts(&self) -> QueueCounts {
        let state = self.state.lock().await;
        QueueCounts {
            pending: state.store.pending_len(),
            reserved: state.store.reserved_len(),
        }
    }

    /// Imitates the gap between a request and its effect on a networked queue.
    async fn simulate_latency(&self) {
        if !self.simulated_latency.is_zero() {
            tokio::time::sleep(self.simulated_latency).await;
        }
    }
}

#[async_trait]
impl QueueBackend for InMemoryQueue {
    async fn enqueue(&self, job: JobRequest) -> Result<JobRequest, QueueError> {
        self.simulate_latency().await;

        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let sequence = state.allocate_sequence();
        let entry = QueueEntry::new(job, sequence);
        let accepted = entry.job.clone();
        state.store.insert(entry, now);
        drop(state);

        debug!(
            parent: &self.span,
            sequence = %sequence,
            job_type = %accepted.job_type(),
            reference = accepted.reference(),
            "job enqueued"
        );
        Ok(accepted)
    }

    async fn dequeue(&self) -> Result<Option<Box<dyn Reservation>>, QueueError> {
        self.simulate_latency().await;

        let selection = {
            let mut state = self.state.lock().await;
            state.store.select_best(self.clock.now())
        };

        for job in &selection.expired {
            warn!(
                parent: &self.span,
                sequence = ?job.sequence(),
                job_type = %job.job_type(),
                reference = job.reference(),
                "expired job discarded"
            );
        }

        let Some((sequence, job)) = selection.reserved else {
            return Ok(None);
        };

        debug!(parent: &self.span, sequence = %sequence, job_type = %job.job_type(), "job reserved");
        Ok(Some(Box::new(InMemoryReservation {
            sequence,
            job,
            queue: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            span: self.span.clone(),
        })))
    }

    async fn truncate(&self) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let dropped = state.store.pending_len() + state.store.reserved_len();
        state.store.clear();
        drop(state);

        info!(parent: &self.span, dropped, "queue truncated");
        Ok(())
    }

    async fn size(&self) -> Result<usize, QueueError> {
        let state = self.state.lock().await;
        Ok(state.store.pending_len())
    }
}

/// Reservation implementation for InMemoryQueue.
///
/// Holds the entry's sequence only; the store decides whether the entry is
/// still reserved when the outcome arrives.
struct InMemoryReservation {
    sequence: Sequence,
    job: JobRequest,
    queue: Arc<Mutex<InMemoryQueueState>>,
    clock: Arc<dyn Clock>,
    span: Span,
}

#[async_trait]
impl Reservation for InMemoryReservation {
    fn job(&self) -> &JobRequest {
        &self.job
    }

    async fn commit(self: Box<Self>) -> Result<(), QueueError> {
        let removed = {
            let mut state = self.queue.lock().await;
            state.store.remove(self.sequence)
        };

        if removed.is_some() {
            debug!(parent: &self.span, sequence = %self.sequence, "job committed");
        } else {
            debug!(parent: &self.span, sequence = %self.sequence, "stale commit ignored");
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), QueueError> {
        let release = {
            let mut state = self.queue.lock().await;
            state.store.reinsert(self.sequence, self.clock.now())
        };

        match release {
            Release::Restored => {
                debug!(parent: &self.span, sequence = %self.sequence, "job rolled back");
            }
            Release::Expired(job) => {
                warn!(
                    parent: &self.span,
                    sequence = %self.sequence,
                    job_type = %job.job_type(),
                    reference = job.reference(),
                    "expired job discarded on rollback"
                );
            }
            Release::Stale => {
                debug!(parent: &self.span, sequence = %self.sequence, "stale rollback ignored");
            }
        }
        Ok(())
    }
}
