//! QueueBackend port: the contract every queue implementation satisfies.
//!
//! The dispatcher only talks to this trait, so the in-memory engine and a
//! durable queue service reached over the network are interchangeable.
//!
//! # Contract
//! - `enqueue` acknowledges acceptance and returns the job with its sequence.
//! - `dequeue` returns at most one job, wrapped in a `Reservation`, or
//!   `Ok(None)` when nothing is eligible right now.
//! - `Reservation::commit` removes the job for good.
//! - `Reservation::rollback` makes the job eligible again at its original rank.
//! - `truncate` clears all state, outstanding reservations included.
//!
//! Priority, delay and expiration semantics are part of the contract. A
//! durable backend may additionally fail with `QueueError::Connectivity`.

use async_trait::async_trait;

use crate::domain::JobRequest;
use crate::error::QueueError;

/// A reserved job. The holder must resolve it with exactly one of `commit` or
/// `rollback`; both consume the reservation.
///
/// Dropping a reservation without resolving it leaves the job reserved. No
/// lease timer brings it back.
#[async_trait]
pub trait Reservation: Send {
    fn job(&self) -> &JobRequest;

    /// Processing succeeded: remove the job permanently.
    async fn commit(self: Box<Self>) -> Result<(), QueueError>;

    /// Processing failed or was aborted: hand the job back to the queue.
    async fn rollback(self: Box<Self>) -> Result<(), QueueError>;
}

#[async_trait]
pub trait QueueBackend: Send + Sync {
    async fn enqueue(&self, job: JobRequest) -> Result<JobRequest, QueueError>;

    /// Reserve the best eligible job.
    ///
    /// Not required to be cancel safe: a backend may reserve and then await
    /// (an acknowledgement, say), so callers drive the future to completion.
    async fn dequeue(&self) -> Result<Option<Box<dyn Reservation>>, QueueError>;

    /// Drop every job, pending or reserved. Meant for tests and resets.
    async fn truncate(&self) -> Result<(), QueueError>;

    /// Number of pending jobs. Reserved jobs are not counted.
    async fn size(&self) -> Result<usize, QueueError>;

    async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.size().await? == 0)
    }
}
