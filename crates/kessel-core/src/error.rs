use thiserror::Error;

use crate::domain::JobType;

/// Errors reported by queue backends and the dispatcher.
///
/// An empty queue is not an error: `dequeue` reports it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Malformed input rejected at the caller's boundary.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A durable backend could not be reached or was configured with bad
    /// network parameters. The caller decides whether to retry.
    #[error("backend connectivity: {0}")]
    Connectivity(String),

    #[error("handler not found for job_type={0}")]
    HandlerNotFound(JobType),

    #[error("handler failed: {0}")]
    Handler(String),
}

impl QueueError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}
