//! kessel-core
//!
//! A job queue with transactional dequeue.
//!
//! - **domain**: job requests, job types, sequences
//! - **ports**: the `QueueBackend` / `Reservation` contract and the `Clock`
//! - **queue**: the in-memory engine (ordering, visibility, store)
//! - **runtime**: handler registry and dispatch
//! - **worker**: a group of consumers driving a backend through the runtime
//! - **config**, **error**, **observability**: ambient pieces shared by all of the above

pub mod config;
pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod runtime;
pub mod worker;

#[doc(hidden)]
pub mod backend_spec;

pub use config::{QueueConfig, WorkerConfig};
pub use domain::{JobRequest, JobType, Sequence};
pub use error::QueueError;
pub use ports::{Clock, QueueBackend, Reservation, SystemClock};
pub use queue::InMemoryQueue;
