//! Domain model: job requests and the identifiers the queue assigns to them.

pub mod ids;
pub mod job;

pub use ids::Sequence;
pub use job::{JobRequest, JobType};
