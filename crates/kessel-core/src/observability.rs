//! Logging context and queue status views.
//!
//! Components never reach for a global logger. Each one is handed a span at
//! construction and records its events under it; installing a subscriber is
//! the binary's job.

use serde::{Deserialize, Serialize};
use tracing::Span;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub reserved: usize,
}

/// Named span for one component, e.g. `component_span("queue")`.
pub fn component_span(component: &'static str) -> Span {
    tracing::info_span!("kessel", component)
}
