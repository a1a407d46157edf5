//! Per-entry state machine.

use serde::{Deserialize, Serialize};

/// State of a queue entry.
///
/// State transitions:
/// - Pending -> Reserved (dequeue selected it)
/// - Reserved -> removed (commit)
/// - Reserved -> Pending (rollback, same rank as before)
///
/// There is no terminal variant: committed and expired entries leave the
/// store instead of lingering in a final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryState {
    /// Waiting in the queue, possibly still delayed.
    Pending,

    /// Handed to a consumer, awaiting commit or rollback.
    Reserved,
}

impl EntryState {
    /// Can dequeue pick this entry?
    pub fn is_selectable(self) -> bool {
        matches!(self, EntryState::Pending)
    }
}
