//! Queue entry: job request + reservation state.

use super::EntryState;
use super::ordering::RankKey;
use crate::domain::{JobRequest, Sequence};

/// A job request as held by the store.
///
/// Design:
/// - This is the single source of truth for an entry's state.
/// - The rank index and delay schedule hold keys only.
/// - All state transitions happen here.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub job: JobRequest,
    pub state: EntryState,
    pub sequence: Sequence,
}

impl QueueEntry {
    /// Wrap an accepted job. The job carries the same sequence.
    pub fn new(mut job: JobRequest, sequence: Sequence) -> Self {
        job.assign_sequence(sequence);
        Self {
            job,
            state: EntryState::Pending,
            sequence,
        }
    }

    /// Position under the ordering policy. Fixed for the entry's lifetime.
    pub fn rank(&self) -> RankKey {
        RankKey::new(self.job.priority(), self.sequence)
    }

    pub fn reserve(&mut self) {
        self.state = EntryState::Reserved;
    }

    pub fn release(&mut self) {
        self.state = EntryState::Pending;
    }
}
