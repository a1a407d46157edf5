//! Queue store: entry arena plus the indexes dequeue selects from.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use chrono::{DateTime, Utc};

use super::ordering::RankKey;
use super::visibility::Visibility;
use super::{EntryState, QueueEntry};
use crate::domain::{JobRequest, Sequence};

/// Delayed entry waiting in the schedule.
///
/// `due_at` is the earlier of `visible_at` and `expires_at`: whichever comes
/// first, the entry must be back in front of the selection scan by then.
/// We use Reverse ordering so BinaryHeap acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledEntry {
    due_at: DateTime<Utc>,
    rank: RankKey,
}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_at
            .cmp(&self.due_at)
            .then_with(|| other.rank.cmp(&self.rank))
    }
}

/// Result of one selection pass.
#[derive(Debug, Default)]
pub struct Selection {
    /// The entry that was marked Reserved, if any.
    pub reserved: Option<(Sequence, JobRequest)>,

    /// Jobs found expired during the pass. They are already gone from the store.
    pub expired: Vec<JobRequest>,
}

/// Outcome of handing a Reserved entry back.
#[derive(Debug, PartialEq)]
pub enum Release {
    /// Pending again at its original rank.
    Restored,

    /// Expired while reserved, so it was dropped instead of restored.
    Expired(JobRequest),

    /// The entry was not (or no longer) reserved. Nothing changed.
    Stale,
}

/// Holds every entry the queue owns.
///
/// - `entries` is the single source of truth, keyed by sequence.
/// - `ready` holds the ranks of Pending entries whose delay has elapsed.
/// - `scheduled` holds Pending entries still delayed, earliest first.
///
/// Reserved entries live only in `entries`; they are in neither index, which
/// is what keeps them out of selection.
#[derive(Debug, Default)]
pub struct QueueStore {
    entries: HashMap<Sequence, QueueEntry>,
    ready: BTreeSet<RankKey>,
    scheduled: BinaryHeap<ScheduledEntry>,
    reserved: usize,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fresh Pending entry.
    pub fn insert(&mut self, entry: QueueEntry, now: DateTime<Utc>) {
        let sequence = entry.sequence;
        self.index(&entry, now);
        self.entries.insert(sequence, entry);
    }

    /// Reserve the best eligible entry.
    ///
    /// Walks the ready index in rank order, discarding expired entries and
    /// parking delayed ones until it finds something eligible. Selection and
    /// the Pending -> Reserved transition happen in this one call.
    pub fn select_best(&mut self, now: DateTime<Utc>) -> Selection {
        self.promote_due(now);

        let mut selection = Selection::default();
        let mut parked = Vec::new();

        while let Some(rank) = self.ready.pop_first() {
            let Some(entry) = self.entries.get_mut(&rank.sequence()) else {
                continue;
            };
            if !entry.state.is_selectable() {
                continue;
            }

            match Visibility::of(&entry.job, now) {
                Visibility::Eligible => {
                    entry.reserve();
                    self.reserved += 1;
                    selection.reserved = Some((entry.sequence, entry.job.clone()));
                    break;
                }
                Visibility::Expired => {
                    if let Some(gone) = self.entries.remove(&rank.sequence()) {
                        selection.expired.push(gone.job);
                    }
                }
                // Only reachable when the clock moved backwards.
                Visibility::Delayed => parked.push(rank.sequence()),
            }
        }

        for sequence in parked {
            if let Some(entry) = self.entries.get(&sequence) {
                Self::schedule(&mut self.scheduled, entry);
            }
        }

        selection
    }

    /// Commit: drop a Reserved entry. Returns `None` when the entry is not
    /// (or no longer) reserved, which makes a stale commit a no-op.
    pub fn remove(&mut self, sequence: Sequence) -> Option<JobRequest> {
        if self.state_of(sequence) != Some(EntryState::Reserved) {
            return None;
        }
        self.reserved -= 1;
        self.entries.remove(&sequence).map(|entry| entry.job)
    }

    /// Rollback: turn a Reserved entry back into a Pending one at its
    /// original rank, or drop it if it expired while reserved.
    pub fn reinsert(&mut self, sequence: Sequence, now: DateTime<Utc>) -> Release {
        let Some(entry) = self.entries.get_mut(&sequence) else {
            return Release::Stale;
        };
        if entry.state != EntryState::Reserved {
            return Release::Stale;
        }
        self.reserved -= 1;

        match Visibility::of(&entry.job, now) {
            Visibility::Expired => self
                .entries
                .remove(&sequence)
                .map_or(Release::Stale, |gone| Release::Expired(gone.job)),
            Visibility::Delayed => {
                entry.release();
                Self::schedule(&mut self.scheduled, entry);
                Release::Restored
            }
            Visibility::Eligible => {
                entry.release();
                self.ready.insert(entry.rank());
                Release::Restored
            }
        }
    }

    /// Drop everything, reserved entries included.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.ready.clear();
        self.scheduled.clear();
        self.reserved = 0;
    }

    pub fn state_of(&self, sequence: Sequence) -> Option<EntryState> {
        self.entries.get(&sequence).map(|entry| entry.state)
    }

    /// Pending entries, delayed ones included.
    pub fn pending_len(&self) -> usize {
        self.entries.len() - self.reserved
    }

    pub fn reserved_len(&self) -> usize {
        self.reserved
    }

    fn index(&mut self, entry: &QueueEntry, now: DateTime<Utc>) {
        match Visibility::of(&entry.job, now) {
            Visibility::Delayed => Self::schedule(&mut self.scheduled, entry),
            Visibility::Eligible | Visibility::Expired => {
                self.ready.insert(entry.rank());
            }
        }
    }

    fn schedule(scheduled: &mut BinaryHeap<ScheduledEntry>, entry: &QueueEntry) {
        let due_at = match (entry.job.visible_at(), entry.job.expires_at()) {
            (Some(visible_at), Some(expires_at)) => visible_at.min(expires_at),
            (Some(visible_at), None) => visible_at,
            (None, _) => return,
        };
        scheduled.push(ScheduledEntry {
            due_at,
            rank: entry.rank(),
        });
    }

    /// Move delayed entries whose time has come into the ready index.
    /// An entry that expired before becoming visible is promoted too, so the
    /// scan can discard it.
    fn promote_due(&mut self, now: DateTime<Utc>) {
        while let Some(next) = self.scheduled.peek() {
            if next.due_at > now {
                break; // Heap is sorted, so we can stop
            }
            let Some(due) = self.scheduled.pop() else {
                break;
            };
            if self
                .entries
                .get(&due.rank.sequence())
                .is_some_and(|entry| entry.state.is_selectable())
            {
                self.ready.insert(due.rank);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobType;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn job(reference: &str) -> JobRequest {
        JobRequest::new(JobType::new("sample").unwrap(), serde_json::json!({}))
            .with_ref(reference)
    }

    fn store_with(jobs: Vec<JobRequest>) -> QueueStore {
        let mut store = QueueStore::new();
        for (i, job) in jobs.into_iter().enumerate() {
            store.insert(QueueEntry::new(job, Sequence::new(i as u64 + 1)), now());
        }
        store
    }

    fn reserved_ref(selection: &Selection) -> Option<&str> {
        selection.reserved.as_ref().and_then(|(_, job)| job.reference())
    }

    #[test]
    fn empty_store_selects_nothing() {
        let mut store = QueueStore::new();
        let selection = store.select_best(now());
        assert!(selection.reserved.is_none());
        assert!(selection.expired.is_empty());
    }

    #[test]
    fn selection_reserves_and_hides_the_entry() {
        let mut store = store_with(vec![job("a")]);

        let first = store.select_best(now());
        assert_eq!(reserved_ref(&first), Some("a"));
        assert_eq!(store.state_of(Sequence::new(1)), Some(EntryState::Reserved));
        assert_eq!(store.pending_len(), 0);
        assert_eq!(store.reserved_len(), 1);

        assert!(store.select_best(now()).reserved.is_none());
    }

    #[test]
    fn expired_entries_are_discarded_while_scanning() {
        let mut store = store_with(vec![
            job("old").with_priority(1).with_expires_at(now() - Duration::days(365)),
            job("fresh").with_priority(2),
        ]);

        let selection = store.select_best(now());
        assert_eq!(reserved_ref(&selection), Some("fresh"));
        assert_eq!(selection.expired.len(), 1);
        assert_eq!(selection.expired[0].reference(), Some("old"));
        assert_eq!(store.state_of(Sequence::new(1)), None);
    }

    #[test]
    fn delayed_entries_wait_in_the_schedule() {
        let mut store = store_with(vec![job("later").with_visible_at(now() + Duration::milliseconds(500))]);
        assert_eq!(store.pending_len(), 1);

        assert!(store.select_best(now()).reserved.is_none());
        let selection = store.select_best(now() + Duration::milliseconds(500));
        assert_eq!(reserved_ref(&selection), Some("later"));
    }

    #[test]
    fn promoted_entries_keep_their_rank() {
        let mut store = store_with(vec![
            job("delayed-high").with_priority(1).with_visible_at(now() + Duration::seconds(1)),
            job("low").with_priority(5),
        ]);

        let later = now() + Duration::seconds(2);
        assert_eq!(reserved_ref(&store.select_best(later)), Some("delayed-high"));
        assert_eq!(reserved_ref(&store.select_best(later)), Some("low"));
    }

    #[test]
    fn clock_going_backwards_parks_the_entry_again() {
        let mut store = store_with(vec![job("a").with_visible_at(now())]);
        assert!(store.select_best(now() - Duration::seconds(1)).reserved.is_none());
        assert_eq!(store.pending_len(), 1);
        assert_eq!(reserved_ref(&store.select_best(now())), Some("a"));
    }

    #[test]
    fn remove_only_applies_to_reserved_entries() {
        let mut store = store_with(vec![job("a")]);
        assert!(store.remove(Sequence::new(1)).is_none(), "pending entries cannot be committed");

        store.select_best(now());
        let removed = store.remove(Sequence::new(1)).unwrap();
        assert_eq!(removed.reference(), Some("a"));
        assert!(store.remove(Sequence::new(1)).is_none());
        assert_eq!(store.pending_len(), 0);
        assert_eq!(store.reserved_len(), 0);
    }

    #[test]
    fn reinsert_restores_original_rank() {
        let mut store = store_with(vec![job("a"), job("b"), job("c")]);
        store.select_best(now());
        store.select_best(now());
        assert_eq!(store.reinsert(Sequence::new(1), now()), Release::Restored);
        assert_eq!(store.reinsert(Sequence::new(1), now()), Release::Stale, "second rollback is stale");

        assert_eq!(reserved_ref(&store.select_best(now())), Some("a"));
        assert_eq!(reserved_ref(&store.select_best(now())), Some("c"));
    }

    #[test]
    fn clear_drops_reserved_entries_too() {
        let mut store = store_with(vec![job("a"), job("b")]);
        store.select_best(now());
        store.clear();

        assert_eq!(store.pending_len(), 0);
        assert_eq!(store.reserved_len(), 0);
        assert!(store.remove(Sequence::new(1)).is_none());
        assert_eq!(store.reinsert(Sequence::new(1), now()), Release::Stale);
        assert!(store.select_best(now()).reserved.is_none());
    }

    #[test]
    fn reinsert_drops_an_entry_that_expired_while_reserved() {
        let mut store = store_with(vec![job("r").with_expires_at(now() + Duration::seconds(1))]);
        store.select_best(now());

        let release = store.reinsert(Sequence::new(1), now() + Duration::seconds(5));
        assert!(matches!(release, Release::Expired(job) if job.reference() == Some("r")));
        assert_eq!(store.state_of(Sequence::new(1)), None);
        assert_eq!(store.pending_len(), 0);
        assert_eq!(store.reserved_len(), 0);
    }

    #[test]
    fn delayed_entry_expiring_before_it_is_visible_is_discarded() {
        let mut store = store_with(vec![job("never")
            .with_visible_at(now() + Duration::hours(1))
            .with_expires_at(now() + Duration::seconds(1))]);

        let selection = store.select_best(now() + Duration::seconds(5));
        assert!(selection.reserved.is_none());
        assert_eq!(selection.expired.len(), 1);
        assert_eq!(selection.expired[0].reference(), Some("never"));
        assert_eq!(store.pending_len(), 0);
    }
}
