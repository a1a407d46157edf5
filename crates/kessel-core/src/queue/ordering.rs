//! Ordering policy: which pending job is dequeued first.

use std::cmp::Ordering;

use crate::domain::Sequence;

/// Rank of an entry under the ordering policy. Smaller ranks are dequeued first.
///
/// - Primary key: priority ascending, where a missing priority sorts after
///   every defined one.
/// - Secondary key: sequence ascending, which makes equal priorities FIFO.
///
/// A rank is derived from fields that never change, so an entry rolled back
/// after a reservation lands exactly where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RankKey {
    priority: Option<i32>,
    sequence: Sequence,
}

impl RankKey {
    pub fn new(priority: Option<i32>, sequence: Sequence) -> Self {
        Self { priority, sequence }
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Option's own ordering puts None first; unprioritized jobs go last.
        let by_priority = match (self.priority, other.priority) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_priority.then_with(|| self.sequence.cmp(&other.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key(priority: Option<i32>, seq: u64) -> RankKey {
        RankKey::new(priority, Sequence::new(seq))
    }

    #[rstest]
    #[case::lower_priority_first(key(Some(1), 2), key(Some(10), 1))]
    #[case::negative_priority_first(key(Some(-5), 9), key(Some(0), 1))]
    #[case::prioritized_before_unprioritized(key(Some(100), 5), key(None, 1))]
    #[case::fifo_on_equal_priority(key(Some(3), 1), key(Some(3), 2))]
    #[case::fifo_without_priority(key(None, 1), key(None, 2))]
    fn ranks_before(#[case] first: RankKey, #[case] second: RankKey) {
        assert!(first < second);
        assert!(second > first);
    }

    #[test]
    fn sorting_is_stable_and_total() {
        let mut keys = vec![
            key(None, 1),
            key(Some(10), 2),
            key(Some(1), 3),
            key(None, 4),
            key(Some(1), 5),
        ];
        keys.sort();
        let order: Vec<u64> = keys.iter().map(|k| k.sequence().get()).collect();
        assert_eq!(order, vec![3, 5, 2, 1, 4]);

        let mut again = keys.clone();
        again.sort();
        assert_eq!(again, keys);
    }
}
