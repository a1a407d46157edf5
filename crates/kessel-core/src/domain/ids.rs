//! Engine-assigned identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic insertion counter assigned by the queue on enqueue.
///
/// Doubles as the FIFO tie-break of the ordering policy and as the handle a
/// reservation uses to find its entry again. Values are never reused, not even
/// after a truncate.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sequence(u64);

impl Sequence {
    pub const FIRST: Sequence = Sequence(1);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The sequence handed out after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_increase() {
        let first = Sequence::FIRST;
        let second = first.next();
        assert!(first < second);
        assert_eq!(second.get(), 2);
    }

    #[test]
    fn display_has_prefix() {
        assert_eq!(Sequence::new(42).to_string(), "seq-42");
    }
}
