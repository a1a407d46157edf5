//! Queue module: entry state, ordering and visibility policies, the store, and
//! the in-memory engine built on them.

mod memory;
mod ordering;
mod record;
mod state;
mod store;
mod visibility;

pub use memory::InMemoryQueue;
pub use ordering::RankKey;
pub use record::QueueEntry;
pub use state::EntryState;
pub use store::{QueueStore, Release, Selection};
pub use visibility::Visibility;
