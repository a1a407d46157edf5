//! Ports: the seams between the engine and the outside world.

pub mod backend;
pub mod clock;

pub use self::backend::{QueueBackend, Reservation};
pub use self::clock::{Clock, FixedClock, SystemClock};
