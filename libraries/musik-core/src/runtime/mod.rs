//! Serialized message runtime
//!
//! A `MessageQueue` plus a `Dispatcher` thread form the single-consumer event
//! loop that owns a component's mutable state.

mod clock;
mod dispatcher;
mod queue;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{Dispatcher, MessageTarget};
pub use queue::MessageQueue;
