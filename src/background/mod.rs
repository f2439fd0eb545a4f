pub mod queue;

pub use queue::{BoundedQueue, TakeOrder};
