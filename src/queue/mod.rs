//! Priority-partitioned blocking task queue.
//!
//! [`PriorityBlockingQueue`] is the producer/consumer hand-off a thread pool
//! sits on. It is assembled from one [`Bucket`] per priority level and a
//! single [`LifoSemaphore`] counting items across all levels.

pub mod bucket;
pub mod priority;
pub mod semaphore;

pub use bucket::Bucket;
pub use priority::{PriorityBlockingQueue, HI_PRI, LO_PRI, MID_PRI};
pub use semaphore::LifoSemaphore;

use crate::error::QueueFullError;
use std::time::Duration;

/// Queue surface a thread pool consumes.
pub trait BlockingQueue<T>: Send + Sync {
    /// Number of priority levels.
    fn num_priorities(&self) -> u8;

    /// Adds at [`MID_PRI`].
    fn add(&self, item: T) -> Result<(), QueueFullError<T>> {
        self.add_with_priority(item, MID_PRI)
    }

    /// Adds at `priority`, clamped into the queue's levels.
    fn add_with_priority(&self, item: T, priority: i8) -> Result<(), QueueFullError<T>>;

    /// Blocks until an item is available.
    fn take(&self) -> T;

    /// Waits at most `timeout` for an item.
    fn try_take_for(&self, timeout: Duration) -> Option<T>;

    /// Items currently queued.
    fn size(&self) -> usize;
}
