//! Multi-level queue with strict priority between levels.

use super::bucket::Bucket;
use super::semaphore::LifoSemaphore;
use super::BlockingQueue;
use crate::config::{QueueBehaviorIfFull, QueueConfig, WakeOrder, MAX_PRIORITIES};
use crate::error::{QueueFullError, Result};
use crate::util::Backoff;
use std::fmt;
use std::thread;
use std::time::Duration;

/// Lowest priority; saturates to level 0.
pub const LO_PRI: i8 = i8::MIN;
/// Default priority; maps to the middle level.
pub const MID_PRI: i8 = 0;
/// Highest priority; saturates to the top level.
pub const HI_PRI: i8 = i8::MAX;

/// Multi-level bounded blocking queue with strict priority dequeue.
///
/// Items are routed to one of `N` levels by a signed priority relative to the
/// middle level. A pending item on a higher level is always dequeued before
/// any pending item on a lower level, and items on one level come out in the
/// order they went in.
///
/// There is no fairness across levels: a steady stream of high priority work
/// starves lower levels for as long as it lasts. Callers needing bounded
/// latency for low priority work must cap the high priority rate themselves.
///
/// One semaphore counts available items across all levels. Every successful
/// enqueue posts it once; every dequeue takes one permit before scanning, so
/// with nothing in flight the permit count equals [`size`](Self::size).
/// Parked consumers are woken most-recent-first unless the queue was built
/// with [`WakeOrder::Fifo`].
///
/// With two levels, [`MID_PRI`] and [`HI_PRI`] land on the same level.
pub struct PriorityBlockingQueue<T> {
    // Index 0 is the lowest priority.
    levels: Vec<Bucket<T>>,
    available: LifoSemaphore,
    behavior: QueueBehaviorIfFull,
}

impl<T> PriorityBlockingQueue<T> {
    /// Builds `num_priorities` levels of `capacity` slots each.
    ///
    /// # Panics
    ///
    /// Panics if `num_priorities` or `capacity` is zero.
    pub fn new(num_priorities: u8, capacity: usize, behavior: QueueBehaviorIfFull) -> Self {
        assert!(num_priorities > 0, "number of priorities should be positive");
        let capacities = vec![capacity; num_priorities as usize];
        Self::from_parts(&capacities, behavior, WakeOrder::default())
    }

    /// Builds one level per entry of `capacities`, lowest priority first.
    ///
    /// # Panics
    ///
    /// Panics if `capacities` is empty, longer than 255, or holds a zero.
    pub fn with_capacities(capacities: &[usize], behavior: QueueBehaviorIfFull) -> Self {
        Self::from_parts(capacities, behavior, WakeOrder::default())
    }

    /// Builds a queue from validated settings.
    pub fn with_config(config: &QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(
            &config.capacities,
            config.behavior,
            config.wake_order,
        ))
    }

    fn from_parts(capacities: &[usize], behavior: QueueBehaviorIfFull, order: WakeOrder) -> Self {
        assert!(
            !capacities.is_empty(),
            "number of priorities should be positive"
        );
        assert!(
            capacities.len() <= MAX_PRIORITIES,
            "at most {} priorities supported",
            MAX_PRIORITIES
        );

        let levels: Vec<_> = capacities.iter().map(|&cap| Bucket::new(cap)).collect();
        tracing::debug!(
            levels = levels.len(),
            ?behavior,
            ?order,
            "priority queue created"
        );

        Self {
            levels,
            available: LifoSemaphore::with_order(order),
            behavior,
        }
    }

    /// Number of levels fixed at construction.
    pub fn num_priorities(&self) -> u8 {
        self.levels.len() as u8
    }

    /// Overflow policy fixed at construction.
    pub fn behavior(&self) -> QueueBehaviorIfFull {
        self.behavior
    }

    /// Level an item of `priority` is routed to; out-of-range values saturate.
    pub fn level_for(&self, priority: i8) -> usize {
        let top = self.levels.len() as i32 - 1;
        let mid = self.levels.len() as i32 / 2;
        (mid + priority as i32).clamp(0, top) as usize
    }

    /// Enqueues at [`MID_PRI`].
    pub fn enqueue(&self, item: T) -> std::result::Result<(), QueueFullError<T>> {
        self.enqueue_with_priority(item, MID_PRI)
    }

    /// Enqueues at `priority`.
    ///
    /// A rejecting queue returns the item inside [`QueueFullError`] when the
    /// target level is full and leaves everything untouched. A blocking queue
    /// parks the caller until the level has room and never returns an error.
    pub fn enqueue_with_priority(
        &self,
        item: T,
        priority: i8,
    ) -> std::result::Result<(), QueueFullError<T>> {
        let level = self.level_for(priority);
        let bucket = &self.levels[level];

        match self.behavior {
            QueueBehaviorIfFull::Reject => {
                if let Err(item) = bucket.try_push(item) {
                    tracing::debug!(level, priority, "priority level full, rejecting item");
                    return Err(QueueFullError { item, level });
                }
            }
            QueueBehaviorIfFull::Block => bucket.push_blocking(item),
        }

        self.available.post();
        Ok(())
    }

    /// Removes the highest priority item, blocking while the queue is empty.
    pub fn dequeue(&self) -> T {
        self.available.wait();
        self.take_reserved()
    }

    /// Like [`dequeue`](Self::dequeue) but returns `None` once `timeout`
    /// passes with nothing to take.
    pub fn try_dequeue(&self, timeout: Duration) -> Option<T> {
        if !self.available.try_wait_for(timeout) {
            tracing::trace!(?timeout, "dequeue timed out");
            return None;
        }
        Some(self.take_reserved())
    }

    /// Removes the highest priority item if one is available right now.
    ///
    /// Never waits. It claims a banked permit before scanning, so an item
    /// whose producer has pushed it but not yet posted is not visible here
    /// and the call returns `None` for it.
    pub fn try_dequeue_now(&self) -> Option<T> {
        if !self.available.try_wait() {
            return None;
        }
        Some(self.take_reserved())
    }

    /// Exact item count across all levels.
    pub fn size(&self) -> usize {
        self.levels.iter().map(Bucket::len).sum()
    }

    /// Cheap relaxed count for diagnostics; may be off while operations are
    /// in flight but never exceeds the total capacity.
    pub fn size_approx(&self) -> usize {
        self.levels
            .iter()
            .map(Bucket::len_approx)
            .fold(0, usize::saturating_add)
    }

    /// True when no level holds an item.
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Bucket::is_empty)
    }

    /// Items pending on one level.
    ///
    /// # Panics
    ///
    /// Panics if `level >= num_priorities()`.
    pub fn level_len(&self, level: usize) -> usize {
        self.levels[level].len()
    }

    /// Slots on one level.
    ///
    /// # Panics
    ///
    /// Panics if `level >= num_priorities()`.
    pub fn capacity(&self, level: usize) -> usize {
        self.levels[level].capacity()
    }

    // Caller holds a permit, so at least one item is in some bucket. A scan can
    // still miss it when a racing consumer empties the level below the scan
    // position after a producer filled one above; rescan until it lands.
    fn take_reserved(&self) -> T {
        let mut backoff = Backoff::new();
        loop {
            if let Some(item) = self.scan() {
                return item;
            }
            if backoff.is_completed() {
                thread::yield_now();
            } else {
                backoff.snooze();
            }
        }
    }

    fn scan(&self) -> Option<T> {
        self.levels.iter().rev().find_map(Bucket::try_pop)
    }
}

impl<T: Send> BlockingQueue<T> for PriorityBlockingQueue<T> {
    fn num_priorities(&self) -> u8 {
        PriorityBlockingQueue::num_priorities(self)
    }

    fn add_with_priority(
        &self,
        item: T,
        priority: i8,
    ) -> std::result::Result<(), QueueFullError<T>> {
        self.enqueue_with_priority(item, priority)
    }

    fn take(&self) -> T {
        self.dequeue()
    }

    fn try_take_for(&self, timeout: Duration) -> Option<T> {
        self.try_dequeue(timeout)
    }

    fn size(&self) -> usize {
        PriorityBlockingQueue::size(self)
    }
}

impl<T> fmt::Debug for PriorityBlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityBlockingQueue")
            .field("levels", &self.levels)
            .field("behavior", &self.behavior)
            .field("available", &self.available)
            .finish()
    }
}
