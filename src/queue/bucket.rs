//! Fixed-capacity FIFO backing one priority level.

use crate::util::Backoff;
use crossbeam_queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

/// Bounded MPMC FIFO with an optional blocking push.
///
/// Non-blocking operations go straight to the lock-free ring. Producers that
/// find it full spin briefly, then park on `space` until a pop frees a slot.
pub struct Bucket<T> {
    ring: ArrayQueue<T>,
    len: AtomicUsize,
    parked: AtomicUsize,
    lock: Mutex<()>,
    space: Condvar,
}

impl<T> Bucket<T> {
    /// Creates an empty bucket with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "bucket capacity must be > 0");
        Self {
            ring: ArrayQueue::new(capacity),
            len: AtomicUsize::new(0),
            parked: AtomicUsize::new(0),
            lock: Mutex::new(()),
            space: Condvar::new(),
        }
    }

    /// Pushes without blocking; a full bucket hands the item back.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        // Count before publishing so a racing pop can never take the counter
        // below zero.
        self.len.fetch_add(1, Ordering::Relaxed);
        if let Err(item) = self.ring.push(item) {
            self.len.fetch_sub(1, Ordering::Relaxed);
            return Err(item);
        }
        Ok(())
    }

    /// Pushes, parking the caller while the bucket is full.
    pub fn push_blocking(&self, item: T) {
        let mut item = item;
        let mut backoff = Backoff::new();

        loop {
            match self.try_push(item) {
                Ok(()) => return,
                Err(back) => item = back,
            }

            if !backoff.is_completed() {
                backoff.snooze();
                continue;
            }

            let mut guard = self.lock.lock();
            self.parked.fetch_add(1, Ordering::SeqCst);

            // Re-check while registered so a pop in between cannot be missed.
            match self.try_push(item) {
                Ok(()) => {
                    self.parked.fetch_sub(1, Ordering::SeqCst);
                    return;
                }
                Err(back) => item = back,
            }

            tracing::trace!(capacity = self.capacity(), "bucket full, producer parking");
            self.space.wait(&mut guard);
            self.parked.fetch_sub(1, Ordering::SeqCst);
            backoff.reset();
        }
    }

    /// Pops the oldest item, waking one parked producer if any are waiting.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.ring.pop()?;
        self.len.fetch_sub(1, Ordering::Relaxed);

        fence(Ordering::SeqCst);
        if self.parked.load(Ordering::SeqCst) > 0 {
            let _guard = self.lock.lock();
            self.space.notify_one();
        }
        Some(item)
    }

    /// Items currently in the ring.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Relaxed count, may lead in-flight pushes; never above capacity.
    pub fn len_approx(&self) -> usize {
        self.len.load(Ordering::Relaxed).min(self.capacity())
    }

    /// True when no item is in the ring.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// True when every slot is taken.
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Number of slots fixed at construction.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T> fmt::Debug for Bucket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
