//! Counting semaphore with a selectable wake order.
//!
//! A post either hands its permit straight to one parked waiter or, when
//! nobody is parked, banks it in the count. Handing the permit over under the
//! state lock means a woken waiter never has to race a newcomer for it, and a
//! post is never lost.
//!
//! With [`WakeOrder::Lifo`] the most recently parked waiter is chosen. That
//! waiter is the one most likely to still have a warm cache and stack, at the
//! cost of fairness: under sustained light load the oldest waiters may sleep
//! until their timeout.

use crate::config::WakeOrder;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Waiter {
    granted: Mutex<bool>,
    cond: Condvar,
}

impl Waiter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            granted: Mutex::new(false),
            cond: Condvar::new(),
        })
    }

    fn grant(&self) {
        *self.granted.lock() = true;
        self.cond.notify_one();
    }
}

struct State {
    permits: usize,
    waiters: VecDeque<Arc<Waiter>>,
}

/// Counting semaphore that hands each permit straight to one parked waiter.
///
/// With [`WakeOrder::Lifo`] the most recently parked waiter is served first.
pub struct LifoSemaphore {
    state: Mutex<State>,
    order: WakeOrder,
}

impl LifoSemaphore {
    /// Empty semaphore waking LIFO.
    pub fn new() -> Self {
        Self::with_order(WakeOrder::Lifo)
    }

    /// Empty semaphore waking in `order`.
    pub fn with_order(order: WakeOrder) -> Self {
        Self {
            state: Mutex::new(State {
                permits: 0,
                waiters: VecDeque::new(),
            }),
            order,
        }
    }

    /// Wake order chosen at construction.
    pub fn order(&self) -> WakeOrder {
        self.order
    }

    /// Releases one permit, waking a parked waiter if there is one.
    pub fn post(&self) {
        let waiter = {
            let mut state = self.state.lock();
            let next = match self.order {
                WakeOrder::Lifo => state.waiters.pop_back(),
                WakeOrder::Fifo => state.waiters.pop_front(),
            };
            if next.is_none() {
                state.permits += 1;
            }
            next
        };

        if let Some(waiter) = waiter {
            waiter.grant();
        }
    }

    /// Takes a permit without blocking.
    pub fn try_wait(&self) -> bool {
        let mut state = self.state.lock();
        if state.permits > 0 {
            state.permits -= 1;
            true
        } else {
            false
        }
    }

    /// Blocks until a permit is available and takes it.
    pub fn wait(&self) {
        let waiter = match self.enqueue_waiter() {
            Some(waiter) => waiter,
            None => return,
        };

        let mut granted = waiter.granted.lock();
        while !*granted {
            waiter.cond.wait(&mut granted);
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    ///
    /// Returns `true` if a permit was taken.
    pub fn try_wait_for(&self, timeout: Duration) -> bool {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.try_wait_until(deadline),
            None => {
                self.wait();
                true
            }
        }
    }

    /// Like [`wait`](Self::wait) but gives up at `deadline`.
    pub fn try_wait_until(&self, deadline: Instant) -> bool {
        let waiter = match self.enqueue_waiter() {
            Some(waiter) => waiter,
            None => return true,
        };

        {
            let mut granted = waiter.granted.lock();
            while !*granted {
                if waiter.cond.wait_until(&mut granted, deadline).timed_out() {
                    break;
                }
            }
            if *granted {
                return true;
            }
        }

        // Timed out. A post that already popped this waiter has committed its
        // permit here even if the grant has not landed yet.
        let mut state = self.state.lock();
        match state.waiters.iter().position(|w| Arc::ptr_eq(w, &waiter)) {
            Some(pos) => {
                state.waiters.remove(pos);
                false
            }
            None => true,
        }
    }

    /// Banked permits not yet claimed.
    pub fn value(&self) -> usize {
        self.state.lock().permits
    }

    /// Threads currently parked.
    pub fn waiters(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Takes a banked permit, or registers a new waiter when there is none.
    fn enqueue_waiter(&self) -> Option<Arc<Waiter>> {
        let mut state = self.state.lock();
        if state.permits > 0 {
            state.permits -= 1;
            return None;
        }
        let waiter = Waiter::new();
        state.waiters.push_back(Arc::clone(&waiter));
        Some(waiter)
    }
}

impl Default for LifoSemaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifoSemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LifoSemaphore")
            .field("order", &self.order)
            .field("permits", &state.permits)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn wait_for_waiters(sem: &LifoSemaphore, n: usize) {
        while sem.waiters() < n {
            thread::yield_now();
        }
    }

    #[test]
    fn test_post_then_wait() {
        let sem = LifoSemaphore::new();
        sem.post();
        sem.post();
        assert_eq!(sem.value(), 2);

        sem.wait();
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_timed_wait_expires() {
        let sem = LifoSemaphore::new();
        let start = Instant::now();
        assert!(!sem.try_wait_for(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(sem.waiters(), 0);
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_post_wakes_blocked_waiter() {
        let sem = Arc::new(LifoSemaphore::new());
        let sem2 = sem.clone();
        let handle = thread::spawn(move || sem2.wait());

        wait_for_waiters(&sem, 1);
        sem.post();
        handle.join().unwrap();

        assert_eq!(sem.value(), 0);
        assert_eq!(sem.waiters(), 0);
    }

    fn wake_sequence(order: WakeOrder) -> Vec<usize> {
        let sem = Arc::new(LifoSemaphore::with_order(order));
        let woken = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        for id in 0..3 {
            let sem2 = sem.clone();
            let woken = woken.clone();
            handles.push(thread::spawn(move || {
                sem2.wait();
                woken.lock().push(id);
            }));
            wait_for_waiters(&sem, id + 1);
        }

        for expected in 1..=3 {
            sem.post();
            while woken.lock().len() < expected {
                thread::yield_now();
            }
        }

        for handle in handles {
            handle.join().unwrap();
        }
        let order = woken.lock().clone();
        order
    }

    #[test]
    fn test_lifo_wake_order() {
        assert_eq!(wake_sequence(WakeOrder::Lifo), vec![2, 1, 0]);
    }

    #[test]
    fn test_fifo_wake_order() {
        assert_eq!(wake_sequence(WakeOrder::Fifo), vec![0, 1, 2]);
    }

    #[test]
    fn test_permits_are_conserved() {
        let sem = Arc::new(LifoSemaphore::new());
        let taken = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let sem = sem.clone();
            let taken = taken.clone();
            handles.push(thread::spawn(move || {
                while sem.try_wait_for(Duration::from_millis(50)) {
                    taken.fetch_add(1, Ordering::Relaxed);
                }
            }));
        }

        for _ in 0..1000 {
            sem.post();
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(taken.load(Ordering::Relaxed) + sem.value(), 1000);
    }
}
