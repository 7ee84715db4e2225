//! Bounded spinning before a thread commits to parking.

use std::hint::spin_loop;
use std::thread;

/// Exponential spin, then yield, then give up so the caller can park.
///
/// Owned by the waiting thread; not shared.
#[derive(Debug, Default)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;

    /// Fresh backoff at the first spin step.
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Starts over from the first spin step.
    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Performs one backoff step. Does nothing once completed.
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1u32 << self.step) {
                spin_loop();
            }
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
        } else {
            return;
        }
        self.step += 1;
    }

    /// True once spinning and yielding are exhausted and the caller should block.
    pub fn is_completed(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }
}
