//! Pluggable queue instrumentation.
//!
//! A pool asks the [`ObserverFactoryRegistry`] for a [`QueueObserverFactory`]
//! once per queue it owns and, if it gets one, creates a [`QueueObserver`] per
//! priority. With nothing registered the pool runs unobserved.

pub mod registry;

#[cfg(feature = "telemetry")]
pub mod latency;

pub use registry::{MakeObserverFactory, ObserverFactoryRegistry};

#[cfg(feature = "telemetry")]
pub use latency::{LatencyObserverFactory, LatencySnapshot};

/// Watches items of one priority move through a queue.
pub trait QueueObserver: Send + Sync {
    /// Called when an item is enqueued. The returned payload travels with the
    /// item and comes back in [`on_dequeued`](Self::on_dequeued).
    fn on_enqueued(&self) -> u64;

    /// Called when the item leaves the queue, with its enqueue payload.
    fn on_dequeued(&self, payload: u64);
}

/// Hands out one observer per priority level of a queue.
pub trait QueueObserverFactory: Send + Sync {
    /// Observer for items of `priority`, or `None` to leave them unobserved.
    fn create(&self, priority: i8) -> Option<Box<dyn QueueObserver>>;
}
