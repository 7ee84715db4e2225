//! Worker thread bookkeeping.
//!
//! Pools register their threads in a [`WorkerRegistry`] on start and remove
//! them on exit; monitoring code takes snapshots of the live ids.

pub mod registry;
pub mod thread_factory;

pub use registry::{KeepAlive, Registration, WorkerId, WorkerRegistry};
pub use thread_factory::{NamedThreadFactory, ThreadFactory, ThreadFn};
