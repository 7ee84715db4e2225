//! Small helpers shared by the queue internals.

pub mod backoff;

pub use backoff::Backoff;
