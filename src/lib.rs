//! STRATA - the concurrent substrate under a thread pool
//!
//! Three pieces a pool is assembled on top of:
//!
//! - [`PriorityBlockingQueue`]: bounded multi-level work queue with strict
//!   priority dequeue and Reject or Block backpressure.
//! - [`WorkerRegistry`]: live worker ids for profilers and signal handlers,
//!   with snapshots that hold off worker teardown until released.
//! - [`ObserverFactoryRegistry`]: optional, set-once queue instrumentation.
//!
//! # Quick Start
//!
//! ```
//! use strata::prelude::*;
//!
//! let queue = PriorityBlockingQueue::with_capacities(&[2, 2, 2], QueueBehaviorIfFull::Reject);
//! queue.enqueue_with_priority("A", 1).unwrap();
//! queue.enqueue_with_priority("B", 0).unwrap();
//! queue.enqueue_with_priority("C", -1).unwrap();
//! queue.enqueue_with_priority("D", 1).unwrap();
//!
//! let order: Vec<_> = (0..4).map(|_| queue.dequeue()).collect();
//! assert_eq!(order, ["A", "D", "B", "C"]);
//!
//! let workers = WorkerRegistry::new();
//! workers.add(WorkerId(7));
//! let (keep_alive, ids) = workers.snapshot();
//! assert_eq!(ids, [WorkerId(7)]);
//! drop(keep_alive);
//! workers.remove(WorkerId(7));
//! ```
//!
//! # Features
//!
//! - **telemetry** (default): [`observer::LatencyObserverFactory`], an
//!   hdrhistogram-backed queue wait-time observer

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod observer;
pub mod prelude;
pub mod queue;
pub mod util;
pub mod worker;

pub use config::{QueueBehaviorIfFull, QueueConfig, QueueConfigBuilder, WakeOrder};
pub use error::{Error, QueueFullError, Result};
pub use observer::{ObserverFactoryRegistry, QueueObserver, QueueObserverFactory};
pub use queue::{BlockingQueue, PriorityBlockingQueue};
pub use worker::{WorkerId, WorkerRegistry};
