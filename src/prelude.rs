//! Common imports for pool code.

pub use crate::config::{QueueBehaviorIfFull, QueueConfig, QueueConfigBuilder, WakeOrder};
pub use crate::error::{Error, QueueFullError, Result};
pub use crate::observer::{ObserverFactoryRegistry, QueueObserver, QueueObserverFactory};
pub use crate::queue::{BlockingQueue, PriorityBlockingQueue, HI_PRI, LO_PRI, MID_PRI};
pub use crate::worker::{KeepAlive, NamedThreadFactory, ThreadFactory, WorkerId, WorkerRegistry};

#[cfg(feature = "telemetry")]
pub use crate::observer::{LatencyObserverFactory, LatencySnapshot};
