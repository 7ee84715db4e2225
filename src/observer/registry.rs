//! Process-wide hook for installing queue instrumentation.

use super::QueueObserverFactory;
use crate::error::{Error, Result};
use crate::worker::WorkerRegistry;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Builds the observer factory for one queue: `(context, num_priorities, workers)`.
pub type MakeObserverFactory =
    dyn Fn(&str, usize, &Arc<WorkerRegistry>) -> Option<Box<dyn QueueObserverFactory>>
        + Send
        + Sync;

/// Set-once slot for the application's observer factory constructor.
///
/// Applications wire instrumentation at startup with
/// [`register`](Self::register); pools call [`make`](Self::make) per queue.
/// An empty slot is the normal uninstrumented case.
pub struct ObserverFactoryRegistry {
    slot: OnceLock<Box<MakeObserverFactory>>,
}

static GLOBAL: ObserverFactoryRegistry = ObserverFactoryRegistry::new();

impl ObserverFactoryRegistry {
    /// Empty registry.
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Process-wide instance for pools that are not handed one explicitly.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Installs `make`. Only the first call wins; later calls return
    /// [`Error::AlreadyRegistered`] and leave the slot as it was.
    pub fn register<F>(&self, make: F) -> Result<()>
    where
        F: Fn(&str, usize, &Arc<WorkerRegistry>) -> Option<Box<dyn QueueObserverFactory>>
            + Send
            + Sync
            + 'static,
    {
        self.slot
            .set(Box::new(make))
            .map_err(|_| Error::AlreadyRegistered)?;
        tracing::debug!("queue observer factory registered");
        Ok(())
    }

    /// Whether a constructor has been installed.
    pub fn is_registered(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Observer factory for the queue named `context`, or `None` when nothing
    /// is registered or the registered constructor declines.
    pub fn make(
        &self,
        context: &str,
        num_priorities: usize,
        workers: &Arc<WorkerRegistry>,
    ) -> Option<Box<dyn QueueObserverFactory>> {
        let make = self.slot.get()?;
        make(context, num_priorities, workers)
    }
}

impl Default for ObserverFactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObserverFactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverFactoryRegistry")
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::QueueObserver;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct Counting {
        enqueued: AtomicU64,
    }

    impl QueueObserver for Counting {
        fn on_enqueued(&self) -> u64 {
            self.enqueued.fetch_add(1, Ordering::Relaxed)
        }

        fn on_dequeued(&self, _payload: u64) {}
    }

    struct CountingFactory {
        workers: usize,
    }

    impl QueueObserverFactory for CountingFactory {
        fn create(&self, priority: i8) -> Option<Box<dyn QueueObserver>> {
            if priority < 0 {
                return None;
            }
            Some(Box::new(Counting {
                enqueued: AtomicU64::new(self.workers as u64),
            }))
        }
    }

    #[test]
    fn test_make_without_registration() {
        let registry = ObserverFactoryRegistry::new();
        let workers = Arc::new(WorkerRegistry::new());
        assert!(!registry.is_registered());
        assert!(registry.make("ctx", 4, &workers).is_none());
    }

    #[test]
    fn test_make_delegates() {
        let registry = ObserverFactoryRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        registry
            .register(move |context, num_priorities, workers| {
                seen.fetch_add(1, Ordering::Relaxed);
                if context == "disabled" {
                    return None;
                }
                assert_eq!(num_priorities, 3);
                Some(Box::new(CountingFactory {
                    workers: workers.len(),
                }) as Box<dyn QueueObserverFactory>)
            })
            .unwrap();

        let workers = Arc::new(WorkerRegistry::new());
        workers.add(crate::worker::WorkerId(1));

        let factory = registry.make("cpu", 3, &workers).unwrap();
        let observer = factory.create(0).unwrap();
        assert_eq!(observer.on_enqueued(), 1);
        assert!(factory.create(-1).is_none());

        assert!(registry.make("disabled", 3, &workers).is_none());
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_register_only_once() {
        let registry = ObserverFactoryRegistry::new();
        registry.register(|_, _, _| None).unwrap();

        let second = registry.register(|_, _, _| {
            Some(Box::new(CountingFactory { workers: 0 }) as Box<dyn QueueObserverFactory>)
        });
        assert!(matches!(second, Err(Error::AlreadyRegistered)));

        let workers = Arc::new(WorkerRegistry::new());
        assert!(registry.make("ctx", 1, &workers).is_none());
    }

    #[test]
    fn test_global_is_shared() {
        let a = ObserverFactoryRegistry::global() as *const _;
        let b = ObserverFactoryRegistry::global() as *const _;
        assert_eq!(a, b);
    }
}
