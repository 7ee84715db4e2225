//! Thread creation for pool workers.

use super::registry::WorkerRegistry;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Body handed to [`ThreadFactory::new_thread`].
pub type ThreadFn = Box<dyn FnOnce() + Send + 'static>;

/// Creates the OS threads a pool runs its workers on.
pub trait ThreadFactory: Send + Sync {
    /// Starts an OS thread running `f`.
    fn new_thread(&self, f: ThreadFn) -> io::Result<JoinHandle<()>>;

    /// Prefix given to the names of threads this factory creates.
    fn name_prefix(&self) -> &str;
}

/// Names threads `<prefix><n>` with `n` counting up from zero.
///
/// With a registry attached, each thread registers its [`WorkerId`] before
/// running its body and deregisters on the way out, blocking its exit until
/// outstanding snapshots are released.
///
/// [`WorkerId`]: super::WorkerId
pub struct NamedThreadFactory {
    prefix: String,
    suffix: AtomicU64,
    stack_size: Option<usize>,
    registry: Option<Arc<WorkerRegistry>>,
}

impl NamedThreadFactory {
    /// Factory naming threads `<prefix>0`, `<prefix>1`, and so on.
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: AtomicU64::new(0),
            stack_size: None,
            registry: None,
        }
    }

    /// Stack size in bytes for every spawned thread.
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Registers each spawned thread with `registry` for its lifetime.
    pub fn with_registry(mut self, registry: Arc<WorkerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Changes the prefix for threads created from now on. The suffix counter
    /// carries on.
    pub fn set_name_prefix<S: Into<String>>(&mut self, prefix: S) {
        self.prefix = prefix.into();
    }

    /// Typed shorthand for [`ThreadFactory::new_thread`].
    pub fn spawn<F>(&self, f: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        self.new_thread(Box::new(f))
    }
}

impl ThreadFactory for NamedThreadFactory {
    fn new_thread(&self, f: ThreadFn) -> io::Result<JoinHandle<()>> {
        let name = format!("{}{}", self.prefix, self.suffix.fetch_add(1, Ordering::Relaxed));
        let mut builder = thread::Builder::new().name(name);
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        let registry = self.registry.clone();
        builder.spawn(move || {
            let _registration = registry.as_deref().map(WorkerRegistry::register_current);
            f();
        })
    }

    fn name_prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Debug for NamedThreadFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedThreadFactory")
            .field("prefix", &self.prefix)
            .field("next_suffix", &self.suffix.load(Ordering::Relaxed))
            .field("stack_size", &self.stack_size)
            .field("registered", &self.registry.is_some())
            .finish()
    }
}
