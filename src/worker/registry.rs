//! Live worker ids with a teardown quiescence gate.
//!
//! Two independent locks live here. `ids` guards membership. `exit_gate` holds
//! no data: snapshots take it shared for as long as their [`KeepAlive`] lives,
//! and [`WorkerRegistry::remove`] takes it exclusively before returning. A
//! worker thread that calls `remove` on its way out therefore cannot finish
//! exiting while a monitor may still be about to signal or inspect it by id.

use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::HashSet;
use std::fmt;

/// Opaque identifier of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub u64);

impl WorkerId {
    /// Id of the calling thread: the kernel thread id on Linux, a
    /// process-unique per-thread number elsewhere.
    #[cfg(target_os = "linux")]
    pub fn current() -> Self {
        // SAFETY: gettid takes no arguments and cannot fail.
        let tid = unsafe { libc::syscall(libc::SYS_gettid) };
        WorkerId(tid as u64)
    }

    /// Id of the calling thread, unique within the process.
    #[cfg(not(target_os = "linux"))]
    pub fn current() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};

        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        thread_local! {
            static ID: u64 = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        }
        WorkerId(ID.with(|id| *id))
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared hold on the exit gate taken by [`WorkerRegistry::snapshot`].
///
/// While it lives, no `remove` on the same registry can return. Keep it
/// short-lived and never take a second snapshot on the same thread while
/// holding one: the gate prefers writers, so a pending `remove` would block
/// the nested snapshot forever.
#[must_use = "ids from a snapshot are only pinned while the KeepAlive is held"]
pub struct KeepAlive<'a> {
    _hold: RwLockReadGuard<'a, ()>,
}

impl fmt::Debug for KeepAlive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeepAlive")
    }
}

/// Set of live worker ids plus the exit gate snapshots hold.
#[derive(Default)]
pub struct WorkerRegistry {
    ids: RwLock<HashSet<WorkerId>>,
    exit_gate: RwLock<()>,
}

impl WorkerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id`. Adding an id twice leaves a single entry.
    pub fn add(&self, id: WorkerId) {
        if !self.ids.write().insert(id) {
            tracing::warn!(%id, "worker registered twice");
        }
    }

    /// Deregisters `id`, then blocks until every outstanding [`KeepAlive`]
    /// has been dropped.
    ///
    /// The latency is unbounded if a snapshot holder never lets go.
    pub fn remove(&self, id: WorkerId) {
        if !self.ids.write().remove(&id) {
            tracing::warn!(%id, "removing worker that was not registered");
        }

        tracing::trace!(%id, "waiting for snapshot holders before worker exit");
        drop(self.exit_gate.write());
    }

    /// Returns the live ids together with a guard pinning them.
    ///
    /// Every id in the list belongs to a thread that has not returned from
    /// `remove` and will not until the guard is dropped.
    pub fn snapshot(&self) -> (KeepAlive<'_>, Vec<WorkerId>) {
        let keep_alive = KeepAlive {
            _hold: self.exit_gate.read(),
        };
        let mut ids: Vec<_> = self.ids.read().iter().copied().collect();
        ids.sort_unstable();
        (keep_alive, ids)
    }

    /// Whether `id` is registered right now.
    pub fn contains(&self, id: WorkerId) -> bool {
        self.ids.read().contains(&id)
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    /// True with no workers registered.
    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }

    /// Registers the calling thread until the returned guard drops.
    pub fn register_current(&self) -> Registration<'_> {
        let id = WorkerId::current();
        self.add(id);
        Registration { registry: self, id }
    }
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("workers", &self.len())
            .finish()
    }
}

/// Membership of one thread; removes it (blocking) on drop.
#[must_use = "the worker is deregistered as soon as the Registration drops"]
pub struct Registration<'a> {
    registry: &'a WorkerRegistry,
    id: WorkerId,
}

impl Registration<'_> {
    /// Id this registration holds.
    pub fn id(&self) -> WorkerId {
        self.id
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

impl fmt::Debug for Registration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}
