//! Enqueue-to-dequeue latency per priority.

use super::{QueueObserver, QueueObserverFactory};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One hour in nanoseconds; longer waits saturate.
const MAX_TRACKED_NS: u64 = 3_600_000_000_000;
const SIGNIFICANT_FIGURES: u8 = 3;

/// Point-in-time view of one priority's recorder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencySnapshot {
    /// Items observed entering the queue.
    pub enqueued: u64,
    /// Items observed leaving the queue; each contributes one wait sample.
    pub dequeued: u64,
    /// Mean wait in nanoseconds.
    pub mean_ns: u64,
    /// Median wait in nanoseconds.
    pub p50_ns: u64,
    /// 99th percentile wait in nanoseconds.
    pub p99_ns: u64,
    /// Longest wait in nanoseconds.
    pub max_ns: u64,
}

struct Recorder {
    epoch: Instant,
    enqueued: AtomicU64,
    histogram: Mutex<Histogram<u64>>,
}

impl Recorder {
    fn nanos_since_epoch(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn snapshot(&self) -> LatencySnapshot {
        let histogram = self.histogram.lock();
        LatencySnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: histogram.len(),
            mean_ns: if histogram.len() > 0 {
                histogram.mean() as u64
            } else {
                0
            },
            p50_ns: histogram.value_at_quantile(0.50),
            p99_ns: histogram.value_at_quantile(0.99),
            max_ns: histogram.max(),
        }
    }
}

struct LatencyObserver {
    recorder: Arc<Recorder>,
}

impl QueueObserver for LatencyObserver {
    fn on_enqueued(&self) -> u64 {
        self.recorder.enqueued.fetch_add(1, Ordering::Relaxed);
        self.recorder.nanos_since_epoch()
    }

    fn on_dequeued(&self, payload: u64) {
        let waited = self.recorder.nanos_since_epoch().saturating_sub(payload);
        self.recorder.histogram.lock().saturating_record(waited);
    }
}

/// Observer factory recording how long items wait in the queue.
///
/// Clones share their recorders, so an application can keep one handle for
/// reading while the registry hands another to the pool.
#[derive(Clone, Default)]
pub struct LatencyObserverFactory {
    recorders: Arc<Mutex<BTreeMap<i8, Arc<Recorder>>>>,
}

impl LatencyObserverFactory {
    /// Factory with no recorders yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latency so far for `priority`, if an observer was ever created for it.
    pub fn snapshot(&self, priority: i8) -> Option<LatencySnapshot> {
        let recorder = self.recorders.lock().get(&priority).cloned()?;
        Some(recorder.snapshot())
    }

    /// Priorities that have a recorder, ascending.
    pub fn priorities(&self) -> Vec<i8> {
        self.recorders.lock().keys().copied().collect()
    }

    /// Longest wait recorded at any priority.
    pub fn max_wait(&self) -> Duration {
        let recorders: Vec<_> = self.recorders.lock().values().cloned().collect();
        let max_ns = recorders
            .iter()
            .map(|r| r.histogram.lock().max())
            .max()
            .unwrap_or(0);
        Duration::from_nanos(max_ns)
    }
}

impl fmt::Debug for LatencyObserverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyObserverFactory")
            .field("priorities", &self.priorities())
            .finish()
    }
}

impl QueueObserverFactory for LatencyObserverFactory {
    fn create(&self, priority: i8) -> Option<Box<dyn QueueObserver>> {
        let mut recorders = self.recorders.lock();
        let recorder = match recorders.get(&priority) {
            Some(recorder) => Arc::clone(recorder),
            None => {
                let histogram = match Histogram::new_with_max(MAX_TRACKED_NS, SIGNIFICANT_FIGURES) {
                    Ok(histogram) => histogram,
                    Err(err) => {
                        tracing::warn!(priority, %err, "latency histogram unavailable");
                        return None;
                    }
                };
                let recorder = Arc::new(Recorder {
                    epoch: Instant::now(),
                    enqueued: AtomicU64::new(0),
                    histogram: Mutex::new(histogram),
                });
                recorders.insert(priority, Arc::clone(&recorder));
                recorder
            }
        };
        Some(Box::new(LatencyObserver { recorder }))
    }
}
