use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata::prelude::*;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run { job: Job, priority: i8, token: u64 },
    Stop,
}

type Observers = Arc<Vec<Option<Box<dyn QueueObserver>>>>;

fn observer_for(observers: &Observers, priority: i8) -> Option<&dyn QueueObserver> {
    observers[(priority + 1) as usize].as_deref()
}

// Minimal pool wired the way an executor would wire the substrate.
struct Pool {
    queue: Arc<PriorityBlockingQueue<Message>>,
    workers: Arc<WorkerRegistry>,
    observers: Observers,
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl Pool {
    fn new(threads: usize, observers: &ObserverFactoryRegistry) -> Self {
        let queue = Arc::new(PriorityBlockingQueue::new(3, 256, QueueBehaviorIfFull::Block));
        let workers = Arc::new(WorkerRegistry::new());
        let factory = observers.make("test-pool", 3, &workers);
        let observers: Observers = Arc::new(
            [-1i8, 0, 1]
                .iter()
                .map(|&pri| factory.as_ref().and_then(|f| f.create(pri)))
                .collect(),
        );

        let threads_factory = NamedThreadFactory::new("test-pool-").with_registry(workers.clone());
        let handles = (0..threads)
            .map(|_| {
                let queue = queue.clone();
                let observers = observers.clone();
                threads_factory
                    .spawn(move || loop {
                        match queue.dequeue() {
                            Message::Run { job, priority, token } => {
                                if let Some(observer) = observer_for(&observers, priority) {
                                    observer.on_dequeued(token);
                                }
                                job()
                            }
                            Message::Stop => break,
                        }
                    })
                    .unwrap()
            })
            .collect();

        Self {
            queue,
            workers,
            observers,
            handles,
        }
    }

    fn submit(&self, priority: i8, job: Job) {
        let token = observer_for(&self.observers, priority).map_or(0, |o| o.on_enqueued());
        let message = Message::Run { job, priority, token };
        self.queue.enqueue_with_priority(message, priority).unwrap();
    }

    fn join(self) {
        for _ in &self.handles {
            self.queue.enqueue_with_priority(Message::Stop, LO_PRI).unwrap();
        }
        for handle in self.handles {
            handle.join().unwrap();
        }
    }
}

#[test]
fn test_pool_runs_every_job() {
    let observers = ObserverFactoryRegistry::new();
    let pool = Pool::new(4, &observers);
    assert!(pool.observers.iter().all(Option::is_none));

    let counter = Arc::new(AtomicUsize::new(0));
    for i in 0..1000 {
        let counter = counter.clone();
        pool.submit((i % 3) as i8 - 1, Box::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
    }

    let workers = pool.workers.clone();
    pool.join();

    assert_eq!(counter.load(Ordering::Relaxed), 1000);
    assert!(workers.is_empty());
}

#[test]
fn test_snapshot_sees_live_workers() {
    let observers = ObserverFactoryRegistry::new();
    let pool = Pool::new(3, &observers);

    // Workers register themselves as they start.
    while pool.workers.len() < 3 {
        std::thread::yield_now();
    }
    {
        let (_keep_alive, ids) = pool.workers.snapshot();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&WorkerId::current()));
    }

    let workers = pool.workers.clone();
    pool.join();
    let (_keep_alive, ids) = workers.snapshot();
    assert!(ids.is_empty());
}

#[test]
fn test_high_priority_overtakes_backlog() {
    let observers = ObserverFactoryRegistry::new();
    let pool = Pool::new(1, &observers);
    let order = Arc::new(Mutex::new(Vec::new()));

    // Park the only worker so a backlog builds behind it.
    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
    pool.submit(MID_PRI, Box::new(move || gate_rx.recv().unwrap()));
    while pool.queue.size() > 0 {
        std::thread::yield_now();
    }

    for (label, pri) in [("low", -1i8), ("mid", 0), ("high", 1)] {
        let order = order.clone();
        pool.submit(pri, Box::new(move || order.lock().push(label)));
    }
    gate_tx.send(()).unwrap();
    pool.join();

    assert_eq!(*order.lock(), vec!["high", "mid", "low"]);
}

#[cfg(feature = "telemetry")]
#[test]
fn test_latency_observer_wired_through_registry() {
    let stats = LatencyObserverFactory::new();
    let observers = ObserverFactoryRegistry::new();
    let handle = stats.clone();
    observers
        .register(move |context, num_priorities, _workers| {
            assert_eq!(context, "test-pool");
            assert_eq!(num_priorities, 3);
            Some(Box::new(handle.clone()) as Box<dyn QueueObserverFactory>)
        })
        .unwrap();

    let pool = Pool::new(2, &observers);
    let mut done = Vec::new();
    for _ in 0..20 {
        let (tx, rx) = crossbeam_channel::bounded(1);
        pool.submit(1, Box::new(move || tx.send(()).unwrap()));
        done.push(rx);
    }
    for rx in done {
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    pool.join();

    let snap = stats.snapshot(1).unwrap();
    assert_eq!(snap.enqueued, 20);
    assert_eq!(snap.dequeued, 20);
    assert!(snap.max_ns >= snap.p50_ns);
    assert_eq!(stats.priorities(), vec![-1, 0, 1]);
}

#[test]
fn test_reject_queue_backpressure() {
    let queue = PriorityBlockingQueue::new(3, 2, QueueBehaviorIfFull::Reject);
    queue.enqueue_with_priority(1, HI_PRI).unwrap();
    queue.enqueue_with_priority(2, HI_PRI).unwrap();

    let err = queue.enqueue_with_priority(3, HI_PRI).unwrap_err();
    let converted: Error = err.into();
    assert!(matches!(converted, Error::QueueFull(_)));
    assert_eq!(queue.size(), 2);

    // Other levels are unaffected by a full one.
    queue.enqueue_with_priority(4, LO_PRI).unwrap();
    assert_eq!(queue.try_dequeue(Duration::from_millis(10)), Some(1));
}
