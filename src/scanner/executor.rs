//! Bounded probe executor.
//!
//! The one concurrency primitive behind sweeps, port scans and discovery.
//! Every probe body runs behind a counting semaphore, so no matter how many
//! tasks are spawned, at most `limit` probes touch the network at once.
//!
//! Two dispatch strategies share the same gate:
//!
//! * [`ExecutionStrategy::Batched`] spawns one task per item for a fixed-size
//!   slice of the work list and drains it before starting the next slice.
//! * [`ExecutionStrategy::WorkerPool`] runs a fixed number of workers pulling
//!   from a bounded job queue.
//!
//! A probe that fails internally yields `None` and is simply not collected.
//! A panicking probe is logged and counted as processed under either
//! strategy; its siblings keep running.

use crate::scanner::rate_limiter::RateLimiter;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How often the worker pool reports progress.
const POOL_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Dispatch strategy for a [`BoundedExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Sequential batches of `batch_size` items.
    Batched { batch_size: usize },
    /// `workers` long-lived tasks fed through a queue of `queue_depth`.
    WorkerPool { workers: usize, queue_depth: usize },
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        Self::Batched { batch_size: 254 }
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batched { batch_size } => write!(f, "batched({})", batch_size),
            Self::WorkerPool { workers, .. } => write!(f, "pool({})", workers),
        }
    }
}

/// Progress notification emitted by a running executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// `(current, count)` for batched runs, `None` for the worker pool.
    pub batch: Option<(usize, usize)>,
    pub processed: usize,
    pub total: usize,
    /// Items that produced a result so far.
    pub found: usize,
    pub elapsed: Duration,
}

/// Receives [`ProgressEvent`]s. Rendering is up to the caller.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// What a run produced.
#[derive(Debug)]
pub struct Execution<R> {
    /// Collected results, in completion order.
    pub results: Vec<R>,
    /// Items whose probe ran to completion.
    pub processed: usize,
    /// True when cancellation stopped the run early.
    pub cancelled: bool,
}

impl<R> Execution<R> {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            processed: 0,
            cancelled: false,
        }
    }
}

enum Outcome<R> {
    Found(R),
    Empty,
    Cancelled,
}

/// Everything a single probe must pass through before it runs.
#[derive(Clone)]
struct Gate {
    semaphore: Arc<Semaphore>,
    rate_limiter: Option<RateLimiter>,
    cancel: CancellationToken,
}

impl Gate {
    async fn pass<R, Fut>(&self, work: Fut) -> Outcome<R>
    where
        Fut: Future<Output = Option<R>>,
    {
        let gated = async {
            let Ok(_permit) = self.semaphore.acquire().await else {
                return Outcome::Cancelled;
            };
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }
            match work.await {
                Some(result) => Outcome::Found(result),
                None => Outcome::Empty,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Outcome::Cancelled,
            outcome = gated => outcome,
        }
    }
}

/// Runs a probe over a list of items with bounded concurrency.
///
/// Clones share the semaphore. Handing one executor to several nested runs
/// therefore bounds their combined concurrency.
#[derive(Clone)]
pub struct BoundedExecutor {
    semaphore: Arc<Semaphore>,
    limit: usize,
    strategy: ExecutionStrategy,
    rate_limiter: Option<RateLimiter>,
    progress: Option<ProgressCallback>,
}

impl BoundedExecutor {
    /// Create an executor allowing `limit` concurrent probes (minimum 1).
    pub fn new(limit: usize, strategy: ExecutionStrategy) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            strategy,
            rate_limiter: None,
            progress: None,
        }
    }

    pub fn with_rate_limit(mut self, rate_limiter: Option<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Run `probe` over every item and collect the non-empty results.
    ///
    /// When `cancel` fires, dispatch stops, in-flight probes are dropped and
    /// whatever was collected is returned with `cancelled` set.
    pub async fn run<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        cancel: &CancellationToken,
        probe: F,
    ) -> Execution<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Option<R>> + Send + 'static,
    {
        if items.is_empty() {
            return Execution::empty();
        }
        if cancel.is_cancelled() {
            return Execution {
                cancelled: true,
                ..Execution::empty()
            };
        }

        let gate = Gate {
            semaphore: Arc::clone(&self.semaphore),
            rate_limiter: self.rate_limiter.clone(),
            cancel: cancel.clone(),
        };

        match self.strategy {
            ExecutionStrategy::Batched { batch_size } => {
                self.run_batched(items, batch_size.max(1), gate, probe).await
            }
            ExecutionStrategy::WorkerPool {
                workers,
                queue_depth,
            } => {
                self.run_pool(items, workers.max(1), queue_depth.max(1), gate, probe)
                    .await
            }
        }
    }

    async fn run_batched<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        batch_size: usize,
        gate: Gate,
        probe: F,
    ) -> Execution<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Option<R>> + Send + 'static,
    {
        let started = Instant::now();
        let total = items.len();
        let batches = total.div_ceil(batch_size);
        let mut execution = Execution::empty();
        let mut pending = items.into_iter();

        for batch in 1..=batches {
            if gate.cancel.is_cancelled() {
                execution.cancelled = true;
                break;
            }
            debug!(batch, batches, "dispatching batch");

            let mut tasks = JoinSet::new();
            for item in pending.by_ref().take(batch_size) {
                let gate = gate.clone();
                let probe = probe.clone();
                tasks.spawn(async move { gate.pass(probe(item)).await });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Outcome::Found(result)) => {
                        execution.processed += 1;
                        execution.results.push(result);
                    }
                    Ok(Outcome::Empty) => execution.processed += 1,
                    Ok(Outcome::Cancelled) => execution.cancelled = true,
                    Err(e) => {
                        execution.processed += 1;
                        warn!(error = %e, "probe task failed");
                    }
                }
            }

            self.emit(ProgressEvent {
                batch: Some((batch, batches)),
                processed: execution.processed,
                total,
                found: execution.results.len(),
                elapsed: started.elapsed(),
            });
        }

        execution
    }

    async fn run_pool<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        workers: usize,
        queue_depth: usize,
        gate: Gate,
        probe: F,
    ) -> Execution<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Option<R>> + Send + 'static,
    {
        let started = Instant::now();
        let total = items.len();
        let workers = workers.min(total);
        debug!(workers, queue_depth, total, "starting worker pool");

        let (job_tx, job_rx) = mpsc::channel::<T>(queue_depth);
        let (result_tx, mut result_rx) = mpsc::channel::<Outcome<R>>(queue_depth);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let feeder_cancel = gate.cancel.clone();
        let feeder = tokio::spawn(async move {
            for item in items {
                tokio::select! {
                    biased;
                    _ = feeder_cancel.cancelled() => break,
                    sent = job_tx.send(item) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let jobs = Arc::clone(&job_rx);
            let results = result_tx.clone();
            let gate = gate.clone();
            let probe = probe.clone();
            pool.spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(item) = next else { break };
                    let job = {
                        let gate = gate.clone();
                        let work = probe(item);
                        tokio::spawn(async move { gate.pass(work).await })
                    };
                    let outcome = match job.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(error = %e, "probe task failed");
                            Outcome::Empty
                        }
                    };
                    if results.send(outcome).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut execution = Execution::empty();
        let mut ticker = interval(POOL_PROGRESS_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.reset();

        loop {
            tokio::select! {
                outcome = result_rx.recv() => match outcome {
                    Some(Outcome::Found(result)) => {
                        execution.processed += 1;
                        execution.results.push(result);
                    }
                    Some(Outcome::Empty) => execution.processed += 1,
                    Some(Outcome::Cancelled) => execution.cancelled = true,
                    None => break,
                },
                _ = ticker.tick() => self.emit(ProgressEvent {
                    batch: None,
                    processed: execution.processed,
                    total,
                    found: execution.results.len(),
                    elapsed: started.elapsed(),
                }),
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "pool worker failed");
            }
        }
        if let Err(e) = feeder.await {
            warn!(error = %e, "job feeder failed");
        }
        if gate.cancel.is_cancelled() && execution.processed < total {
            execution.cancelled = true;
        }

        self.emit(ProgressEvent {
            batch: None,
            processed: execution.processed,
            total,
            found: execution.results.len(),
            elapsed: started.elapsed(),
        });
        execution
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }
}

impl std::fmt::Debug for BoundedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedExecutor")
            .field("limit", &self.limit)
            .field("strategy", &self.strategy)
            .field("rate_limiter", &self.rate_limiter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::time::sleep;

    const STRATEGIES: [ExecutionStrategy; 2] = [
        ExecutionStrategy::Batched { batch_size: 25 },
        ExecutionStrategy::WorkerPool {
            workers: 16,
            queue_depth: 8,
        },
    ];

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_limit() {
        for strategy in STRATEGIES {
            let active = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));
            let executor = BoundedExecutor::new(4, strategy);

            let probe = {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                move |i: u32| {
                    let active = Arc::clone(&active);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        sleep(Duration::from_millis(2)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        (i % 2 == 0).then_some(i)
                    }
                }
            };

            let execution = executor
                .run((0..100).collect(), &CancellationToken::new(), probe)
                .await;

            assert!(peak.load(Ordering::SeqCst) <= 4, "{strategy}");
            assert_eq!(execution.processed, 100);
            assert_eq!(execution.results.len(), 50);
            assert!(!execution.cancelled);
        }
    }

    #[tokio::test]
    async fn test_strategies_collect_same_results() {
        let mut outputs = Vec::new();
        for strategy in STRATEGIES {
            let executor = BoundedExecutor::new(8, strategy);
            let mut execution = executor
                .run((1..=60u32).collect(), &CancellationToken::new(), |i| async move {
                    (i % 3 == 0).then_some(i * 10)
                })
                .await;
            execution.results.sort_unstable();
            outputs.push(execution.results);
        }
        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[0].len(), 20);
    }

    #[tokio::test]
    async fn test_progress_after_each_batch() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let executor = BoundedExecutor::new(4, ExecutionStrategy::Batched { batch_size: 4 })
            .with_progress(Arc::new(move |event| sink.lock().unwrap().push(event)));

        executor
            .run((0..10u32).collect(), &CancellationToken::new(), |i| async move {
                Some(i)
            })
            .await;

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].batch, Some((1, 3)));
        assert_eq!(events[0].processed, 4);
        assert_eq!(events[2].processed, 10);
        assert_eq!(events[2].found, 10);
    }

    #[tokio::test]
    async fn test_panicking_probe_is_isolated() {
        for strategy in STRATEGIES {
            let executor = BoundedExecutor::new(4, strategy);
            let execution = executor
                .run((0..10u32).collect(), &CancellationToken::new(), |i| async move {
                    if i == 3 {
                        panic!("probe bug");
                    }
                    Some(i)
                })
                .await;
            assert_eq!(execution.results.len(), 9, "{strategy}");
            assert_eq!(execution.processed, 10, "{strategy}");
            assert!(!execution.cancelled, "{strategy}");
        }
    }

    #[tokio::test]
    async fn test_single_worker_survives_panics() {
        let executor = BoundedExecutor::new(
            1,
            ExecutionStrategy::WorkerPool {
                workers: 1,
                queue_depth: 2,
            },
        );
        let execution = executor
            .run((0..6u32).collect(), &CancellationToken::new(), |i| async move {
                if i % 2 == 0 {
                    panic!("probe bug");
                }
                Some(i)
            })
            .await;
        let mut results = execution.results;
        results.sort_unstable();
        assert_eq!(results, vec![1, 3, 5]);
        assert_eq!(execution.processed, 6);
    }

    #[tokio::test]
    async fn test_cancellation_returns_partial() {
        for strategy in STRATEGIES {
            let cancel = CancellationToken::new();
            let executor = BoundedExecutor::new(2, strategy);
            let trigger = cancel.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(30)).await;
                trigger.cancel();
            });

            let execution = executor
                .run((0..50u32).collect(), &cancel, |i| async move {
                    sleep(Duration::from_millis(20)).await;
                    Some(i)
                })
                .await;

            assert!(execution.cancelled, "{strategy}");
            assert!(execution.processed < 50);
            assert_eq!(execution.results.len(), execution.processed);
        }
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let executor = BoundedExecutor::new(2, ExecutionStrategy::default());
        let execution = executor
            .run(vec![1u32, 2, 3], &cancel, |i| async move { Some(i) })
            .await;
        assert!(execution.cancelled);
        assert_eq!(execution.processed, 0);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let executor = BoundedExecutor::new(2, ExecutionStrategy::default());
        let execution: Execution<u32> = executor
            .run(Vec::<u32>::new(), &CancellationToken::new(), |i| async move {
                Some(i)
            })
            .await;
        assert!(execution.results.is_empty());
        assert!(!execution.cancelled);
    }

    #[tokio::test]
    async fn test_rate_limit_applies_in_gate() {
        let executor = BoundedExecutor::new(8, ExecutionStrategy::default())
            .with_rate_limit(RateLimiter::new(10));
        let start = Instant::now();
        let execution = executor
            .run((0..12u32).collect(), &CancellationToken::new(), |i| async move {
                Some(i)
            })
            .await;
        assert_eq!(execution.results.len(), 12);
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
