//! Bounded adaptive worker pool
//!
//! A fixed-capacity task queue serviced by a dynamically sized set of
//! workers. Tasks are opaque units of work submitted with `submit`,
//! which blocks until the task's own result arrives (or the caller
//! cancels, or the pool shuts down). A monitor loop rebalances the
//! worker count from observed queue pressure: +2 workers when the queue
//! backs up past 75% of the active count, -1 when it drains below 25%.
//! The asymmetric steps favor responsiveness under bursts and caution
//! while draining, which keeps the pool from oscillating.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::{AnalyzerError, AnalyzerResult};
use crate::logger::{self, LogTag};

/// Monitor tick for queue-pressure rebalancing
const MONITOR_INTERVAL: Duration = Duration::from_millis(50);

/// How often an idle worker wakes up to re-check the target count
const IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Workers added per tick when the queue backs up
const SCALE_UP_STEP: usize = 2;

/// Queue slots per allowed worker
const QUEUE_SLOTS_PER_WORKER: usize = 4;

/// A unit of work executed by exactly one pool worker
///
/// The closure receives the pool's shutdown signal so long-running work
/// can bail out early during drain.
pub struct Task<T> {
    execute: Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, AnalyzerResult<T>> + Send>,
}

impl<T: Send + 'static> Task<T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = AnalyzerResult<T>> + Send + 'static,
    {
        Self {
            execute: Box::new(move |signal| Box::pin(f(signal))),
        }
    }
}

/// Pool statistics snapshot, read from atomics without blocking
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub current_workers: usize,
    pub max_workers: usize,
    pub tasks_processed: u64,
    pub tasks_queued: u64,
    pub average_latency: Duration,
    pub error_rate: f64,
    pub queue_utilization: f64,
}

#[derive(Default)]
struct Metrics {
    tasks_processed: AtomicU64,
    tasks_queued: AtomicU64,
    processing_time_ns: AtomicU64,
    errors: AtomicU64,
}

/// Type-erased job: runs the task, updates the pool counters, then
/// delivers the result through the submitter's oneshot. Counters are
/// updated before delivery so a submitter that reads `stats()` right
/// after `submit` returns sees its own task counted.
type Job = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, ()> + Send>;

/// State shared between workers, the monitor, and the pool handle
struct Shared {
    queue: Mutex<mpsc::Receiver<Job>>,
    active_workers: AtomicUsize,
    target_workers: AtomicUsize,
    min_workers: usize,
    max_workers: usize,
    metrics: Metrics,
    shutdown: CancellationToken,
}

pub struct Pool {
    tasks_tx: mpsc::Sender<Job>,
    shared: Arc<Shared>,
    tracker: TaskTracker,
    shutting_down: AtomicBool,
    queue_capacity: usize,
}

impl Pool {
    /// Create a pool with `min_workers` already running
    ///
    /// Bounds are clamped to `min_workers >= 1` and
    /// `max_workers >= min_workers`. The queue holds
    /// `4 x max_workers` pending tasks.
    pub fn new(min_workers: usize, max_workers: usize) -> Self {
        let min_workers = min_workers.max(1);
        let max_workers = max_workers.max(min_workers);

        let queue_capacity = max_workers * QUEUE_SLOTS_PER_WORKER;
        let (tasks_tx, tasks_rx) = mpsc::channel(queue_capacity);

        let shared = Arc::new(Shared {
            queue: Mutex::new(tasks_rx),
            active_workers: AtomicUsize::new(0),
            target_workers: AtomicUsize::new(min_workers),
            min_workers,
            max_workers,
            metrics: Metrics::default(),
            shutdown: CancellationToken::new(),
        });

        let tracker = TaskTracker::new();
        for _ in 0..min_workers {
            spawn_worker(&shared, &tracker);
        }
        tracker.spawn(monitor_run(
            Arc::clone(&shared),
            tasks_tx.clone(),
            tracker.clone(),
        ));

        logger::debug(
            LogTag::Worker,
            &format!(
                "Pool started with {} workers (max {}, queue {})",
                min_workers, max_workers, queue_capacity
            ),
        );

        Self {
            tasks_tx,
            shared,
            tracker,
            shutting_down: AtomicBool::new(false),
            queue_capacity,
        }
    }

    /// Submit a task and wait for its result
    ///
    /// Blocks while the queue is full and again until the task's result
    /// arrives; both waits race the caller's token and pool shutdown.
    /// The task's own error propagates unchanged. No ordering guarantee
    /// exists between concurrent submissions.
    pub async fn submit<T: Send + 'static>(
        &self,
        ctx: &CancellationToken,
        task: Task<T>,
    ) -> AnalyzerResult<T> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(AnalyzerError::PoolShutdown);
        }
        if ctx.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let (result_tx, result_rx) = oneshot::channel::<AnalyzerResult<T>>();
        let execute = task.execute;
        let shared = Arc::clone(&self.shared);
        let job: Job = Box::new(move |signal| {
            Box::pin(async move {
                let started = Instant::now();
                let result = (execute)(signal).await;
                let elapsed = started.elapsed();

                let metrics = &shared.metrics;
                metrics.tasks_processed.fetch_add(1, Ordering::Relaxed);
                metrics
                    .processing_time_ns
                    .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
                if result.is_err() {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                }

                // A submitter that gave up already dropped its receiver;
                // the failed delivery is counted instead of blocking
                // anyone.
                if result_tx.send(result).is_err() {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                }
            })
        });

        tokio::select! {
            _ = ctx.cancelled() => return Err(AnalyzerError::Cancelled),
            _ = self.shared.shutdown.cancelled() => return Err(AnalyzerError::PoolShutdown),
            sent = self.tasks_tx.send(job) => {
                if sent.is_err() {
                    return Err(AnalyzerError::PoolShutdown);
                }
            }
        }
        self.shared.metrics.tasks_queued.fetch_add(1, Ordering::Relaxed);

        tokio::select! {
            _ = ctx.cancelled() => Err(AnalyzerError::Cancelled),
            _ = self.shared.shutdown.cancelled() => Err(AnalyzerError::PoolShutdown),
            result = result_rx => match result {
                Ok(result) => result,
                Err(_) => Err(AnalyzerError::PoolShutdown),
            }
        }
    }

    /// Shut the pool down, draining in-flight tasks
    ///
    /// Idempotent: the first call flips the shutdown flag, signals every
    /// worker, and waits for them to finish their current task. If the
    /// caller's token fires first the wait is abandoned (best effort,
    /// not an abort) and a cancellation error is returned. Subsequent
    /// calls return immediately.
    pub async fn shutdown(&self, ctx: &CancellationToken) -> AnalyzerResult<()> {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        logger::debug(LogTag::Worker, "Pool shutting down, draining workers...");
        self.shared.shutdown.cancel();
        self.tracker.close();

        tokio::select! {
            _ = ctx.cancelled() => Err(AnalyzerError::Cancelled),
            _ = self.tracker.wait() => {
                logger::debug(LogTag::Worker, "Pool drained");
                Ok(())
            }
        }
    }

    /// Statistics snapshot; reads atomics only, never blocks on pool
    /// activity
    pub fn stats(&self) -> PoolStats {
        let metrics = &self.shared.metrics;
        let tasks_processed = metrics.tasks_processed.load(Ordering::Relaxed);
        let processing_time_ns = metrics.processing_time_ns.load(Ordering::Relaxed);
        let errors = metrics.errors.load(Ordering::Relaxed);

        let (average_latency, error_rate) = if tasks_processed > 0 {
            (
                Duration::from_nanos(processing_time_ns / tasks_processed),
                errors as f64 / tasks_processed as f64,
            )
        } else {
            (Duration::ZERO, 0.0)
        };

        let queue_len = self.queue_len();

        PoolStats {
            current_workers: self.shared.active_workers.load(Ordering::SeqCst),
            max_workers: self.shared.max_workers,
            tasks_processed,
            tasks_queued: metrics.tasks_queued.load(Ordering::Relaxed),
            average_latency,
            error_rate,
            queue_utilization: queue_len as f64 / self.queue_capacity as f64,
        }
    }

    fn queue_len(&self) -> usize {
        self.queue_capacity.saturating_sub(self.tasks_tx.capacity())
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // Workers must not outlive the pool handle even when shutdown()
        // was never called.
        self.shared.shutdown.cancel();
    }
}

fn spawn_worker(shared: &Arc<Shared>, tracker: &TaskTracker) {
    shared.active_workers.fetch_add(1, Ordering::SeqCst);
    tracker.spawn(worker_run(Arc::clone(shared)));
}

/// Retire this worker if the pool is over its target. The
/// compare-exchange makes the decrement race-free, so a one-step target
/// drop retires exactly one worker.
fn try_retire(shared: &Shared) -> bool {
    loop {
        let current = shared.active_workers.load(Ordering::SeqCst);
        let target = shared.target_workers.load(Ordering::SeqCst);
        if current <= target || current <= shared.min_workers {
            return false;
        }
        if shared
            .active_workers
            .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return true;
        }
    }
}

/// Worker loop: pull a task, execute it, publish the result, repeat
/// until shutdown or retirement.
async fn worker_run(shared: Arc<Shared>) {
    loop {
        if try_retire(&shared) {
            // Retirement already decremented the active count
            return;
        }

        let job = {
            let mut queue = shared.queue.lock().await;
            tokio::select! {
                _ = shared.shutdown.cancelled() => break,
                _ = tokio::time::sleep(IDLE_CHECK_INTERVAL) => None,
                job = queue.recv() => match job {
                    Some(job) => Some(job),
                    None => break,
                },
            }
        };

        // Idle wake-up: loop around and re-check the target
        let Some(job) = job else { continue };

        job(shared.shutdown.clone()).await;
    }

    shared.active_workers.fetch_sub(1, Ordering::SeqCst);
}

/// Monitor loop: every tick, compare queue depth against the active
/// worker count and adjust. Scale-up adds up to two workers at once;
/// scale-down lowers the target by one, and a worker retires itself
/// after its current task.
async fn monitor_run(shared: Arc<Shared>, tasks_tx: mpsc::Sender<Job>, tracker: TaskTracker) {
    let mut ticker = tokio::time::interval(MONITOR_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shared.shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let queue_len = tasks_tx
            .max_capacity()
            .saturating_sub(tasks_tx.capacity());
        let current = shared.active_workers.load(Ordering::SeqCst);

        if queue_len as f64 > current as f64 * 0.75 && current < shared.max_workers {
            let needed = (shared.max_workers - current).min(SCALE_UP_STEP);
            for _ in 0..needed {
                spawn_worker(&shared, &tracker);
            }
            shared
                .target_workers
                .store(shared.active_workers.load(Ordering::SeqCst), Ordering::SeqCst);
            logger::debug(
                LogTag::Worker,
                &format!(
                    "Scaled up by {} (queue {} > 75% of {} workers)",
                    needed, queue_len, current
                ),
            );
        } else if current > shared.min_workers && queue_len < current / 4 {
            shared.target_workers.store(current - 1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn basic_task_execution() {
        let pool = Pool::new(2, 4);

        let result = pool
            .submit(
                &noop_token(),
                Task::new(|_signal| async { Ok("success".to_string()) }),
            )
            .await
            .unwrap();
        assert_eq!(result, "success");

        pool.shutdown(&noop_token()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancelled_context_skips_execution() {
        let pool = Pool::new(2, 4);

        let executed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&executed);

        let ctx = CancellationToken::new();
        ctx.cancel();

        let err = pool
            .submit(
                &ctx,
                Task::new(move |_signal| async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyzerError::Cancelled));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!executed.load(Ordering::SeqCst));

        pool.shutdown(&noop_token()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_submissions_get_their_own_results() {
        let pool = Arc::new(Pool::new(4, 8));
        let num_tasks = 100u64;

        let mut handles = Vec::new();
        for i in 0..num_tasks {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move {
                let result = pool
                    .submit(&noop_token(), Task::new(move |_signal| async move { Ok(i) }))
                    .await
                    .unwrap();
                assert_eq!(result, i);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.tasks_processed, num_tasks);
        assert_eq!(stats.tasks_queued, num_tasks);

        pool.shutdown(&noop_token()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn task_errors_propagate_and_count() {
        let pool = Pool::new(2, 4);

        let err = pool
            .submit(
                &noop_token(),
                Task::new(|_signal| async {
                    Err::<(), _>(AnalyzerError::Analysis("test error".to_string()))
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Analysis(_)));

        // A successful task alongside the failure
        pool.submit(&noop_token(), Task::new(|_signal| async { Ok(()) }))
            .await
            .unwrap();

        let stats = pool.stats();
        assert!(stats.error_rate > 0.0);
        assert!((stats.error_rate - 0.5).abs() < 1e-9);

        pool.shutdown(&noop_token()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn workers_scale_with_load_and_drain_back() {
        let pool = Arc::new(Pool::new(2, 8));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move {
                let _ = pool
                    .submit(
                        &noop_token(),
                        Task::new(|_signal| async {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Ok(())
                        }),
                    )
                    .await;
            }));
        }

        // Queue pressure must have grown the pool past its minimum
        tokio::time::sleep(Duration::from_millis(200)).await;
        let stats = pool.stats();
        assert!(
            stats.current_workers > 2,
            "expected scale-up, got {} workers",
            stats.current_workers
        );
        assert!(stats.current_workers <= 8);

        for handle in handles {
            handle.await.unwrap();
        }

        // After the flood drains, the pool retires one worker per tick
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let stats = pool.stats();
        assert!(
            stats.current_workers <= 4,
            "expected scale-down, got {} workers",
            stats.current_workers
        );
        assert!(stats.current_workers >= 2);

        pool.shutdown(&noop_token()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shutdown_rejects_new_work_and_is_idempotent() {
        let pool = Pool::new(2, 4);

        pool.submit(&noop_token(), Task::new(|_signal| async { Ok(()) }))
            .await
            .unwrap();

        pool.shutdown(&noop_token()).await.unwrap();

        let err = pool
            .submit(&noop_token(), Task::new(|_signal| async { Ok(()) }))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::PoolShutdown));

        // Second shutdown is a no-op
        pool.shutdown(&noop_token()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn bounds_are_clamped() {
        let pool = Pool::new(0, 0);
        let stats = pool.stats();
        assert_eq!(stats.current_workers, 1);
        assert_eq!(stats.max_workers, 1);
        pool.shutdown(&noop_token()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stats_are_zero_before_any_task() {
        let pool = Pool::new(2, 4);
        let stats = pool.stats();
        assert_eq!(stats.tasks_processed, 0);
        assert_eq!(stats.average_latency, Duration::ZERO);
        assert_eq!(stats.error_rate, 0.0);
        assert_eq!(stats.queue_utilization, 0.0);
        pool.shutdown(&noop_token()).await.unwrap();
    }
}
