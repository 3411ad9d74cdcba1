//! Tracking, timeouts and cancellation of running pipelines.
//!
//! A [`RunManager`] spawns each run as its own tokio task with an absolute
//! deadline and keeps it addressable by run id until the task ends, however
//! it ends.

use crate::config::EngineConfig;
use crate::core::{EventType, PipelineRunResult};
use crate::errors::RunError;
use crate::executor::{PipelineExecutor, RetryPolicy, CANCELLED_MESSAGE};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::{json, Map, Value};
use std::future::IntoFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn};

/// Per-run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Absolute deadline for the whole run.
    pub timeout: Duration,
    /// Output seeded into every trigger node.
    pub trigger_data: Option<Value>,
    /// Retry policy applied to every node.
    pub retry: RetryPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600),
            trigger_data: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl RunOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the deadline in seconds. Negative or non-finite values mean an
    /// immediate deadline.
    #[must_use]
    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO);
        self
    }

    /// Sets the trigger data.
    #[must_use]
    pub fn with_trigger_data(mut self, trigger_data: Value) -> Self {
        self.trigger_data = Some(trigger_data);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl From<&EngineConfig> for RunOptions {
    fn from(config: &EngineConfig) -> Self {
        config.run_options()
    }
}

struct TrackedRun {
    abort: AbortHandle,
    executor: Arc<PipelineExecutor>,
    generation: u64,
}

/// Removes a run's tracking entry when the run's future is dropped, whether
/// it finished, panicked or was aborted. Entries of other tasks that reuse
/// the run id are left alone.
struct TrackingGuard {
    runs: Arc<DashMap<i64, TrackedRun>>,
    run_id: i64,
    generation: u64,
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        self.runs
            .remove_if(&self.run_id, |_, run| run.generation == self.generation);
    }
}

/// Tracks active pipeline runs.
///
/// Cloning a manager yields a handle to the same set of runs.
#[derive(Clone, Default)]
pub struct RunManager {
    runs: Arc<DashMap<i64, TrackedRun>>,
    generations: Arc<AtomicU64>,
}

impl RunManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a run of `executor` and starts tracking it under `run_id`.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::AlreadyActive`] if `run_id` is already tracked.
    pub fn start_run(
        &self,
        run_id: i64,
        executor: Arc<PipelineExecutor>,
        options: RunOptions,
    ) -> Result<RunHandle, RunError> {
        if self.runs.contains_key(&run_id) {
            return Err(RunError::AlreadyActive(run_id));
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let guard = TrackingGuard {
            runs: Arc::clone(&self.runs),
            run_id,
            generation,
        };
        let (start_tx, start_rx) = oneshot::channel::<()>();
        let run_executor = Arc::clone(&executor);

        // No map lock is held here: the future may be dropped inside `spawn`
        // when the runtime is shutting down, and its guard touches the map.
        let task = tokio::spawn(async move {
            let _guard = guard;
            if start_rx.await.is_err() {
                return PipelineRunResult::cancelled(CANCELLED_MESSAGE, Map::new(), Vec::new());
            }
            run_with_timeout(run_id, &run_executor, options).await
        });

        let duplicate = match self.runs.entry(run_id) {
            Entry::Occupied(_) => true,
            Entry::Vacant(slot) => {
                if !task.is_finished() {
                    slot.insert(TrackedRun {
                        abort: task.abort_handle(),
                        executor,
                        generation,
                    });
                }
                false
            }
        };
        if duplicate {
            task.abort();
            return Err(RunError::AlreadyActive(run_id));
        }

        // The receiver only disappears if the task was already dropped.
        let _ = start_tx.send(());

        info!(run_id, "Pipeline run spawned");
        Ok(RunHandle { run_id, task })
    }

    /// Cancels a run: cooperatively through its executor, then by aborting
    /// its task. Returns true if a running task was aborted.
    pub fn cancel_run(&self, run_id: i64) -> bool {
        let Some((abort, executor)) = self
            .runs
            .get(&run_id)
            .map(|run| (run.abort.clone(), Arc::clone(&run.executor)))
        else {
            return false;
        };

        executor.request_cancel();
        if abort.is_finished() {
            return false;
        }
        abort.abort();
        info!(run_id, "Pipeline run cancelled");
        true
    }

    /// Cancels every tracked run. Returns how many were aborted.
    pub fn cancel_all(&self) -> usize {
        let run_ids: Vec<i64> = self.runs.iter().map(|run| *run.key()).collect();
        run_ids.into_iter().filter(|id| self.cancel_run(*id)).count()
    }

    /// Returns the ids of runs whose task has not finished, sorted.
    #[must_use]
    pub fn active_runs(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .runs
            .iter()
            .filter(|run| !run.abort.is_finished())
            .map(|run| *run.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Returns true if the run is tracked and its task has not finished.
    #[must_use]
    pub fn is_running(&self, run_id: i64) -> bool {
        self.runs
            .get(&run_id)
            .is_some_and(|run| !run.abort.is_finished())
    }
}

impl std::fmt::Debug for RunManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunManager")
            .field("active_runs", &self.active_runs())
            .finish()
    }
}

async fn run_with_timeout(
    run_id: i64,
    executor: &PipelineExecutor,
    options: RunOptions,
) -> PipelineRunResult {
    let RunOptions {
        timeout,
        trigger_data,
        retry,
    } = options;

    match tokio::time::timeout(timeout, executor.execute(run_id, trigger_data, &retry)).await {
        Ok(result) => result,
        Err(_) => {
            let seconds = timeout.as_secs_f64();
            warn!(run_id, timeout_seconds = seconds, "Pipeline run timed out");
            executor.request_cancel();
            executor
                .emit(
                    EventType::RunTimeout,
                    run_id,
                    json!({ "timeout_seconds": seconds }),
                )
                .await;
            PipelineRunResult::timeout(format!("Pipeline exceeded {seconds}s timeout"))
        }
    }
}

/// Handle to a spawned run.
///
/// Await it (or call [`join`](Self::join)) for the run's result. Dropping the
/// handle detaches the run; it keeps running and stays tracked.
#[derive(Debug)]
pub struct RunHandle {
    run_id: i64,
    task: JoinHandle<PipelineRunResult>,
}

impl RunHandle {
    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Returns true once the run's task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run's result. An aborted run resolves to a cancelled
    /// result.
    pub async fn join(self) -> PipelineRunResult {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                PipelineRunResult::cancelled(CANCELLED_MESSAGE, Map::new(), Vec::new())
            }
            Err(e) => {
                warn!(run_id = self.run_id, error = %e, "Pipeline run task panicked");
                PipelineRunResult::failed(format!("Pipeline run panicked: {e}"), Map::new(), Vec::new())
            }
        }
    }
}

impl IntoFuture for RunHandle {
    type Output = PipelineRunResult;
    type IntoFuture = BoxFuture<'static, PipelineRunResult>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.join())
    }
}
