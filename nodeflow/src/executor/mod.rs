//! Pipeline execution.
//!
//! [`PipelineExecutor::execute`] validates the definition, walks it in
//! topological order and runs one node at a time. Each node passes through
//! its circuit breaker, is dispatched under the retry policy, and has its
//! result persisted and announced on the event bus. A condition that
//! evaluates to false skips the branch only it feeds.

mod retry;
mod skip;


pub use retry::{RetryOutcome, RetryPolicy};
pub use skip::mark_downstream_skipped;

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::cancellation::CancellationToken;
use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::core::{EventType, NodeExecutionResult, PipelineRunResult};
use crate::definition::{Node, NodeType, PipelineDefinition};
use crate::dispatch::condition::is_truthy;
use crate::dispatch::{DefaultDispatcher, NodeDispatcher, NodeInputs};
use crate::errors::NodeError;
use crate::validation::{execution_order, validate_pipeline_dag, Adjacency};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Error text of a run stopped by cancellation.
pub const CANCELLED_MESSAGE: &str = "Pipeline run was cancelled";

const INSERT_NODE_RUN: &str = "INSERT INTO pipeline_node_runs \
     (run_id, node_id, status, output, error_message, duration_ms, retry_count) \
     VALUES (:run_id, :node_id, :status, :output, :error_message, :duration_ms, :retry_count)";

/// Why a run stopped before its last node.
enum Halt {
    Failed(String),
    Cancelled,
}

/// Mutable state of one run.
#[derive(Default)]
struct RunState {
    outputs: Map<String, Value>,
    results: Vec<NodeExecutionResult>,
    skipped: HashSet<String>,
}

/// Runs one pipeline definition.
///
/// An executor owns one circuit breaker per node, so breaker state carries
/// over between runs made with the same executor. Share it across tasks as
/// `Arc<PipelineExecutor>`.
pub struct PipelineExecutor {
    pipeline_id: i64,
    definition: PipelineDefinition,
    context: ExecutionContext,
    dispatcher: Arc<dyn NodeDispatcher>,
    cancel: Arc<CancellationToken>,
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
}

impl PipelineExecutor {
    /// Creates an executor with default breaker settings.
    #[must_use]
    pub fn new(pipeline_id: i64, definition: PipelineDefinition, context: ExecutionContext) -> Self {
        let breakers = Mutex::new(build_breakers(&definition, CircuitBreakerConfig::default()));
        Self {
            pipeline_id,
            definition,
            context,
            dispatcher: Arc::new(DefaultDispatcher),
            cancel: Arc::new(CancellationToken::new()),
            breakers,
        }
    }

    /// Creates an executor with breaker defaults from an engine config.
    #[must_use]
    pub fn from_config(
        pipeline_id: i64,
        definition: PipelineDefinition,
        context: ExecutionContext,
        config: &EngineConfig,
    ) -> Self {
        Self::new(pipeline_id, definition, context).with_breaker_config(config.breaker_config())
    }

    /// Replaces the breaker defaults. Per-node `failure_threshold` entries
    /// still take precedence.
    #[must_use]
    pub fn with_breaker_config(self, config: CircuitBreakerConfig) -> Self {
        *self.breakers.lock() = build_breakers(&self.definition, config);
        self
    }

    /// Replaces the node dispatcher.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn NodeDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Returns the pipeline id.
    #[must_use]
    pub fn pipeline_id(&self) -> i64 {
        self.pipeline_id
    }

    /// Returns the definition.
    #[must_use]
    pub fn definition(&self) -> &PipelineDefinition {
        &self.definition
    }

    /// Requests cooperative cancellation. The run stops before its next node
    /// or as soon as a delay or backoff wait notices.
    pub fn request_cancel(&self) {
        self.cancel.cancel(CANCELLED_MESSAGE);
    }

    /// Returns the executor's cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancel)
    }

    /// Returns the breaker state of a node.
    #[must_use]
    pub fn breaker_state(&self, node_id: &str) -> Option<CircuitState> {
        self.breakers.lock().get(node_id).map(CircuitBreaker::state)
    }

    /// Executes the pipeline once.
    pub async fn execute(
        &self,
        run_id: i64,
        trigger_data: Option<Value>,
        policy: &RetryPolicy,
    ) -> PipelineRunResult {
        let span = info_span!("pipeline_run", pipeline_id = self.pipeline_id, run_id);
        self.execute_inner(run_id, trigger_data, policy)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        run_id: i64,
        trigger_data: Option<Value>,
        policy: &RetryPolicy,
    ) -> PipelineRunResult {
        let errors = validate_pipeline_dag(&self.definition);
        if !errors.is_empty() {
            let message = format!("Validation failed: {}", errors.join("; "));
            warn!(error = %message, "Pipeline validation failed");
            self.emit(EventType::RunFailed, run_id, json!({ "error": message })).await;
            return PipelineRunResult::failed(message, Map::new(), Vec::new());
        }

        self.emit(EventType::RunStarted, run_id, json!({})).await;
        info!("Pipeline run started");

        let order = match execution_order(&self.definition) {
            Ok(order) => order,
            Err(cycle) => {
                let message = cycle.to_string();
                self.emit(EventType::RunFailed, run_id, json!({ "error": message })).await;
                return PipelineRunResult::failed(message, Map::new(), Vec::new());
            }
        };
        let adjacency = Adjacency::build(&self.definition);
        let node_map = self.definition.node_map();

        let mut state = RunState::default();
        let trigger_output = trigger_data.unwrap_or_else(|| json!({}));
        for trigger in self.definition.triggers() {
            state.outputs.insert(trigger.id.clone(), trigger_output.clone());
        }

        for node_id in &order {
            let Some(node) = node_map.get(node_id.as_str()) else {
                continue;
            };
            if let ControlFlow::Break(halt) = self.run_node(run_id, node, &adjacency, &mut state, policy).await {
                return self.finish_halted(run_id, halt, state).await;
            }
        }

        self.emit(EventType::RunCompleted, run_id, json!({})).await;
        info!(nodes = state.results.len(), "Pipeline run completed");
        PipelineRunResult::completed(state.outputs, state.results)
    }

    async fn finish_halted(&self, run_id: i64, halt: Halt, state: RunState) -> PipelineRunResult {
        match halt {
            Halt::Failed(message) => {
                warn!(error = %message, "Pipeline run failed");
                self.emit(EventType::RunFailed, run_id, json!({ "error": message })).await;
                PipelineRunResult::failed(message, state.outputs, state.results)
            }
            Halt::Cancelled => {
                info!("Pipeline run cancelled");
                let reason = self.cancel.reason();
                self.emit(EventType::RunCancelled, run_id, json!({ "reason": reason })).await;
                PipelineRunResult::cancelled(CANCELLED_MESSAGE, state.outputs, state.results)
            }
        }
    }

    async fn run_node(
        &self,
        run_id: i64,
        node: &Node,
        adjacency: &Adjacency,
        state: &mut RunState,
        policy: &RetryPolicy,
    ) -> ControlFlow<Halt> {
        if self.cancel.is_cancelled() {
            return ControlFlow::Break(Halt::Cancelled);
        }

        let preds = adjacency.predecessors(&node.id);
        let should_skip = state.skipped.contains(&node.id)
            || (!preds.is_empty() && preds.iter().all(|p| state.skipped.contains(p)));
        if should_skip {
            state.skipped.insert(node.id.clone());
            self.emit(EventType::NodeSkipped, run_id, json!({ "node_id": node.id })).await;
            self.record(run_id, state, NodeExecutionResult::skipped(&node.id)).await;
            return ControlFlow::Continue(());
        }

        if node.node_type == NodeType::Trigger {
            if let Some(seeded) = state.outputs.get(&node.id).cloned() {
                self.record(run_id, state, NodeExecutionResult::completed(&node.id, seeded))
                    .await;
                return ControlFlow::Continue(());
            }
        }

        self.emit(EventType::NodeStarted, run_id, json!({ "node_id": node.id })).await;

        let inputs: NodeInputs = preds
            .iter()
            .filter(|p| !state.skipped.contains(*p))
            .filter_map(|p| state.outputs.get(p).map(|out| (p.clone(), out.clone())))
            .collect();

        let allowed = self
            .breakers
            .lock()
            .get_mut(&node.id)
            .map_or(true, CircuitBreaker::can_execute);
        if !allowed {
            let message = format!("Circuit breaker OPEN for node '{}'", node.id);
            self.emit(
                EventType::NodeFailed,
                run_id,
                json!({ "node_id": node.id, "error": message }),
            )
            .await;
            self.record(run_id, state, NodeExecutionResult::failed(&node.id, &message))
                .await;
            return self.fatal_unless_condition(node, message);
        }

        let started = Instant::now();
        let outcome = self.dispatch_with_retry(run_id, node, &inputs, policy).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            RetryOutcome::Succeeded {
                output,
                failed_attempts,
            } => {
                self.with_breaker(&node.id, CircuitBreaker::record_success);
                state.outputs.insert(node.id.clone(), output.clone());
                self.emit(
                    EventType::NodeCompleted,
                    run_id,
                    json!({
                        "node_id": node.id,
                        "duration_ms": duration_ms,
                        "retry_count": failed_attempts,
                    }),
                )
                .await;

                let condition_false = node.node_type == NodeType::Condition
                    && output.get("result").is_some_and(|r| !is_truthy(r));

                let result = NodeExecutionResult::completed(&node.id, output)
                    .with_duration_ms(duration_ms)
                    .with_retry_count(failed_attempts);
                self.record(run_id, state, result).await;

                if condition_false {
                    debug!(node_id = %node.id, "Condition is false, skipping downstream branch");
                    mark_downstream_skipped(&node.id, adjacency, &mut state.skipped);
                }
                ControlFlow::Continue(())
            }
            RetryOutcome::Exhausted { error } => {
                self.with_breaker(&node.id, CircuitBreaker::record_failure);
                let original = error.to_string();
                self.emit(
                    EventType::NodeFailed,
                    run_id,
                    json!({ "node_id": node.id, "error": original }),
                )
                .await;

                let result = NodeExecutionResult::failed(&node.id, &original)
                    .with_duration_ms(duration_ms)
                    .with_retry_count(policy.max_retries);
                self.record(run_id, state, result).await;

                self.fatal_unless_condition(
                    node,
                    format!(
                        "Node '{}' failed after {} retries: {original}",
                        node.id, policy.max_retries
                    ),
                )
            }
            RetryOutcome::Rejected {
                error,
                failed_attempts,
            } => {
                let message = error.to_string();
                self.emit(
                    EventType::NodeFailed,
                    run_id,
                    json!({ "node_id": node.id, "error": message, "kind": error.kind() }),
                )
                .await;

                let result = NodeExecutionResult::failed(&node.id, &message)
                    .with_duration_ms(duration_ms)
                    .with_retry_count(failed_attempts);
                self.record(run_id, state, result).await;

                self.fatal_unless_condition(node, message)
            }
            RetryOutcome::Cancelled { failed_attempts } => {
                let result = NodeExecutionResult::cancelled(&node.id)
                    .with_duration_ms(duration_ms)
                    .with_retry_count(failed_attempts);
                self.record(run_id, state, result).await;
                ControlFlow::Break(Halt::Cancelled)
            }
        }
    }

    /// Dispatches a node until it succeeds, fails for good, or the run is
    /// cancelled.
    async fn dispatch_with_retry(
        &self,
        run_id: i64,
        node: &Node,
        inputs: &NodeInputs,
        policy: &RetryPolicy,
    ) -> RetryOutcome {
        let mut failed_attempts = 0;
        loop {
            let attempt = self
                .dispatcher
                .dispatch(node, inputs, &self.context, &self.cancel)
                .await;

            let error = match attempt {
                Ok(output) => {
                    return RetryOutcome::Succeeded {
                        output,
                        failed_attempts,
                    }
                }
                Err(NodeError::Cancelled) => return RetryOutcome::Cancelled { failed_attempts },
                Err(error) if !error.is_retryable() => {
                    return RetryOutcome::Rejected {
                        error,
                        failed_attempts,
                    }
                }
                Err(error) => error,
            };

            failed_attempts += 1;
            let Some(delay) = policy.next_delay(failed_attempts) else {
                return RetryOutcome::Exhausted { error };
            };

            debug!(
                node_id = %node.id,
                attempt = failed_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Retrying node"
            );
            self.emit(
                EventType::NodeRetrying,
                run_id,
                json!({
                    "node_id": node.id,
                    "attempt": failed_attempts,
                    "error": error.to_string(),
                }),
            )
            .await;

            if !self.cancel.sleep(delay).await {
                return RetryOutcome::Cancelled { failed_attempts };
            }
        }
    }

    fn fatal_unless_condition(&self, node: &Node, message: String) -> ControlFlow<Halt> {
        if node.is_condition() {
            warn!(
                node_id = %node.id,
                error = %message,
                "Condition node failed, continuing without a skip decision"
            );
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Halt::Failed(message))
        }
    }

    fn with_breaker(&self, node_id: &str, f: impl FnOnce(&mut CircuitBreaker)) {
        if let Some(breaker) = self.breakers.lock().get_mut(node_id) {
            f(breaker);
        }
    }

    async fn record(&self, run_id: i64, state: &mut RunState, result: NodeExecutionResult) {
        self.persist(run_id, &result).await;
        state.results.push(result);
    }

    /// Writes a node result row. Failures are logged and dropped.
    async fn persist(&self, run_id: i64, result: &NodeExecutionResult) {
        let Some(db) = &self.context.db else {
            return;
        };

        let output = match &result.output {
            Some(value) if is_truthy(value) => Value::String(value.to_string()),
            _ => Value::Null,
        };
        let mut params = Map::new();
        params.insert("run_id".into(), json!(run_id));
        params.insert("node_id".into(), json!(result.node_id));
        params.insert("status".into(), json!(result.status.to_string()));
        params.insert("output".into(), output);
        params.insert("error_message".into(), json!(result.error));
        params.insert("duration_ms".into(), json!(result.duration_ms));
        params.insert("retry_count".into(), json!(result.retry_count));

        if let Err(e) = db.execute(INSERT_NODE_RUN, &params).await {
            warn!(node_id = %result.node_id, error = %e, "Failed to persist node run");
        }
    }

    /// Emits a lifecycle event. Failures are logged and dropped.
    pub(crate) async fn emit(&self, event_type: EventType, run_id: i64, extra: Value) {
        let Some(bus) = &self.context.event_bus else {
            return;
        };

        let mut data = Map::new();
        data.insert("pipeline_id".into(), json!(self.pipeline_id));
        data.insert("run_id".into(), json!(run_id));
        data.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
        if let Value::Object(fields) = extra {
            data.extend(fields);
        }

        if let Err(e) = bus.emit(event_type, Value::Object(data)).await {
            warn!(event_type = %event_type, error = %e, "Failed to emit event");
        }
    }
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("pipeline_id", &self.pipeline_id)
            .field("nodes", &self.definition.nodes.len())
            .field("edges", &self.definition.edges.len())
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

fn build_breakers(
    definition: &PipelineDefinition,
    defaults: CircuitBreakerConfig,
) -> HashMap<String, CircuitBreaker> {
    definition
        .nodes
        .iter()
        .map(|node| {
            let config = node
                .failure_threshold()
                .map_or(defaults, |t| defaults.with_failure_threshold(t));
            (node.id.clone(), CircuitBreaker::new(config))
        })
        .collect()
}
