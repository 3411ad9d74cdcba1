//! Per-node and per-run execution results.

use super::{NodeStatus, RunStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of executing a single pipeline node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExecutionResult {
    /// The node id.
    pub node_id: String,
    /// Terminal status.
    pub status: NodeStatus,
    /// Output produced by the node, if any.
    #[serde(default)]
    pub output: Option<Value>,
    /// Error message, if the node failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Wall time spent dispatching, including retry backoff.
    #[serde(default)]
    pub duration_ms: u64,
    /// Number of failed attempts before the final outcome.
    #[serde(default)]
    pub retry_count: u32,
}

impl NodeExecutionResult {
    fn new(node_id: impl Into<String>, status: NodeStatus) -> Self {
        Self {
            node_id: node_id.into(),
            status,
            output: None,
            error: None,
            duration_ms: 0,
            retry_count: 0,
        }
    }

    /// Creates a completed result.
    #[must_use]
    pub fn completed(node_id: impl Into<String>, output: Value) -> Self {
        let mut result = Self::new(node_id, NodeStatus::Completed);
        result.output = Some(output);
        result
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(node_id: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::new(node_id, NodeStatus::Failed);
        result.error = Some(error.into());
        result
    }

    /// Creates a skipped result.
    #[must_use]
    pub fn skipped(node_id: impl Into<String>) -> Self {
        Self::new(node_id, NodeStatus::Skipped)
    }

    /// Creates a cancelled result.
    #[must_use]
    pub fn cancelled(node_id: impl Into<String>) -> Self {
        Self::new(node_id, NodeStatus::Cancelled)
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Sets the retry count.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// Caller-visible outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    /// Overall status.
    pub status: RunStatus,
    /// Outputs keyed by node id (trigger outputs included).
    #[serde(default)]
    pub outputs: Map<String, Value>,
    /// One entry per node that reached a terminal state, in execution order.
    #[serde(default)]
    pub node_results: Vec<NodeExecutionResult>,
    /// Human-readable error when the run did not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineRunResult {
    /// Creates a completed run result.
    #[must_use]
    pub fn completed(outputs: Map<String, Value>, node_results: Vec<NodeExecutionResult>) -> Self {
        Self {
            status: RunStatus::Completed,
            outputs,
            node_results,
            error: None,
        }
    }

    /// Creates a failed run result with partial outputs.
    #[must_use]
    pub fn failed(
        error: impl Into<String>,
        outputs: Map<String, Value>,
        node_results: Vec<NodeExecutionResult>,
    ) -> Self {
        Self {
            status: RunStatus::Failed,
            outputs,
            node_results,
            error: Some(error.into()),
        }
    }

    /// Creates a cancelled run result with partial outputs.
    #[must_use]
    pub fn cancelled(
        error: impl Into<String>,
        outputs: Map<String, Value>,
        node_results: Vec<NodeExecutionResult>,
    ) -> Self {
        Self {
            status: RunStatus::Cancelled,
            outputs,
            node_results,
            error: Some(error.into()),
        }
    }

    /// Creates a timeout result. Partial results are not available once the
    /// run future has been dropped.
    #[must_use]
    pub fn timeout(error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Timeout,
            outputs: Map::new(),
            node_results: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Returns true if the run completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Returns the result recorded for a node.
    #[must_use]
    pub fn node_result(&self, node_id: &str) -> Option<&NodeExecutionResult> {
        self.node_results.iter().find(|r| r.node_id == node_id)
    }

    /// Returns the output recorded for a node.
    #[must_use]
    pub fn output(&self, node_id: &str) -> Option<&Value> {
        self.outputs.get(node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_result_builders() {
        let result = NodeExecutionResult::completed("a1", json!({"ok": true}))
            .with_duration_ms(12)
            .with_retry_count(2);

        assert_eq!(result.status, NodeStatus::Completed);
        assert_eq!(result.duration_ms, 12);
        assert_eq!(result.retry_count, 2);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_run_result_lookup() {
        let mut outputs = Map::new();
        outputs.insert("t1".into(), json!({"x": 1}));
        let run = PipelineRunResult::completed(outputs, vec![NodeExecutionResult::skipped("a1")]);

        assert!(run.is_completed());
        assert_eq!(run.output("t1"), Some(&json!({"x": 1})));
        assert_eq!(run.node_result("a1").unwrap().status, NodeStatus::Skipped);
        assert!(run.node_result("missing").is_none());
    }

    #[test]
    fn test_run_result_serializes_without_null_error() {
        let run = PipelineRunResult::completed(Map::new(), Vec::new());
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value, json!({"status": "completed", "outputs": {}, "node_results": []}));
    }
}
