//! Per-kind node handlers.
//!
//! [`dispatch_node`] picks a handler with an exhaustive match on
//! [`NodeType`]; adding a node kind fails to compile until it has one.

pub mod action;
pub mod agent;
pub mod condition;

use crate::cancellation::CancellationToken;
use crate::context::ExecutionContext;
use crate::definition::{DelayConfig, Node, NodeType};
use crate::errors::NodeError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

/// Outputs of a node's non-skipped predecessors, keyed by predecessor id.
pub type NodeInputs = Map<String, Value>;

/// Executes a single node.
///
/// The executor calls this once per attempt. Implementations return
/// [`NodeError::Execution`] for failures worth retrying.
#[async_trait]
pub trait NodeDispatcher: Send + Sync {
    /// Runs `node` with the outputs of its predecessors.
    ///
    /// # Errors
    ///
    /// Returns a [`NodeError`] describing why the node failed.
    async fn dispatch(
        &self,
        node: &Node,
        inputs: &NodeInputs,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Value, NodeError>;
}

/// The built-in handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDispatcher;

#[async_trait]
impl NodeDispatcher for DefaultDispatcher {
    async fn dispatch(
        &self,
        node: &Node,
        inputs: &NodeInputs,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Value, NodeError> {
        dispatch_node(node, inputs, context, cancel).await
    }
}

/// Runs the built-in handler for `node`'s type.
///
/// # Errors
///
/// Returns the handler's error.
pub async fn dispatch_node(
    node: &Node,
    inputs: &NodeInputs,
    context: &ExecutionContext,
    cancel: &CancellationToken,
) -> Result<Value, NodeError> {
    match node.node_type {
        NodeType::Trigger | NodeType::Parallel => Ok(Value::Object(inputs.clone())),
        NodeType::Agent => agent::run(node, inputs, context).await,
        NodeType::Condition => condition::run(node, inputs),
        NodeType::Action => action::run(node, inputs, context).await,
        NodeType::Delay => run_delay(node, inputs, cancel).await,
    }
}

async fn run_delay(
    node: &Node,
    inputs: &NodeInputs,
    cancel: &CancellationToken,
) -> Result<Value, NodeError> {
    let DelayConfig { seconds } = DelayConfig::from_node(node)?;
    if seconds > 0.0 {
        let duration = Duration::try_from_secs_f64(seconds).map_err(|e| {
            NodeError::config(format!("Delay node '{}' has invalid 'seconds': {e}", node.id))
        })?;
        if !cancel.sleep(duration).await {
            return Err(NodeError::Cancelled);
        }
    }
    Ok(Value::Object(inputs.clone()))
}

/// Renders a value for prompts and summaries. Strings are shown without
/// quotes, everything else as compact JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Instant;

    fn sample_inputs() -> NodeInputs {
        let mut inputs = NodeInputs::new();
        inputs.insert("t1".into(), json!({"topic": "rust"}));
        inputs
    }

    #[tokio::test]
    async fn test_passthrough_kinds() {
        let ctx = ExecutionContext::new();
        let cancel = CancellationToken::new();

        for node in [Node::trigger("t"), Node::parallel("p"), Node::delay("d", 0.0)] {
            let output = dispatch_node(&node, &sample_inputs(), &ctx, &cancel).await.unwrap();
            assert_eq!(output, json!({"t1": {"topic": "rust"}}));
        }
    }

    #[tokio::test]
    async fn test_delay_waits() {
        let start = Instant::now();
        let output = dispatch_node(
            &Node::delay("d", 0.05),
            &NodeInputs::new(),
            &ExecutionContext::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(output, json!({}));
    }

    #[tokio::test]
    async fn test_delay_cancelled() {
        let cancel = Arc::new(CancellationToken::new());
        let trigger = Arc::clone(&cancel);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel("stop");
        });

        let err = dispatch_node(
            &Node::delay("d", 30.0),
            &NodeInputs::new(),
            &ExecutionContext::new(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert_eq!(err, NodeError::Cancelled);
    }

    #[tokio::test]
    async fn test_default_dispatcher_delegates() {
        let output = DefaultDispatcher
            .dispatch(
                &Node::condition("c", "false"),
                &NodeInputs::new(),
                &ExecutionContext::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(output, json!({"result": false}));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("plain")), "plain");
        assert_eq!(display_value(&json!(3)), "3");
        assert_eq!(display_value(&json!(null)), "null");
    }
}
