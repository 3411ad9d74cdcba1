//! Action node handler.

use super::{display_value, NodeInputs};
use crate::context::ExecutionContext;
use crate::definition::{ActionConfig, Node};
use crate::errors::NodeError;
use serde_json::{Map, Value};
use tracing::{info, warn};

const MAX_INPUT_CHARS: usize = 200;

/// Renders each input as a string of at most 200 characters.
#[must_use]
pub fn summarize_inputs(inputs: &NodeInputs) -> Map<String, Value> {
    inputs
        .iter()
        .map(|(id, value)| {
            let text: String = display_value(value).chars().take(MAX_INPUT_CHARS).collect();
            (id.clone(), Value::String(text))
        })
        .collect()
}

pub(super) async fn run(
    node: &Node,
    inputs: &NodeInputs,
    context: &ExecutionContext,
) -> Result<Value, NodeError> {
    let ActionConfig { action, params } = ActionConfig::from_node(node);
    info!(node_id = %node.id, action = %action, "Executing action");

    match action.as_str() {
        "execute_pipeline" => {
            return Err(NodeError::config(format!(
                "Nested pipeline execution not supported from action node '{}'",
                node.id
            )));
        }
        "call_api" if !params.get("url").is_some_and(|url| !url.is_null()) => {
            return Err(NodeError::config(format!(
                "Action node '{}' with action 'call_api' missing 'url' in config",
                node.id
            )));
        }
        _ => {}
    }

    let mut output = Map::new();
    output.insert("action".into(), Value::String(action.clone()));
    output.insert("executed".into(), Value::Bool(true));

    let handled = match &context.action_handler {
        Some(handler) => handler.handle(&action, &params).await,
        None => None,
    };

    match handled {
        Some(Ok(Value::Object(fields))) => output.extend(fields),
        Some(Ok(other)) => {
            output.insert("result".into(), other);
        }
        Some(Err(e)) => {
            return Err(NodeError::execution(format!(
                "Action '{action}' failed in node '{}': {e}",
                node.id
            )));
        }
        None => {
            if context.action_handler.is_some() {
                warn!(node_id = %node.id, action = %action, "Unknown action type, returning metadata only");
            }
            output.insert("inputs".into(), Value::Object(summarize_inputs(inputs)));
        }
    }

    Ok(Value::Object(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActionHandler;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    struct NotifyHandler;

    #[async_trait]
    impl ActionHandler for NotifyHandler {
        async fn handle(
            &self,
            action: &str,
            params: &Map<String, Value>,
        ) -> Option<anyhow::Result<Value>> {
            match action {
                "notify" => Some(Ok(json!({"sent_to": params.get("channel").cloned()}))),
                "explode" => Some(Err(anyhow::anyhow!("webhook returned 503"))),
                _ => None,
            }
        }
    }

    #[tokio::test]
    async fn test_default_output_summarizes_inputs() {
        let mut inputs = NodeInputs::new();
        inputs.insert("t1".into(), json!({"x": 1}));
        inputs.insert("a1".into(), json!("y".repeat(500)));

        let output = run(&Node::action("act1", "log"), &inputs, &ExecutionContext::new())
            .await
            .unwrap();

        assert_eq!(output["action"], json!("log"));
        assert_eq!(output["executed"], json!(true));
        assert_eq!(output["inputs"]["t1"], json!("{\"x\":1}"));
        assert_eq!(output["inputs"]["a1"].as_str().unwrap().chars().count(), 200);
    }

    #[tokio::test]
    async fn test_missing_action_is_unknown() {
        let node = Node::new("act1", crate::definition::NodeType::Action);
        let output = run(&node, &NodeInputs::new(), &ExecutionContext::new()).await.unwrap();
        assert_eq!(output, json!({"action": "unknown", "executed": true, "inputs": {}}));
    }

    #[tokio::test]
    async fn test_nested_pipeline_rejected() {
        let err = run(
            &Node::action("act1", "execute_pipeline"),
            &NodeInputs::new(),
            &ExecutionContext::new(),
        )
        .await
        .unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Nested pipeline execution not supported from action node 'act1'"
        );
    }

    #[tokio::test]
    async fn test_call_api_requires_url() {
        let err = run(&Node::action("act1", "call_api"), &NodeInputs::new(), &ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[tokio::test]
    async fn test_handler_result_merged() {
        let context = ExecutionContext::new().with_action_handler(Arc::new(NotifyHandler));
        let node = Node::action("act1", "notify").with_config("channel", json!("#ops"));

        let output = run(&node, &NodeInputs::new(), &context).await.unwrap();
        assert_eq!(output, json!({"action": "notify", "executed": true, "sent_to": "#ops"}));
    }

    #[tokio::test]
    async fn test_handler_error_is_retryable() {
        let context = ExecutionContext::new().with_action_handler(Arc::new(NotifyHandler));
        let err = run(&Node::action("act1", "explode"), &NodeInputs::new(), &context)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(err.to_string().contains("webhook returned 503"));
    }

    #[tokio::test]
    async fn test_unhandled_action_falls_back() {
        let context = ExecutionContext::new().with_action_handler(Arc::new(NotifyHandler));
        let output = run(&Node::action("act1", "archive"), &NodeInputs::new(), &context)
            .await
            .unwrap();
        assert_eq!(output["inputs"], json!({}));
    }
}
