//! Agent node handler.

use super::{display_value, NodeInputs};
use crate::context::ExecutionContext;
use crate::definition::{AgentConfig, Node};
use crate::errors::NodeError;
use serde_json::{json, Value};
use tracing::info;

/// Builds the prompt sent to an agent: the task, followed by a summary of
/// predecessor outputs when there are any.
#[must_use]
pub fn build_prompt(task: &str, inputs: &NodeInputs) -> String {
    if inputs.is_empty() {
        return task.to_string();
    }
    let summary = inputs
        .iter()
        .map(|(id, value)| format!("{id}: {}", display_value(value)))
        .collect::<Vec<_>>()
        .join("; ");
    format!("{task}\n\nContext from previous nodes:\n{summary}")
}

pub(super) async fn run(
    node: &Node,
    inputs: &NodeInputs,
    context: &ExecutionContext,
) -> Result<Value, NodeError> {
    let AgentConfig { agent_id, task } = AgentConfig::from_node(node)?;

    if let Some(registry) = &context.agent_registry {
        let failed = |e: anyhow::Error| NodeError::execution(format!("Agent node '{}' failed: {e}", node.id));

        if let Some(agent) = registry.get(&agent_id).map_err(failed)? {
            let prompt = build_prompt(&task, inputs);
            let reply = agent.process_message(&prompt).await.map_err(failed)?;
            return Ok(json!({
                "result": reply,
                "agent_id": agent_id,
                "simulated": false,
            }));
        }
    }

    info!(
        node_id = %node.id,
        agent_id = %agent_id,
        "No agent registry or agent not found, returning simulated result"
    );
    Ok(json!({
        "result": format!("Agent {agent_id} task: {task}"),
        "agent_id": agent_id,
        "simulated": true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoAgent, FailingAgent, StaticAgentRegistry};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_prompt_without_inputs() {
        assert_eq!(build_prompt("summarize", &NodeInputs::new()), "summarize");
    }

    #[test]
    fn test_prompt_with_inputs() {
        let mut inputs = NodeInputs::new();
        inputs.insert("t1".into(), json!("hello"));
        inputs.insert("t2".into(), json!({"n": 1}));

        assert_eq!(
            build_prompt("summarize", &inputs),
            "summarize\n\nContext from previous nodes:\nt1: hello; t2: {\"n\":1}"
        );
    }

    #[tokio::test]
    async fn test_simulated_without_registry() {
        let node = Node::agent("a1", "writer", "draft");
        let output = run(&node, &NodeInputs::new(), &ExecutionContext::new()).await.unwrap();

        assert_eq!(
            output,
            json!({"result": "Agent writer task: draft", "agent_id": "writer", "simulated": true})
        );
    }

    #[tokio::test]
    async fn test_simulated_when_agent_unknown() {
        let registry = StaticAgentRegistry::new();
        let context = ExecutionContext::new().with_agent_registry(Arc::new(registry));
        let node = Node::agent("a1", "ghost", "draft");

        let output = run(&node, &NodeInputs::new(), &context).await.unwrap();
        assert_eq!(output["simulated"], json!(true));
    }

    #[tokio::test]
    async fn test_registered_agent_receives_prompt() {
        let registry = StaticAgentRegistry::new().with_agent("writer", Arc::new(EchoAgent));
        let context = ExecutionContext::new().with_agent_registry(Arc::new(registry));
        let node = Node::agent("a1", "writer", "draft");
        let mut inputs = NodeInputs::new();
        inputs.insert("t1".into(), json!("topic"));

        let output = run(&node, &inputs, &context).await.unwrap();
        assert_eq!(output["simulated"], json!(false));
        assert_eq!(
            output["result"],
            json!("echo: draft\n\nContext from previous nodes:\nt1: topic")
        );
    }

    #[tokio::test]
    async fn test_agent_failure_is_retryable() {
        let registry = StaticAgentRegistry::new().with_agent("writer", Arc::new(FailingAgent::new("quota exceeded")));
        let context = ExecutionContext::new().with_agent_registry(Arc::new(registry));
        let node = Node::agent("a1", "writer", "draft");

        let err = run(&node, &NodeInputs::new(), &context).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Agent node 'a1' failed: quota exceeded");
    }
}
