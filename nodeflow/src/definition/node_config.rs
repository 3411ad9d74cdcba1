//! Typed views over a node's free-form config map.

use super::Node;
use crate::errors::NodeError;
use serde_json::{Map, Value};

/// Config of an `agent` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Registry key of the agent. Numeric ids are stringified.
    pub agent_id: String,
    /// Task text sent to the agent.
    pub task: String,
}

impl AgentConfig {
    /// Extracts the agent config from a node.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if `agent_id` is missing or not a
    /// string or number.
    pub fn from_node(node: &Node) -> Result<Self, NodeError> {
        let agent_id = match node.config.get("agent_id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(Value::Null) | None => {
                return Err(NodeError::config(format!(
                    "Agent node '{}' missing 'agent_id' in config",
                    node.id
                )))
            }
            Some(other) => {
                return Err(NodeError::config(format!(
                    "Agent node '{}' has invalid 'agent_id': {other}",
                    node.id
                )))
            }
        };
        let task = node.config_str("task").unwrap_or_default().to_string();

        Ok(Self { agent_id, task })
    }
}

/// Config of a `condition` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionConfig {
    /// Expression evaluated by the condition interpreter.
    pub condition: String,
}

impl ConditionConfig {
    /// Extracts the condition config from a node. A missing expression
    /// defaults to `"true"`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if `condition` is not a string.
    pub fn from_node(node: &Node) -> Result<Self, NodeError> {
        match node.config.get("condition") {
            None | Some(Value::Null) => Ok(Self {
                condition: "true".to_string(),
            }),
            Some(Value::String(condition)) => Ok(Self {
                condition: condition.clone(),
            }),
            Some(other) => Err(NodeError::config(format!(
                "Condition node '{}' has non-string 'condition': {other}",
                node.id
            ))),
        }
    }
}

/// Config of an `action` node.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionConfig {
    /// Action name, `"unknown"` when absent.
    pub action: String,
    /// Remaining config entries, handed to the action handler.
    pub params: Map<String, Value>,
}

impl ActionConfig {
    /// Extracts the action config from a node.
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        let action = node.config_str("action").unwrap_or("unknown").to_string();
        let params = node
            .config
            .iter()
            .filter(|(key, _)| key.as_str() != "action")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self { action, params }
    }
}

/// Config of a `delay` node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayConfig {
    /// Seconds to wait. Zero means no wait.
    pub seconds: f64,
}

impl DelayConfig {
    /// Extracts the delay config from a node. A missing value means zero.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if `seconds` is not a finite,
    /// non-negative number.
    pub fn from_node(node: &Node) -> Result<Self, NodeError> {
        let seconds = match node.config.get("seconds") {
            None | Some(Value::Null) => 0.0,
            Some(value) => value.as_f64().ok_or_else(|| {
                NodeError::config(format!(
                    "Delay node '{}' has non-numeric 'seconds': {value}",
                    node.id
                ))
            })?,
        };

        if !seconds.is_finite() || seconds < 0.0 {
            return Err(NodeError::config(format!(
                "Delay node '{}' has invalid 'seconds': {seconds}",
                node.id
            )));
        }

        Ok(Self { seconds })
    }
}
