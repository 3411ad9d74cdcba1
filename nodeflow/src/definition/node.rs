//! Pipeline nodes and their closed set of kinds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The kind of work a node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Entry point; its output is seeded with the run's trigger data.
    Trigger,
    /// Hands a task to an agent from the agent registry.
    Agent,
    /// Evaluates a boolean expression; `false` skips the branch below it.
    Condition,
    /// Performs a side effect.
    Action,
    /// Structural fan-out/fan-in marker; passes inputs through.
    Parallel,
    /// Waits for `config.seconds`, then passes inputs through.
    Delay,
}

impl NodeType {
    /// Every node type, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Trigger,
        Self::Agent,
        Self::Condition,
        Self::Action,
        Self::Parallel,
        Self::Delay,
    ];

    /// Returns the wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Agent => "agent",
            Self::Condition => "condition",
            Self::Action => "action",
            Self::Parallel => "parallel",
            Self::Delay => "delay",
        }
    }

    /// Returns the wire names of all types, sorted.
    #[must_use]
    pub fn valid_names() -> Vec<&'static str> {
        let mut names: Vec<_> = Self::ALL.iter().map(Self::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown node type '{s}'"))
    }
}

/// A node in a pipeline DAG.
///
/// `config` stays a free-form map so stored graphs round-trip untouched;
/// typed views are extracted on demand (see [`super::AgentConfig`] and
/// friends).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node id within the pipeline.
    pub id: String,
    /// The node kind.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Display name.
    pub name: String,
    /// Type-specific configuration.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Editor canvas position. Never read by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
    /// Legacy successor hints. Edges are authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Vec<String>>,
}

impl Node {
    /// Creates a node with an empty config and a default name.
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        let id = id.into();
        Self {
            name: format!("Node {id}"),
            id,
            node_type,
            config: Map::new(),
            position: None,
            next: None,
        }
    }

    /// Creates a trigger node.
    #[must_use]
    pub fn trigger(id: impl Into<String>) -> Self {
        Self::new(id, NodeType::Trigger)
    }

    /// Creates an agent node.
    #[must_use]
    pub fn agent(id: impl Into<String>, agent_id: impl Into<String>, task: impl Into<String>) -> Self {
        Self::new(id, NodeType::Agent)
            .with_config("agent_id", Value::String(agent_id.into()))
            .with_config("task", Value::String(task.into()))
    }

    /// Creates a condition node.
    #[must_use]
    pub fn condition(id: impl Into<String>, condition: impl Into<String>) -> Self {
        Self::new(id, NodeType::Condition).with_config("condition", Value::String(condition.into()))
    }

    /// Creates an action node.
    #[must_use]
    pub fn action(id: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(id, NodeType::Action).with_config("action", Value::String(action.into()))
    }

    /// Creates a parallel node.
    #[must_use]
    pub fn parallel(id: impl Into<String>) -> Self {
        Self::new(id, NodeType::Parallel)
    }

    /// Creates a delay node.
    #[must_use]
    pub fn delay(id: impl Into<String>, seconds: f64) -> Self {
        Self::new(id, NodeType::Delay).with_config("seconds", serde_json::json!(seconds))
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a config entry.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Returns a string config entry.
    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// Returns the per-node circuit breaker threshold override, if set.
    #[must_use]
    pub fn failure_threshold(&self) -> Option<u32> {
        self.config
            .get("failure_threshold")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Returns true for condition nodes, whose failures never abort a run.
    #[must_use]
    pub fn is_condition(&self) -> bool {
        self.node_type == NodeType::Condition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_type_round_trip() {
        for node_type in NodeType::ALL {
            assert_eq!(node_type.as_str().parse::<NodeType>().unwrap(), node_type);
        }
        assert!("loop".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_valid_names_sorted() {
        assert_eq!(
            NodeType::valid_names(),
            vec!["action", "agent", "condition", "delay", "parallel", "trigger"]
        );
    }

    #[test]
    fn test_constructors_fill_config() {
        let node = Node::agent("a1", "writer", "draft a summary");
        assert_eq!(node.node_type, NodeType::Agent);
        assert_eq!(node.name, "Node a1");
        assert_eq!(node.config_str("agent_id"), Some("writer"));
        assert_eq!(node.config_str("task"), Some("draft a summary"));

        let node = Node::delay("d1", 1.5);
        assert_eq!(node.config.get("seconds"), Some(&json!(1.5)));
    }

    #[test]
    fn test_failure_threshold_override() {
        let node = Node::action("act1", "notify").with_config("failure_threshold", json!(2));
        assert_eq!(node.failure_threshold(), Some(2));
        assert_eq!(Node::trigger("t1").failure_threshold(), None);
    }

    #[test]
    fn test_deserialize_with_type_key() {
        let node: Node = serde_json::from_value(json!({
            "id": "c1",
            "type": "condition",
            "name": "Check",
            "config": {"condition": "true"},
            "position": {"x": 10, "y": 20}
        }))
        .unwrap();

        assert!(node.is_condition());
        assert_eq!(node.position, Some(json!({"x": 10, "y": 20})));
        assert!(node.next.is_none());
    }
}
