//! Directed edges between pipeline nodes.

use serde::{Deserialize, Serialize};

/// An edge connecting two pipeline nodes.
///
/// Stored JSON uses `"from"` and `"to"`; `"from_node"` and `"to_node"` are
/// accepted on input as well. Serialization always writes `"from"`/`"to"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Edge id.
    pub id: String,
    /// Source node id.
    #[serde(rename = "from", alias = "from_node")]
    pub from_node: String,
    /// Target node id.
    #[serde(rename = "to", alias = "to_node")]
    pub to_node: String,
    /// Informational label. Branching is decided by condition nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Edge {
    /// Creates an edge without a label.
    #[must_use]
    pub fn new(id: impl Into<String>, from_node: impl Into<String>, to_node: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from_node: from_node.into(),
            to_node: to_node.into(),
            condition: None,
        }
    }

    /// Sets the informational condition label.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}
