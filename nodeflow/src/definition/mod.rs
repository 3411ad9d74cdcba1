//! Typed pipeline definitions.
//!
//! A pipeline is stored as two JSON arrays, one of nodes and one of edges.
//! [`parse_pipeline_definition`] turns them into a [`PipelineDefinition`];
//! [`PipelineBuilder`] builds one in code.

mod builder;
mod edge;
mod node;
mod node_config;

pub use builder::PipelineBuilder;
pub use edge::Edge;
pub use node::{Node, NodeType};
pub use node_config::{ActionConfig, AgentConfig, ConditionConfig, DelayConfig};

use crate::errors::ParseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A pipeline graph: nodes in declaration order plus directed edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Nodes in declaration order.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Directed edges.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl PipelineDefinition {
    /// Creates a definition from nodes and edges.
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Returns a map from node id to node.
    #[must_use]
    pub fn node_map(&self) -> HashMap<&str, &Node> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns true if a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Iterates over trigger nodes in declaration order.
    pub fn triggers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.node_type == NodeType::Trigger)
    }

    /// Parses a `{"nodes": [...], "edges": [...]}` JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Document`] if the text is not a JSON object with
    /// array-valued `nodes`/`edges`, or a node/edge error as in
    /// [`parse_pipeline_definition`].
    pub fn from_json_str(text: &str) -> Result<Self, ParseError> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| ParseError::Document(e.to_string()))?;

        let nodes = array_field(&document, "nodes")?;
        let edges = array_field(&document, "edges")?;
        parse_pipeline_definition(nodes, edges)
    }
}

fn array_field<'a>(document: &'a Value, key: &str) -> Result<&'a [Value], ParseError> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ParseError::Document(format!("'{key}' must be an array"))),
    }
}

/// Parses stored node and edge JSON into a typed definition.
///
/// # Errors
///
/// Returns [`ParseError::Node`] for a malformed node or an unknown node
/// type, and [`ParseError::Edge`] for a malformed edge.
pub fn parse_pipeline_definition(
    nodes_json: &[Value],
    edges_json: &[Value],
) -> Result<PipelineDefinition, ParseError> {
    let nodes = nodes_json
        .iter()
        .map(parse_node)
        .collect::<Result<Vec<_>, _>>()?;

    let edges = edges_json
        .iter()
        .map(|raw| {
            serde_json::from_value::<Edge>(raw.clone()).map_err(|e| ParseError::Edge(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PipelineDefinition::new(nodes, edges))
}

fn parse_node(raw: &Value) -> Result<Node, ParseError> {
    // Check the type first so the error names the node and the valid set.
    if let Some(type_name) = raw.get("type").and_then(Value::as_str) {
        if type_name.parse::<NodeType>().is_err() {
            let id = raw.get("id").and_then(Value::as_str).unwrap_or("?");
            return Err(ParseError::Node(format!(
                "Node '{id}' has unknown type '{type_name}'. Valid types: {}",
                NodeType::valid_names().join(", ")
            )));
        }
    }

    serde_json::from_value(raw.clone()).map_err(|e| ParseError::Node(e.to_string()))
}
