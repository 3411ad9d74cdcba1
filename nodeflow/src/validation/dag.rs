//! Structural and per-type validation of pipeline definitions.

use super::topology::execution_order;
use crate::definition::{DelayConfig, NodeType, PipelineDefinition};
use crate::errors::PipelineValidationError;
use std::collections::HashSet;
use tracing::warn;

/// Validates a definition, returning every problem found. An empty list
/// means the definition can run.
///
/// Structural problems (no nodes, duplicate ids, dangling edges) are
/// reported on their own, without the cycle and config checks. Orphan
/// nodes are logged but are not errors. Unknown node types cannot reach
/// this point since they are rejected when the definition is parsed.
#[must_use]
pub fn validate_pipeline_dag(definition: &PipelineDefinition) -> Vec<String> {
    let mut errors = Vec::new();

    if definition.nodes.is_empty() {
        errors.push("Pipeline must have at least one node".to_string());
        return errors;
    }

    let mut node_ids = HashSet::new();
    for node in &definition.nodes {
        if !node_ids.insert(node.id.as_str()) {
            errors.push(format!("Duplicate node id '{}'", node.id));
        }
    }

    for edge in &definition.edges {
        if !node_ids.contains(edge.from_node.as_str()) {
            errors.push(format!(
                "Edge '{}' references unknown source node: '{}'",
                edge.id, edge.from_node
            ));
        }
        if !node_ids.contains(edge.to_node.as_str()) {
            errors.push(format!(
                "Edge '{}' references unknown target node: '{}'",
                edge.id, edge.to_node
            ));
        }
    }

    if !errors.is_empty() {
        return errors;
    }

    warn_orphans(definition);

    if let Err(cycle) = execution_order(definition) {
        errors.push(cycle.to_string());
    }

    for node in &definition.nodes {
        match node.node_type {
            NodeType::Agent => {
                for key in ["agent_id", "task"] {
                    if !node.config.contains_key(key) {
                        errors.push(format!(
                            "Agent node '{}' is missing required config key '{key}'",
                            node.id
                        ));
                    }
                }
            }
            NodeType::Condition => {
                if !node.config.contains_key("condition") {
                    errors.push(format!(
                        "Condition node '{}' is missing required config key 'condition'",
                        node.id
                    ));
                }
            }
            NodeType::Delay => {
                if let Err(e) = DelayConfig::from_node(node) {
                    errors.push(e.to_string());
                }
            }
            NodeType::Trigger | NodeType::Action | NodeType::Parallel => {}
        }
    }

    errors
}

/// Validates a definition, folding all problems into one error.
///
/// # Errors
///
/// Returns a [`PipelineValidationError`] listing every problem found.
pub fn ensure_valid(definition: &PipelineDefinition) -> Result<(), PipelineValidationError> {
    let errors = validate_pipeline_dag(definition);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PipelineValidationError::from_errors(errors))
    }
}

fn warn_orphans(definition: &PipelineDefinition) {
    let connected: HashSet<&str> = definition
        .edges
        .iter()
        .flat_map(|e| [e.from_node.as_str(), e.to_node.as_str()])
        .collect();

    for node in &definition.nodes {
        if node.node_type != NodeType::Trigger && !connected.contains(node.id.as_str()) {
            warn!(
                node_id = %node.id,
                node_type = %node.node_type,
                "Orphan node '{}' (type={}) has no edges and is not a trigger node",
                node.id,
                node.node_type
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Edge, Node, PipelineBuilder};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_pipeline() {
        assert_eq!(
            validate_pipeline_dag(&PipelineDefinition::default()),
            vec!["Pipeline must have at least one node"]
        );
    }

    #[test]
    fn test_dangling_edges_stop_further_checks() {
        let definition = PipelineBuilder::new()
            .node(Node::new("a1", NodeType::Agent))
            .edge(Edge::new("e1", "ghost", "a1"))
            .edge(Edge::new("e2", "a1", "void"))
            .build();

        assert_eq!(
            validate_pipeline_dag(&definition),
            vec![
                "Edge 'e1' references unknown source node: 'ghost'",
                "Edge 'e2' references unknown target node: 'void'",
            ]
        );
    }

    #[test]
    fn test_duplicate_node_ids() {
        let definition = PipelineBuilder::new()
            .node(Node::trigger("t1"))
            .node(Node::trigger("t1"))
            .build();

        assert_eq!(validate_pipeline_dag(&definition), vec!["Duplicate node id 't1'"]);
    }

    #[test]
    fn test_cycle_and_config_errors_accumulate() {
        let definition = PipelineBuilder::new()
            .node(Node::new("a1", NodeType::Agent).with_config("task", json!("x")))
            .node(Node::new("c1", NodeType::Condition))
            .connect("a1", "c1")
            .connect("c1", "a1")
            .build();

        let errors = validate_pipeline_dag(&definition);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("cycle"));
        assert_eq!(errors[1], "Agent node 'a1' is missing required config key 'agent_id'");
        assert_eq!(
            errors[2],
            "Condition node 'c1' is missing required config key 'condition'"
        );
    }

    #[test]
    fn test_bad_delay_seconds() {
        let definition = PipelineBuilder::new()
            .node(Node::delay("d1", -2.0))
            .build();

        let errors = validate_pipeline_dag(&definition);
        assert_eq!(errors, vec!["Delay node 'd1' has invalid 'seconds': -2"]);
    }

    #[test]
    fn test_orphans_are_not_errors() {
        let definition = PipelineBuilder::new()
            .node(Node::trigger("t1"))
            .node(Node::action("lonely", "noop"))
            .build();

        assert!(validate_pipeline_dag(&definition).is_empty());
        assert!(ensure_valid(&definition).is_ok());
    }

    #[test]
    fn test_ensure_valid_joins_errors() {
        let definition = PipelineBuilder::new()
            .node(Node::new("a1", NodeType::Agent))
            .build();

        let err = ensure_valid(&definition).unwrap_err();
        assert_eq!(
            err.message,
            "Validation failed: Agent node 'a1' is missing required config key 'agent_id'; \
             Agent node 'a1' is missing required config key 'task'"
        );
    }
}
