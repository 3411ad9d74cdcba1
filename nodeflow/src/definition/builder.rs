//! Fluent construction of pipeline definitions.

use super::{Edge, Node, PipelineDefinition};
use crate::errors::PipelineValidationError;
use crate::validation::validate_pipeline_dag;

/// Builder for [`PipelineDefinition`]s.
///
/// Nodes keep insertion order, which is also the tie-break order of the
/// topological sort. Edges added with [`connect`](Self::connect) get ids
/// `e1`, `e2`, ... in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node.
    #[must_use]
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Adds a fully specified edge.
    #[must_use]
    pub fn edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Connects two nodes with an auto-numbered edge.
    #[must_use]
    pub fn connect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let id = format!("e{}", self.edges.len() + 1);
        self.edges.push(Edge::new(id, from, to));
        self
    }

    /// Connects `from` to every node in `targets`.
    #[must_use]
    pub fn fan_out(mut self, from: &str, targets: &[&str]) -> Self {
        for target in targets {
            self = self.connect(from, *target);
        }
        self
    }

    /// Connects every node in `sources` to `to`.
    #[must_use]
    pub fn fan_in(mut self, sources: &[&str], to: &str) -> Self {
        for source in sources {
            self = self.connect(*source, to);
        }
        self
    }

    /// Returns the number of nodes added so far.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Builds the definition without validating it.
    #[must_use]
    pub fn build(self) -> PipelineDefinition {
        PipelineDefinition::new(self.nodes, self.edges)
    }

    /// Builds the definition and runs the DAG validator on it.
    ///
    /// # Errors
    ///
    /// Returns every validation error found.
    pub fn build_validated(self) -> Result<PipelineDefinition, PipelineValidationError> {
        let definition = self.build();
        let errors = validate_pipeline_dag(&definition);
        if errors.is_empty() {
            Ok(definition)
        } else {
            Err(PipelineValidationError::from_errors(errors))
        }
    }
}
