//! Adjacency maps and topological ordering of pipeline graphs.

use crate::definition::PipelineDefinition;
use crate::errors::CycleDetectedError;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Predecessor and successor lists for every node.
///
/// Lists follow edge declaration order with duplicates removed. Edges whose
/// endpoints are not nodes of the definition are ignored.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    predecessors: HashMap<String, Vec<String>>,
    successors: HashMap<String, Vec<String>>,
}

impl Adjacency {
    /// Builds the adjacency maps of a definition.
    #[must_use]
    pub fn build(definition: &PipelineDefinition) -> Self {
        let mut predecessors: HashMap<String, Vec<String>> = definition
            .nodes
            .iter()
            .map(|n| (n.id.clone(), Vec::new()))
            .collect();
        let mut successors = predecessors.clone();

        for edge in &definition.edges {
            if !predecessors.contains_key(&edge.from_node) || !predecessors.contains_key(&edge.to_node) {
                continue;
            }
            if let Some(preds) = predecessors.get_mut(&edge.to_node) {
                if !preds.contains(&edge.from_node) {
                    preds.push(edge.from_node.clone());
                }
            }
            if let Some(succs) = successors.get_mut(&edge.from_node) {
                if !succs.contains(&edge.to_node) {
                    succs.push(edge.to_node.clone());
                }
            }
        }

        Self {
            predecessors,
            successors,
        }
    }

    /// Returns the predecessors of a node.
    #[must_use]
    pub fn predecessors(&self, node_id: &str) -> &[String] {
        self.predecessors.get(node_id).map_or(&[][..], Vec::as_slice)
    }

    /// Returns the successors of a node.
    #[must_use]
    pub fn successors(&self, node_id: &str) -> &[String] {
        self.successors.get(node_id).map_or(&[][..], Vec::as_slice)
    }
}

/// Returns node ids in an order where every node follows all of its
/// predecessors.
///
/// Among nodes that are ready at the same time, the one declared first runs
/// first, so the order is deterministic for a given definition.
///
/// # Errors
///
/// Returns [`CycleDetectedError`] with one cycle path if the graph is not
/// acyclic.
pub fn execution_order(definition: &PipelineDefinition) -> Result<Vec<String>, CycleDetectedError> {
    let adjacency = Adjacency::build(definition);

    // A repeated id collapses onto its first declaration.
    let mut ids: Vec<&str> = Vec::with_capacity(definition.nodes.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(definition.nodes.len());
    for node in &definition.nodes {
        index.entry(node.id.as_str()).or_insert_with(|| {
            ids.push(node.id.as_str());
            ids.len() - 1
        });
    }

    let mut in_degree: Vec<usize> = ids
        .iter()
        .map(|id| adjacency.predecessors(id).len())
        .collect();

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(ids.len());
    while let Some(current) = ready.pop_first() {
        let node_id = ids[current];
        order.push(node_id.to_string());

        for successor in adjacency.successors(node_id) {
            if let Some(&i) = index.get(successor.as_str()) {
                in_degree[i] = in_degree[i].saturating_sub(1);
                if in_degree[i] == 0 {
                    ready.insert(i);
                }
            }
        }
    }

    if order.len() < ids.len() {
        let placed: HashSet<&str> = order.iter().map(String::as_str).collect();
        let remaining: Vec<&str> = ids
            .iter()
            .copied()
            .filter(|id| !placed.contains(id))
            .collect();
        let cycle = find_cycle(&adjacency, &remaining).unwrap_or_else(|| {
            remaining.iter().map(|id| (*id).to_string()).collect()
        });
        return Err(CycleDetectedError::new(cycle));
    }

    Ok(order)
}

/// Finds one cycle among `candidates`, returned with its first node repeated
/// at the end.
fn find_cycle(adjacency: &Adjacency, candidates: &[&str]) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut on_stack = HashSet::new();
    let mut path = Vec::new();

    candidates.iter().find_map(|start| {
        if visited.contains(*start) {
            None
        } else {
            dfs_cycle(adjacency, start, &mut visited, &mut on_stack, &mut path)
        }
    })
}

fn dfs_cycle(
    adjacency: &Adjacency,
    node: &str,
    visited: &mut HashSet<String>,
    on_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    visited.insert(node.to_string());
    on_stack.insert(node.to_string());
    path.push(node.to_string());

    for next in adjacency.successors(node) {
        if on_stack.contains(next) {
            let start = path.iter().position(|n| n == next)?;
            let mut cycle = path[start..].to_vec();
            cycle.push(next.clone());
            return Some(cycle);
        }
        if !visited.contains(next) {
            if let Some(cycle) = dfs_cycle(adjacency, next, visited, on_stack, path) {
                return Some(cycle);
            }
        }
    }

    path.pop();
    on_stack.remove(node);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Node, PipelineBuilder};
    use pretty_assertions::assert_eq;

    fn actions(ids: &[&str]) -> PipelineBuilder {
        ids.iter()
            .fold(PipelineBuilder::new(), |b, id| b.node(Node::action(*id, "noop")))
    }

    #[test]
    fn test_linear_order() {
        let definition = actions(&["c", "b", "a"]).connect("a", "b").connect("b", "c").build();
        assert_eq!(execution_order(&definition).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let definition = actions(&["root", "z", "y", "x", "join"])
            .fan_out("root", &["x", "y", "z"])
            .fan_in(&["x", "y", "z"], "join")
            .build();

        assert_eq!(
            execution_order(&definition).unwrap(),
            vec!["root", "z", "y", "x", "join"]
        );
    }

    #[test]
    fn test_disconnected_nodes_included() {
        let definition = actions(&["a", "b"]).build();
        assert_eq!(execution_order(&definition).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_cycle_path_reported() {
        let definition = actions(&["start", "a", "b", "c"])
            .connect("start", "a")
            .connect("a", "b")
            .connect("b", "c")
            .connect("c", "a")
            .build();

        let err = execution_order(&definition).unwrap_err();
        assert_eq!(err.cycle_path, vec!["a", "b", "c", "a"]);
        assert_eq!(err.to_string(), "Pipeline contains a cycle: a -> b -> c -> a");
    }

    #[test]
    fn test_self_loop() {
        let definition = actions(&["a"]).connect("a", "a").build();
        assert_eq!(execution_order(&definition).unwrap_err().cycle_path, vec!["a", "a"]);
    }

    #[test]
    fn test_duplicate_ids_collapse_to_first_declaration() {
        let definition = actions(&["a", "a", "b"]).connect("a", "b").build();
        assert_eq!(execution_order(&definition).unwrap(), vec!["a", "b"]);

        let definition = actions(&["b", "a", "b"]).connect("a", "b").build();
        assert_eq!(execution_order(&definition).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_adjacency_dedupes_and_ignores_unknown() {
        let definition = actions(&["a", "b"])
            .connect("a", "b")
            .connect("a", "b")
            .connect("a", "ghost")
            .build();
        let adjacency = Adjacency::build(&definition);

        assert_eq!(adjacency.successors("a"), ["b".to_string()]);
        assert_eq!(adjacency.predecessors("b"), ["a".to_string()]);
        assert!(adjacency.predecessors("ghost").is_empty());
    }
}
