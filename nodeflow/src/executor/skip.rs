//! Skip propagation below a false condition.

use crate::validation::Adjacency;
use std::collections::{HashSet, VecDeque};

/// Marks the nodes that are only reachable through a false condition.
///
/// The condition itself completed and is not marked; it only counts as a
/// skip source. A successor is marked when every one of its predecessors is
/// a skip source, and marked nodes become skip sources in turn.
pub fn mark_downstream_skipped(
    condition_id: &str,
    adjacency: &Adjacency,
    skipped: &mut HashSet<String>,
) {
    let mut sources: HashSet<String> = skipped.clone();
    sources.insert(condition_id.to_string());

    let mut queue: VecDeque<&String> = adjacency.successors(condition_id).iter().collect();
    while let Some(candidate) = queue.pop_front() {
        if skipped.contains(candidate) {
            continue;
        }
        let preds = adjacency.predecessors(candidate);
        if !preds.is_empty() && preds.iter().all(|p| sources.contains(p)) {
            skipped.insert(candidate.clone());
            sources.insert(candidate.clone());
            queue.extend(adjacency.successors(candidate));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Node, PipelineBuilder};

    fn skipped_below(builder: PipelineBuilder, condition: &str) -> HashSet<String> {
        let adjacency = Adjacency::build(&builder.build());
        let mut skipped = HashSet::new();
        mark_downstream_skipped(condition, &adjacency, &mut skipped);
        skipped
    }

    #[test]
    fn test_chain_below_condition() {
        let builder = PipelineBuilder::new()
            .node(Node::condition("c", "false"))
            .node(Node::action("a", "noop"))
            .node(Node::action("b", "noop"))
            .connect("c", "a")
            .connect("a", "b");

        let skipped = skipped_below(builder, "c");
        assert!(skipped.contains("a"));
        assert!(skipped.contains("b"));
        assert!(!skipped.contains("c"));
    }

    #[test]
    fn test_join_with_live_branch_not_skipped() {
        let builder = PipelineBuilder::new()
            .node(Node::trigger("t"))
            .node(Node::condition("c", "false"))
            .node(Node::action("a", "noop"))
            .node(Node::action("join", "noop"))
            .connect("t", "c")
            .connect("c", "a")
            .connect("a", "join")
            .connect("t", "join");

        let skipped = skipped_below(builder, "c");
        assert!(skipped.contains("a"));
        assert!(!skipped.contains("join"));
    }

    #[test]
    fn test_existing_skips_count_as_sources() {
        let definition = PipelineBuilder::new()
            .node(Node::condition("c1", "false"))
            .node(Node::condition("c2", "false"))
            .node(Node::action("x", "noop"))
            .node(Node::action("y", "noop"))
            .node(Node::action("join", "noop"))
            .connect("c1", "x")
            .connect("c2", "y")
            .connect("x", "join")
            .connect("y", "join")
            .build();
        let adjacency = Adjacency::build(&definition);
        let mut skipped = HashSet::new();

        mark_downstream_skipped("c1", &adjacency, &mut skipped);
        assert!(skipped.contains("x"));
        assert!(!skipped.contains("join"));

        mark_downstream_skipped("c2", &adjacency, &mut skipped);
        assert!(skipped.contains("y"));
        assert!(skipped.contains("join"));
    }
}
