//! Ready-made contexts, policies and graphs for tests.

use std::sync::Arc;
use std::time::Duration;

use super::{CollectingEventSink, RecordingDatabase};
use crate::context::ExecutionContext;
use crate::definition::{Node, PipelineBuilder, PipelineDefinition};
use crate::executor::RetryPolicy;

/// A retry policy with millisecond backoff.
#[must_use]
pub fn fast_retry_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_millis(5))
}

/// An execution context wired to a collecting sink and a recording
/// database, returned alongside both.
#[must_use]
pub fn recording_context() -> (ExecutionContext, Arc<CollectingEventSink>, Arc<RecordingDatabase>) {
    let sink = Arc::new(CollectingEventSink::new());
    let db = Arc::new(RecordingDatabase::new());
    let context = ExecutionContext::new()
        .with_event_bus(Arc::clone(&sink) as _)
        .with_db(Arc::clone(&db) as _);
    (context, sink, db)
}

/// `t1 (trigger) -> a1 (agent)`.
#[must_use]
pub fn trigger_agent_definition() -> PipelineDefinition {
    PipelineBuilder::new()
        .node(Node::trigger("t1"))
        .node(Node::agent("a1", "writer", "draft"))
        .connect("t1", "a1")
        .build()
}

/// A chain of action nodes `n0 -> n1 -> ...` of the given length.
#[must_use]
pub fn action_chain(len: usize) -> PipelineDefinition {
    let mut builder = PipelineBuilder::new();
    for i in 0..len {
        builder = builder.node(Node::action(format!("n{i}"), "noop"));
    }
    for i in 1..len {
        builder = builder.connect(format!("n{}", i - 1), format!("n{i}"));
    }
    builder.build()
}
