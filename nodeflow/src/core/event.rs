//! Lifecycle event types emitted during pipeline runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pipeline lifecycle event.
///
/// The wire names (`pipeline_run.*`, `pipeline_node.*`) are what event bus
/// subscribers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// A run passed validation and began executing.
    #[serde(rename = "pipeline_run.started")]
    RunStarted,
    /// A run finished with every reachable node completed.
    #[serde(rename = "pipeline_run.completed")]
    RunCompleted,
    /// A run failed validation or hit a fatal node failure.
    #[serde(rename = "pipeline_run.failed")]
    RunFailed,
    /// A run observed a cancellation request.
    #[serde(rename = "pipeline_run.cancelled")]
    RunCancelled,
    /// A run exceeded its deadline.
    #[serde(rename = "pipeline_run.timeout")]
    RunTimeout,
    /// A node is about to be dispatched.
    #[serde(rename = "pipeline_node.started")]
    NodeStarted,
    /// A node produced an output.
    #[serde(rename = "pipeline_node.completed")]
    NodeCompleted,
    /// A node failed.
    #[serde(rename = "pipeline_node.failed")]
    NodeFailed,
    /// A node was skipped by branch propagation.
    #[serde(rename = "pipeline_node.skipped")]
    NodeSkipped,
    /// A node hit a retryable error and will be dispatched again.
    #[serde(rename = "pipeline_node.retrying")]
    NodeRetrying,
}

impl EventType {
    /// Returns the wire name of the event.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunStarted => "pipeline_run.started",
            Self::RunCompleted => "pipeline_run.completed",
            Self::RunFailed => "pipeline_run.failed",
            Self::RunCancelled => "pipeline_run.cancelled",
            Self::RunTimeout => "pipeline_run.timeout",
            Self::NodeStarted => "pipeline_node.started",
            Self::NodeCompleted => "pipeline_node.completed",
            Self::NodeFailed => "pipeline_node.failed",
            Self::NodeSkipped => "pipeline_node.skipped",
            Self::NodeRetrying => "pipeline_node.retrying",
        }
    }

    /// Returns true for run-level (as opposed to node-level) events.
    #[must_use]
    pub fn is_run_event(&self) -> bool {
        matches!(
            self,
            Self::RunStarted
                | Self::RunCompleted
                | Self::RunFailed
                | Self::RunCancelled
                | Self::RunTimeout
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_serde() {
        for event in [
            EventType::RunStarted,
            EventType::RunTimeout,
            EventType::NodeSkipped,
            EventType::NodeRetrying,
        ] {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event.as_str()));
        }
    }

    #[test]
    fn test_is_run_event() {
        assert!(EventType::RunCancelled.is_run_event());
        assert!(!EventType::NodeFailed.is_run_event());
    }
}
