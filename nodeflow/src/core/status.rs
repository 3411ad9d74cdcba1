//! Node and run status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The terminal status of a single node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Node dispatched (or was pre-seeded) and produced an output.
    Completed,
    /// Node failed: breaker open, retries exhausted, or non-retryable error.
    Failed,
    /// Node was unreachable because of a false condition upstream.
    Skipped,
    /// Node was interrupted by run cancellation.
    Cancelled,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl NodeStatus {
    /// Returns true if the node ran to completion or was legitimately skipped.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// The outcome of a whole pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every reachable node completed (condition failures are tolerated).
    Completed,
    /// Validation failed or a non-condition node failed.
    Failed,
    /// Cancellation was requested, cooperatively or forcefully.
    Cancelled,
    /// The run exceeded its absolute deadline.
    Timeout,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}
