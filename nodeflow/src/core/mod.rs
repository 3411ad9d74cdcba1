//! Core types for nodeflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - [`NodeStatus`] / [`RunStatus`] - Terminal statuses
//! - [`EventType`] - Lifecycle events emitted during a run
//! - [`NodeExecutionResult`] / [`PipelineRunResult`] - Execution results

mod event;
mod result;
mod status;

pub use event::EventType;
pub use result::{NodeExecutionResult, PipelineRunResult};
pub use status::{NodeStatus, RunStatus};
