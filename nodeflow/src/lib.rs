//! # Nodeflow
//!
//! A DAG workflow engine. A pipeline is a graph of typed nodes (trigger,
//! agent, condition, action, parallel, delay) joined by directed edges.
//! Nodeflow provides:
//!
//! - **Definitions**: serde-backed nodes and edges, parsed from JSON or built
//!   with a fluent builder
//! - **Validation**: dangling edges, cycles, orphans and per-type config
//! - **Execution**: deterministic topological order, retry with exponential
//!   backoff, per-node circuit breakers and condition-driven skipping
//! - **Run management**: spawned runs with deadlines and cancellation
//! - **Observability**: lifecycle events, per-node persistence and `tracing`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nodeflow::prelude::*;
//! use std::sync::Arc;
//!
//! let definition = PipelineBuilder::new()
//!     .node(Node::trigger("t1"))
//!     .node(Node::agent("a1", "writer", "Summarize the input"))
//!     .connect("t1", "a1")
//!     .build_validated()?;
//!
//! let executor = Arc::new(PipelineExecutor::new(1, definition, ExecutionContext::new()));
//! let manager = RunManager::new();
//! let result = manager.start_run(42, executor, RunOptions::new())?.await;
//! assert!(result.is_completed());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod breaker;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod definition;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod executor;
pub mod observability;
pub mod runs;
pub mod testing;
pub mod validation;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::EngineConfig;
    pub use crate::context::{ActionHandler, Agent, AgentRegistry, Database, ExecutionContext};
    pub use crate::core::{
        EventType, NodeExecutionResult, NodeStatus, PipelineRunResult, RunStatus,
    };
    pub use crate::definition::{
        parse_pipeline_definition, Edge, Node, NodeType, PipelineBuilder, PipelineDefinition,
    };
    pub use crate::dispatch::{dispatch_node, DefaultDispatcher, NodeDispatcher, NodeInputs};
    pub use crate::errors::{
        ConfigError, CycleDetectedError, NodeError, NodeflowError, ParseError,
        PipelineValidationError, RunError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::executor::{PipelineExecutor, RetryPolicy};
    pub use crate::runs::{RunHandle, RunManager, RunOptions};
    pub use crate::validation::{ensure_valid, execution_order, validate_pipeline_dag};
}
