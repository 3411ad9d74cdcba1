//! Error types for the nodeflow engine.
//!
//! Node-level failures are classified by [`NodeError`]; only
//! [`NodeError::Execution`] is eligible for retry. Definition, validation and
//! configuration problems surface through [`NodeflowError`].

use thiserror::Error;

/// The main error type for nodeflow operations outside a running node.
#[derive(Debug, Error)]
pub enum NodeflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A cycle was detected in the pipeline.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// Stored graph data could not be parsed.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Engine configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A run could not be started.
    #[error("{0}")]
    Run(#[from] RunError),
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The combined error message.
    pub message: String,
    /// The individual validation errors.
    pub errors: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a validation error from the list produced by the validator.
    #[must_use]
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            message: format!("Validation failed: {}", errors.join("; ")),
            errors,
        }
    }
}

/// Error raised when a cycle is detected in the pipeline graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Pipeline contains a cycle: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of nodes forming the cycle, first node repeated at the end.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

impl From<CycleDetectedError> for PipelineValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self::from_errors(vec![err.to_string()])
    }
}

/// Error raised when raw node/edge JSON cannot be turned into a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A node entry was malformed or had an unknown type.
    #[error("Invalid node data: {0}")]
    Node(String),

    /// An edge entry was malformed.
    #[error("Invalid edge data: {0}")]
    Edge(String),

    /// The document as a whole was not valid JSON.
    #[error("Invalid pipeline document: {0}")]
    Document(String),
}

/// Errors raised while loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Config file not readable: {path}")]
    NotFound {
        /// The path that was tried.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config text was not valid TOML for [`crate::config::EngineConfig`].
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors raised by the run manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// A run with this id is already tracked.
    #[error("Pipeline run {0} is already active")]
    AlreadyActive(i64),
}

/// Failure of a single node dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Bad or missing node configuration. Never retried.
    #[error("{0}")]
    Config(String),

    /// Transient failure. Retried with backoff.
    #[error("{message}")]
    Execution {
        /// Human-readable failure, including the wrapped cause.
        message: String,
    },

    /// Any other failure. Never retried.
    #[error("{0}")]
    Other(String),

    /// The run's cancellation token fired while the node was suspended.
    #[error("Node execution cancelled")]
    Cancelled,
}

impl NodeError {
    /// Creates a non-retryable configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a retryable execution error.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Creates a non-retryable error of no particular category.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns true if the error may succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Returns a short category name for logs and events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Execution { .. } => "execution",
            Self::Other(_) => "other",
            Self::Cancelled => "cancelled",
        }
    }
}
