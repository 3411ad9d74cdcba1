//! Collaborators available to a running pipeline.
//!
//! Every collaborator is optional. A missing database means results are not
//! persisted, a missing event bus means events are dropped, and a missing
//! agent registry means agent nodes return simulated output.

mod collaborators;

pub use collaborators::{ActionHandler, Agent, AgentRegistry, Database};

use crate::events::EventSink;
use std::sync::Arc;

/// Shared handles to the services a run may use.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    /// Persistence for node results.
    pub db: Option<Arc<dyn Database>>,
    /// Lifecycle event receiver.
    pub event_bus: Option<Arc<dyn EventSink>>,
    /// Agent lookup for agent nodes.
    pub agent_registry: Option<Arc<dyn AgentRegistry>>,
    /// Side-effect handler for action nodes.
    pub action_handler: Option<Arc<dyn ActionHandler>>,
}

impl ExecutionContext {
    /// Creates a context with no collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database.
    #[must_use]
    pub fn with_db(mut self, db: Arc<dyn Database>) -> Self {
        self.db = Some(db);
        self
    }

    /// Sets the event bus.
    #[must_use]
    pub fn with_event_bus(mut self, event_bus: Arc<dyn EventSink>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Sets the agent registry.
    #[must_use]
    pub fn with_agent_registry(mut self, agent_registry: Arc<dyn AgentRegistry>) -> Self {
        self.agent_registry = Some(agent_registry);
        self
    }

    /// Sets the action handler.
    #[must_use]
    pub fn with_action_handler(mut self, action_handler: Arc<dyn ActionHandler>) -> Self {
        self.action_handler = Some(action_handler);
        self
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("db", &self.db.is_some())
            .field("event_bus", &self.event_bus.is_some())
            .field("agent_registry", &self.agent_registry.is_some())
            .field("action_handler", &self.action_handler.is_some())
            .finish()
    }
}
