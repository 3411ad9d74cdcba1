//! Traits for the services a run talks to.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Persistence backend for node results.
#[async_trait]
pub trait Database: Send + Sync {
    /// Executes a statement, returning the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    async fn execute(&self, query: &str, params: &Map<String, Value>) -> anyhow::Result<u64>;

    /// Executes a query returning at most one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn execute_one(
        &self,
        query: &str,
        params: &Map<String, Value>,
    ) -> anyhow::Result<Option<Value>>;
}

/// An agent that answers a prompt.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Processes a prompt and returns the agent's reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent could not produce a reply.
    async fn process_message(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Lookup of agents by id.
pub trait AgentRegistry: Send + Sync {
    /// Returns the agent registered under `agent_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry itself could not be queried.
    fn get(&self, agent_id: &str) -> anyhow::Result<Option<Arc<dyn Agent>>>;
}

/// Performs the side effect behind an action node.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Handles `action` with the node's remaining config as `params`.
    ///
    /// Returns `None` if this handler does not know the action. A handled
    /// action returns a JSON object whose fields are merged into the node
    /// output.
    async fn handle(&self, action: &str, params: &Map<String, Value>)
        -> Option<anyhow::Result<Value>>;
}
