//! Test doubles for the engine's collaborators.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cancellation::CancellationToken;
use crate::context::{Agent, AgentRegistry, Database, ExecutionContext};
use crate::core::EventType;
use crate::definition::Node;
use crate::dispatch::{dispatch_node, NodeDispatcher, NodeInputs};
use crate::errors::NodeError;
use crate::events::EventSink;

/// An event sink that keeps every event it receives.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<(EventType, Value)>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(EventType, Value)> {
        self.events.lock().clone()
    }

    /// Returns the collected event types in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<EventType> {
        self.events.lock().iter().map(|(t, _)| *t).collect()
    }

    /// Returns the payloads of every event of one type.
    #[must_use]
    pub fn payloads(&self, event_type: EventType) -> Vec<Value> {
        self.events
            .lock()
            .iter()
            .filter(|(t, _)| *t == event_type)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: EventType, data: Value) -> anyhow::Result<()> {
        self.events.lock().push((event_type, data));
        Ok(())
    }
}

/// An event sink that rejects every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingEventSink;

#[async_trait]
impl EventSink for FailingEventSink {
    async fn emit(&self, event_type: EventType, _data: Value) -> anyhow::Result<()> {
        anyhow::bail!("event bus unavailable for {event_type}")
    }
}

/// A database that records every statement.
#[derive(Debug, Default)]
pub struct RecordingDatabase {
    statements: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl RecordingDatabase {
    /// Creates a new recording database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parameters of every recorded statement.
    #[must_use]
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        self.statements.lock().iter().map(|(_, p)| p.clone()).collect()
    }

    /// Returns the recorded statements.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().iter().map(|(q, _)| q.clone()).collect()
    }

    /// Returns the row written for a node, if any.
    #[must_use]
    pub fn row_for(&self, node_id: &str) -> Option<Map<String, Value>> {
        self.rows()
            .into_iter()
            .find(|row| row.get("node_id").and_then(Value::as_str) == Some(node_id))
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    async fn execute(&self, query: &str, params: &Map<String, Value>) -> anyhow::Result<u64> {
        self.statements.lock().push((query.to_string(), params.clone()));
        Ok(1)
    }

    async fn execute_one(
        &self,
        query: &str,
        params: &Map<String, Value>,
    ) -> anyhow::Result<Option<Value>> {
        self.statements.lock().push((query.to_string(), params.clone()));
        Ok(None)
    }
}

/// A database whose every statement fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingDatabase;

#[async_trait]
impl Database for FailingDatabase {
    async fn execute(&self, _query: &str, _params: &Map<String, Value>) -> anyhow::Result<u64> {
        anyhow::bail!("connection refused")
    }

    async fn execute_one(
        &self,
        _query: &str,
        _params: &Map<String, Value>,
    ) -> anyhow::Result<Option<Value>> {
        anyhow::bail!("connection refused")
    }
}

/// An agent that replies with `echo: <prompt>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    async fn process_message(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(format!("echo: {prompt}"))
    }
}

/// An agent that always fails with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingAgent {
    message: String,
}

impl FailingAgent {
    /// Creates a failing agent.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Agent for FailingAgent {
    async fn process_message(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("{}", self.message))
    }
}

/// An agent registry backed by a fixed map.
#[derive(Default)]
pub struct StaticAgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl StaticAgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent.
    #[must_use]
    pub fn with_agent(mut self, agent_id: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(agent_id.into(), agent);
        self
    }
}

impl AgentRegistry for StaticAgentRegistry {
    fn get(&self, agent_id: &str) -> anyhow::Result<Option<Arc<dyn Agent>>> {
        Ok(self.agents.get(agent_id).cloned())
    }
}

#[derive(Debug, Clone)]
enum Script {
    FailTimes { remaining: u32, message: String },
    AlwaysFail(String),
    Reject(String),
    CancelRun,
    Sleep(Duration),
}

/// A dispatcher that follows per-node scripts and falls back to the
/// built-in handlers.
#[derive(Debug, Default)]
pub struct ScriptedDispatcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedDispatcher {
    /// Creates a dispatcher with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(self, node_id: &str, script: Script) -> Self {
        self.scripts.lock().insert(node_id.to_string(), script);
        self
    }

    /// Fails `node_id` with a retryable error `times` times, then succeeds.
    #[must_use]
    pub fn fail_times(self, node_id: &str, times: u32, message: impl Into<String>) -> Self {
        self.script(
            node_id,
            Script::FailTimes {
                remaining: times,
                message: message.into(),
            },
        )
    }

    /// Fails `node_id` with a retryable error on every attempt.
    #[must_use]
    pub fn always_fail(self, node_id: &str, message: impl Into<String>) -> Self {
        self.script(node_id, Script::AlwaysFail(message.into()))
    }

    /// Fails `node_id` with a non-retryable config error.
    #[must_use]
    pub fn reject(self, node_id: &str, message: impl Into<String>) -> Self {
        self.script(node_id, Script::Reject(message.into()))
    }

    /// Cancels the run while `node_id` is dispatched, then lets it succeed.
    #[must_use]
    pub fn cancel_run_at(self, node_id: &str) -> Self {
        self.script(node_id, Script::CancelRun)
    }

    /// Blocks `node_id` for `duration` without observing cancellation.
    #[must_use]
    pub fn sleep(self, node_id: &str, duration: Duration) -> Self {
        self.script(node_id, Script::Sleep(duration))
    }

    /// Returns how many times `node_id` was dispatched.
    #[must_use]
    pub fn calls(&self, node_id: &str) -> u32 {
        self.calls.lock().get(node_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl NodeDispatcher for ScriptedDispatcher {
    async fn dispatch(
        &self,
        node: &Node,
        inputs: &NodeInputs,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Value, NodeError> {
        *self.calls.lock().entry(node.id.clone()).or_insert(0) += 1;

        let script = {
            let mut scripts = self.scripts.lock();
            match scripts.get_mut(&node.id) {
                Some(Script::FailTimes { remaining, message }) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(Script::AlwaysFail(message.clone()))
                }
                Some(Script::FailTimes { .. }) | None => None,
                Some(other) => Some(other.clone()),
            }
        };

        match script {
            Some(Script::AlwaysFail(message)) => Err(NodeError::execution(message)),
            Some(Script::Reject(message)) => Err(NodeError::config(message)),
            Some(Script::CancelRun) => {
                cancel.cancel("cancelled by script");
                dispatch_node(node, inputs, context, cancel).await
            }
            Some(Script::Sleep(duration)) => {
                tokio::time::sleep(duration).await;
                dispatch_node(node, inputs, context, cancel).await
            }
            Some(Script::FailTimes { .. }) | None => dispatch_node(node, inputs, context, cancel).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        sink.emit(EventType::RunStarted, json!({"run_id": 1})).await.unwrap();
        sink.emit(EventType::RunCompleted, json!({"run_id": 1})).await.unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.event_types(),
            vec![EventType::RunStarted, EventType::RunCompleted]
        );
        assert_eq!(sink.payloads(EventType::RunCompleted), vec![json!({"run_id": 1})]);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_failing_collaborators() {
        assert!(FailingEventSink.emit(EventType::RunStarted, json!({})).await.is_err());
        assert!(FailingDatabase.execute("SELECT 1", &Map::new()).await.is_err());
        assert!(FailingAgent::new("down").process_message("hi").await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_fail_times() {
        let dispatcher = ScriptedDispatcher::new().fail_times("a", 2, "flaky");
        let node = Node::action("a", "noop");
        let ctx = ExecutionContext::new();
        let cancel = CancellationToken::new();

        for _ in 0..2 {
            let err = dispatcher
                .dispatch(&node, &NodeInputs::new(), &ctx, &cancel)
                .await
                .unwrap_err();
            assert!(err.is_retryable());
        }
        assert!(dispatcher.dispatch(&node, &NodeInputs::new(), &ctx, &cancel).await.is_ok());
        assert_eq!(dispatcher.calls("a"), 3);
        assert_eq!(dispatcher.calls("b"), 0);
    }
}
