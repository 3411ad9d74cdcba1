//! Testing utilities for nodeflow pipelines.
//!
//! This module provides:
//! - Collecting and failing event sinks and databases
//! - Canned agents and an agent registry
//! - A scriptable node dispatcher
//! - Graph and policy fixtures

mod fixtures;
mod mocks;

pub use fixtures::{action_chain, fast_retry_policy, recording_context, trigger_agent_definition};
pub use mocks::{
    CollectingEventSink, EchoAgent, FailingAgent, FailingDatabase, FailingEventSink,
    RecordingDatabase, ScriptedDispatcher, StaticAgentRegistry,
};
