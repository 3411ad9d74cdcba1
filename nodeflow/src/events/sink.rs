//! Event sink trait and implementations.

use crate::core::EventType;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, Level};

/// Receiver of pipeline lifecycle events.
///
/// Delivery is best-effort: the executor logs and discards any error a sink
/// returns, and a failing sink never changes a run's outcome.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be delivered.
    async fn emit(&self, event_type: EventType, data: Value) -> anyhow::Result<()>;
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: EventType, _data: Value) -> anyhow::Result<()> {
        Ok(())
    }
}

/// An event sink that mirrors events into `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event_type: EventType, data: &Value) {
        if self.level == Level::DEBUG {
            debug!(event_type = %event_type, event_data = %data, "Event: {}", event_type);
        } else {
            info!(event_type = %event_type, event_data = %data, "Event: {}", event_type);
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: EventType, data: Value) -> anyhow::Result<()> {
        self.log_event(event_type, &data);
        Ok(())
    }
}
