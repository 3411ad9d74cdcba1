//! Lifecycle event delivery.
//!
//! Sinks are handed to the executor through
//! [`ExecutionContext`](crate::context::ExecutionContext); there is no global
//! sink.

mod sink;

pub use sink::{EventSink, LoggingEventSink, NoOpEventSink};
