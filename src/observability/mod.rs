//! Observability subsystem
//!
//! Structured JSON logging with typed lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only: no side effects on execution
//! 2. No async or background threads
//! 3. Deterministic output
//! 4. Observability failure never fails the primary operation

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event with fields, at the event's own severity.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
