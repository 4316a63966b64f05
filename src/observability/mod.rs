//! Observability subsystem
//!
//! Structured logging for client lifecycle, election transitions, and
//! replication traffic.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on protocol execution
//! 3. No async or background threads
//! 4. Deterministic output

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event with structured fields
pub fn log_event(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
