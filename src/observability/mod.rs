//! Observability for quarry
//!
//! - Structured JSON logging, one line per event
//! - Lock-free counters
//! - Begin/complete scopes around sorts
//!
//! Nothing here has side effects on encoding results, and nothing is logged
//! per value.
//!
//! ```ignore
//! use quarry::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::SchemasLoaded, &[("count", "4")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{CodecMetrics, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

fn severity_of(event: Event) -> Severity {
    if event.is_failure() {
        Severity::Error
    } else {
        Severity::Info
    }
}

/// Logs a lifecycle event with no fields.
pub fn log_event(event: Event) {
    Logger::log(severity_of(event), event.as_str(), &[]);
}

pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_of(event), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_events_log_at_error() {
        assert_eq!(severity_of(Event::SortFailed), Severity::Error);
        assert_eq!(severity_of(Event::SchemasLoaded), Severity::Info);
    }

    #[test]
    fn test_log_event_does_not_panic() {
        log_event(Event::SortBegin);
        log_event_with_fields(Event::SpillBufferGrow, &[("capacity", "131072")]);
    }
}
