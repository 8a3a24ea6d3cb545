//! Lifecycle events emitted by quarry
//!
//! Events are logged at the granularity of whole operations (a sort, a
//! schema directory load), never per encoded value.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Codec configuration read from a file
    ConfigLoaded,
    /// Schema directory scanned and registered
    SchemasLoaded,

    /// External sort started
    SortBegin,
    /// External sort finished
    SortComplete,
    /// Comparator failed during a sort
    SortFailed,
    /// A spill buffer reallocated
    SpillBufferGrow,

    /// A value was rejected before being written
    SchemaViolation,
    /// Encoded input could not be decoded
    MalformedInput,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",
            Event::SortBegin => "SORT_BEGIN",
            Event::SortComplete => "SORT_COMPLETE",
            Event::SortFailed => "SORT_FAILED",
            Event::SpillBufferGrow => "SPILL_BUFFER_GROW",
            Event::SchemaViolation => "SCHEMA_VIOLATION",
            Event::MalformedInput => "MALFORMED_INPUT",
        }
    }

    /// Failure events are logged at ERROR; nothing in this layer is fatal.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::SortFailed | Event::SchemaViolation | Event::MalformedInput
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
