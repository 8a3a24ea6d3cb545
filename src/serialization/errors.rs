//! Codec error types
//!
//! Error codes:
//! - QUARRY_SCHEMA_VIOLATION (REJECT)
//! - QUARRY_MALFORMED_ENCODING (ERROR)
//! - QUARRY_CAPACITY_EXCEEDED (ERROR)
//! - QUARRY_IO_ERROR (ERROR)
//!
//! All of them end the current read or write call. Nothing in this layer
//! retries; a partially written output is left as is.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::schema::ValidationDetails;

/// Severity levels for codec errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The value was rejected before any byte was written
    Reject,
    /// The stream or buffer is unusable for this call
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Errors raised by serializers, comparators, lazy values and the sorter.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A value does not satisfy the schema its serializer is bound to.
    #[error("schema violation at '{path}': expected {expected}, got {actual}")]
    SchemaViolation {
        path: String,
        expected: String,
        actual: String,
    },

    /// Bad tag byte, bad varint, truncated input or a shape that does not
    /// match the reading serializer.
    #[error("malformed encoding at byte {offset}: {reason}")]
    MalformedEncoding { offset: u64, reason: String },

    /// A buffer would have to grow past its configured limit.
    #[error("capacity exceeded: {requested} bytes requested, limit is {limit}")]
    CapacityExceeded { requested: u64, limit: u64 },

    /// The underlying byte stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    pub fn schema_violation(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        CodecError::SchemaViolation {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        CodecError::MalformedEncoding {
            offset,
            reason: reason.into(),
        }
    }

    /// The stream ended before `needed` more bytes could be read.
    pub fn unexpected_eof(offset: u64, needed: usize) -> Self {
        Self::malformed(offset, format!("unexpected end of input, {} more bytes needed", needed))
    }

    /// Encoded bytes do not have the shape the reading serializer expects.
    /// This can only be detected late and is reported as malformed input.
    pub fn type_mismatch(offset: u64, expected: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::malformed(offset, format!("type mismatch, expected {}: {}", expected, reason))
    }

    pub fn capacity_exceeded(requested: u64, limit: u64) -> Self {
        CodecError::CapacityExceeded { requested, limit }
    }

    /// Stable string code
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::SchemaViolation { .. } => "QUARRY_SCHEMA_VIOLATION",
            CodecError::MalformedEncoding { .. } => "QUARRY_MALFORMED_ENCODING",
            CodecError::CapacityExceeded { .. } => "QUARRY_CAPACITY_EXCEEDED",
            CodecError::Io(_) => "QUARRY_IO_ERROR",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            CodecError::SchemaViolation { .. } => Severity::Reject,
            _ => Severity::Error,
        }
    }

    pub fn is_schema_violation(&self) -> bool {
        matches!(self, CodecError::SchemaViolation { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, CodecError::MalformedEncoding { .. })
    }
}

impl From<ValidationDetails> for CodecError {
    fn from(details: ValidationDetails) -> Self {
        CodecError::SchemaViolation {
            path: details.path,
            expected: details.expected,
            actual: details.actual,
        }
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CodecError::schema_violation("$.a", "long", "string").code(),
            "QUARRY_SCHEMA_VIOLATION"
        );
        assert_eq!(CodecError::malformed(3, "bad tag").code(), "QUARRY_MALFORMED_ENCODING");
        assert_eq!(CodecError::capacity_exceeded(10, 5).code(), "QUARRY_CAPACITY_EXCEEDED");
        assert_eq!(
            CodecError::from(io::Error::new(io::ErrorKind::Other, "disk")).code(),
            "QUARRY_IO_ERROR"
        );
    }

    #[test]
    fn test_severity() {
        assert_eq!(CodecError::schema_violation("$", "a", "b").severity(), Severity::Reject);
        assert_eq!(CodecError::malformed(0, "x").severity(), Severity::Error);
    }

    #[test]
    fn test_type_mismatch_is_malformed() {
        let err = CodecError::type_mismatch(12, "record", "bitmap truncated");
        assert!(err.is_malformed());
        let display = err.to_string();
        assert!(display.contains("byte 12"));
        assert!(display.contains("record"));
    }

    #[test]
    fn test_schema_violation_display() {
        let err = CodecError::schema_violation("$.tags", "at most 3 elements", "4 elements");
        let display = err.to_string();
        assert!(display.contains("$.tags"));
        assert!(display.contains("at most 3 elements"));
    }
}
