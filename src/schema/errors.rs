//! Schema error types
//!
//! Error codes:
//! - QUARRY_UNKNOWN_SCHEMA (REJECT)
//! - QUARRY_SCHEMA_IMMUTABLE (REJECT)
//! - QUARRY_MALFORMED_SCHEMA (FATAL)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected, registry unchanged
    Reject,
    /// Schema files are unusable; the caller should not start
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema registry error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// No schema registered under the name
    QuarryUnknownSchema,
    /// A schema with the same name is already registered
    QuarrySchemaImmutable,
    /// Schema file unreadable, not JSON, or structurally invalid
    QuarryMalformedSchema,
}

impl SchemaErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::QuarryUnknownSchema => "QUARRY_UNKNOWN_SCHEMA",
            SchemaErrorCode::QuarrySchemaImmutable => "QUARRY_SCHEMA_IMMUTABLE",
            SchemaErrorCode::QuarryMalformedSchema => "QUARRY_MALFORMED_SCHEMA",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::QuarryMalformedSchema => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Conformance failure of a value against a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Path of the offending position (e.g. `$.tags[2]`)
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(path: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(path: impl Into<String>) -> Self {
        Self::new(path, "field to be present", "missing")
    }

    pub fn extra_field(path: impl Into<String>) -> Self {
        Self::new(path, "no undeclared fields", "extra field present")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': expected {}, got {}", self.path, self.expected, self.actual)
    }
}

/// Schema registry error with context
#[derive(Debug)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    schema_name: Option<String>,
}

impl SchemaError {
    pub fn unknown_schema(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: SchemaErrorCode::QuarryUnknownSchema,
            message: format!("Schema '{}' not found", name),
            schema_name: Some(name),
        }
    }

    pub fn schema_immutable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: SchemaErrorCode::QuarrySchemaImmutable,
            message: format!("Schema '{}' is already registered", name),
            schema_name: Some(name),
        }
    }

    pub fn malformed_schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::QuarryMalformedSchema,
            message: format!("Malformed schema file '{}': {}", path.into(), reason.into()),
            schema_name: None,
        }
    }

    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::QuarryUnknownSchema.code(), "QUARRY_UNKNOWN_SCHEMA");
        assert_eq!(SchemaErrorCode::QuarrySchemaImmutable.code(), "QUARRY_SCHEMA_IMMUTABLE");
        assert_eq!(SchemaErrorCode::QuarryMalformedSchema.code(), "QUARRY_MALFORMED_SCHEMA");
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(SchemaErrorCode::QuarryUnknownSchema.severity(), Severity::Reject);
        assert_eq!(SchemaErrorCode::QuarryMalformedSchema.severity(), Severity::Fatal);
        assert!(SchemaError::malformed_schema("x.json", "bad").is_fatal());
        assert!(!SchemaError::unknown_schema("orders").is_fatal());
    }

    #[test]
    fn test_display_carries_code() {
        let err = SchemaError::schema_immutable("orders");
        let display = err.to_string();
        assert!(display.contains("REJECT"));
        assert!(display.contains("QUARRY_SCHEMA_IMMUTABLE"));
        assert!(display.contains("orders"));
        assert_eq!(err.schema_name(), Some("orders"));
    }

    #[test]
    fn test_validation_details_display() {
        let details = ValidationDetails::new("$.age", "long", "string");
        let display = details.to_string();
        assert!(display.contains("$.age"));
        assert!(display.contains("long"));
        assert!(display.contains("string"));
    }
}
