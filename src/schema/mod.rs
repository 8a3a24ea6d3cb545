//! Schema descriptors for quarry
//!
//! Schemas are opaque inputs produced by other parts of the engine. The codec
//! only queries them: node kind, record fields and wildcard, array head/rest
//! and cardinality bounds, legal atom tags.
//!
//! # Design Principles
//!
//! - Record fields are always held in name order
//! - Conformance is checked before any byte is written
//! - No coercion and no defaults

mod errors;
mod loader;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity, ValidationDetails};
pub use loader::SchemaLoader;
pub use types::{AtomConstraint, FieldDef, NamedSchema, Schema, SchemaKind};
pub use validator::SchemaValidator;
