//! Value model for quarry
//!
//! A decoded value is a [`Value`]: atoms, name-sorted records and arrays.
//!
//! # Invariants
//!
//! - Every variant has a stable [`EncodingTag`]
//! - Values of different tags are ordered by tag alone
//! - Record fields are unique and always kept in name order
//! - `Eq` and `Ord` agree with [`Value::compare_to`]
//!
//! Shared values are immutable (`&Value`); mutation goes through the
//! variant-specific views (`as_string_mut`, `as_record_mut`, ...) on a value
//! the caller owns exclusively. `deep_copy_into` copies into caller-owned
//! scratch, reusing its storage when the shapes match.

mod atoms;
mod record;
mod tag;
mod types;

pub use atoms::{DateValue, Decimal, FunctionRef, NativeValue, RegexValue, SpanValue};
pub use record::Record;
pub use tag::EncodingTag;
pub use types::Value;
