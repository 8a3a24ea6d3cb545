//! Serializers for quarry
//!
//! Two families share one [`Serializer`] contract:
//!
//! - [`BasicSerializer`]: bound to a schema, no embedded type information
//! - [`FullSerializer`]: self-describing, a tag byte in front of every value
//!
//! Both can compare encoded values without decoding them. Bytes written by a
//! full serializer can only be read by a full serializer; bytes written by a
//! basic serializer only by a basic serializer for the identical schema.
//!
//! # Errors
//!
//! Every failure ends the current call. A value that does not conform to the
//! schema is rejected before anything is written; malformed input is never
//! papered over with a default value.

mod array;
mod atom;
mod basic;
mod errors;
mod full;
mod record;
mod serializer;

pub use basic::BasicSerializer;
pub use errors::{CodecError, CodecResult, Severity};
pub use full::FullSerializer;
pub use serializer::Serializer;
