//! Lazily decoded values
//!
//! A lazy value holds encoded bytes and decodes them on first access. Its
//! encoding tag comes from the bound schema (or the leading tag byte of a
//! tagged encoding), so asking for the tag never decodes.
//!
//! - [`LazyValue`] borrows the bytes; its lifetime is tied to the buffer
//! - [`OwnedLazyValue`] owns a copy; `get_copy` always yields one
//! - [`SpilledArray`] keeps a whole array encoded in one growable buffer

mod spilled;
mod value;

pub use spilled::SpilledArray;
pub use value::{LazyValue, OwnedLazyValue};
