//! Byte stream API for quarry
//!
//! Storage, shuffle and spill adapters hand the codec synchronous byte
//! endpoints. Blocking happens inside the adapter and is opaque here.
//!
//! - [`DataInput`] / [`DataOutput`]: exact reads and writes, varints,
//!   big-endian fixed64, current position
//! - [`SliceInput`]: zero-copy reads over a slice, used by lazy values
//! - [`ReaderInput`] / [`WriterOutput`]: adapters over `std::io`
//! - [`SpillBuffer`]: bounded, geometrically growing byte buffer

mod input;
mod output;
mod spill;
pub mod varint;

pub use input::{DataInput, ReaderInput, SliceInput};
pub use output::{DataOutput, WriterOutput};
pub use spill::SpillBuffer;
