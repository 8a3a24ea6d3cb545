//! quarry - binary interchange layer for a semi-structured query engine
//!
//! Values travel between operators, workers and storage as bytes. This crate
//! defines those bytes:
//!
//! - `value`: the decoded value model and its total order
//! - `schema`: schema descriptors, validation and a JSON schema registry
//! - `serialization`: schema-bound and self-describing serializers that
//!   also compare encoded values without decoding them
//! - `lazy`: values decoded on first access
//! - `sort`: an external sorter over encoded (key, value) pairs

pub mod config;
pub mod io;
pub mod lazy;
pub mod observability;
pub mod schema;
pub mod serialization;
pub mod sort;
pub mod value;
