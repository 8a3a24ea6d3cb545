//! External sorting of encoded pairs
//!
//! Pairs are kept tagged-encoded in one growable buffer and ordered by
//! comparing key bytes, never by decoding them. The sort is a stable merge
//! sort; equal keys keep insertion order.

mod merge;
mod sorter;
mod types;

pub use sorter::{ExternalSorter, SortedIter};
pub use types::{SortOrder, SortedPair};
