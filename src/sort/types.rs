//! Sorter types

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::lazy::LazyValue;
use crate::serialization::{CodecResult, FullSerializer};
use crate::value::Value;

/// Sort direction. Descending reverses the key comparator only; equal keys
/// keep insertion order either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Location of one pair in the sorter's buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PairSlot {
    pub offset: usize,
    pub key_len: usize,
    pub value_len: usize,
}

impl PairSlot {
    pub fn key_end(&self) -> usize {
        self.offset + self.key_len
    }

    pub fn end(&self) -> usize {
        self.key_end() + self.value_len
    }
}

/// One `(key, value)` pair yielded by a sorted iteration. Neither side is
/// decoded until read.
#[derive(Debug)]
pub struct SortedPair<'a> {
    key: LazyValue<'a, FullSerializer>,
    value: LazyValue<'a, FullSerializer>,
}

impl<'a> SortedPair<'a> {
    pub(crate) fn new(key: LazyValue<'a, FullSerializer>, value: LazyValue<'a, FullSerializer>) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &LazyValue<'a, FullSerializer> {
        &self.key
    }

    pub fn value(&self) -> &LazyValue<'a, FullSerializer> {
        &self.value
    }

    /// Decodes both sides into owned values.
    pub fn decode(&self) -> CodecResult<(Value, Value)> {
        Ok((self.key.get()?.clone(), self.value.get()?.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_apply() {
        assert_eq!(SortOrder::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!(SortOrder::Desc.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(SortOrder::Desc.apply(Ordering::Equal), Ordering::Equal);
        assert_eq!(SortOrder::default(), SortOrder::Asc);
    }

    #[test]
    fn test_order_serde() {
        let order: SortOrder = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(order, SortOrder::Desc);
        assert_eq!(serde_json::to_string(&SortOrder::Asc).unwrap(), "\"asc\"");
    }

    #[test]
    fn test_slot_bounds() {
        let slot = PairSlot {
            offset: 10,
            key_len: 3,
            value_len: 5,
        };
        assert_eq!(slot.key_end(), 13);
        assert_eq!(slot.end(), 18);
    }
}
