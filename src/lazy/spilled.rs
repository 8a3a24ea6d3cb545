//! Arrays kept encoded in a growable buffer

use crate::config::CodecConfig;
use crate::io::{SliceInput, SpillBuffer};
use crate::serialization::{CodecResult, FullSerializer, Serializer};
use crate::value::Value;

use super::value::LazyValue;

/// An array whose elements live tagged-encoded in one [`SpillBuffer`].
///
/// Elements are decoded one at a time on access. The buffer grows
/// geometrically up to the configured cap; a push past the cap fails with
/// `CapacityExceeded` and leaves the array unchanged.
#[derive(Debug)]
pub struct SpilledArray {
    full: FullSerializer,
    buffer: SpillBuffer,
    offsets: Vec<usize>,
}

impl SpilledArray {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            full: FullSerializer::new(config),
            buffer: SpillBuffer::with_config(config),
            offsets: Vec::new(),
        }
    }

    pub fn with_buffer(full: FullSerializer, buffer: SpillBuffer) -> Self {
        Self {
            full,
            buffer,
            offsets: Vec::new(),
        }
    }

    pub fn push(&mut self, value: &Value) -> CodecResult<()> {
        let start = self.buffer.len();
        if let Err(err) = self.full.write(&mut self.buffer, value) {
            self.buffer.truncate(start);
            return Err(err);
        }
        self.offsets.push(start);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn bounds(&self, idx: usize) -> Option<(usize, usize)> {
        let start = *self.offsets.get(idx)?;
        let end = self.offsets.get(idx + 1).copied().unwrap_or(self.buffer.len());
        Some((start, end))
    }

    /// Encoded bytes of element `idx`.
    pub fn encoded(&self, idx: usize) -> Option<&[u8]> {
        self.bounds(idx).map(|(start, end)| self.buffer.slice(start..end))
    }

    pub fn lazy(&self, idx: usize) -> Option<LazyValue<'_, FullSerializer>> {
        self.encoded(idx).map(|bytes| LazyValue::new(&self.full, bytes))
    }

    /// Decodes element `idx` into caller-owned scratch. Returns false when
    /// the index is out of range.
    pub fn get_into(&self, idx: usize, target: &mut Value) -> CodecResult<bool> {
        match self.encoded(idx) {
            Some(bytes) => {
                self.full.read_into(&mut SliceInput::new(bytes), target)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get(&self, idx: usize) -> CodecResult<Option<Value>> {
        self.encoded(idx).map(|bytes| self.full.decode(bytes)).transpose()
    }

    pub fn iter(&self) -> impl Iterator<Item = LazyValue<'_, FullSerializer>> + '_ {
        (0..self.len()).filter_map(move |idx| self.lazy(idx))
    }

    /// Decodes every element into one array value.
    pub fn to_value(&self) -> CodecResult<Value> {
        let mut items = Vec::with_capacity(self.len());
        let mut input = SliceInput::new(self.buffer.as_slice());
        for _ in 0..self.len() {
            items.push(self.full.read(&mut input)?);
        }
        Ok(Value::Array(items))
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.offsets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SpilledArray {
        SpilledArray::with_buffer(FullSerializer::get_default(), SpillBuffer::new(16, 64))
    }

    #[test]
    fn test_push_and_get() {
        let mut array = small();
        array.push(&Value::Long(1)).unwrap();
        array.push(&Value::from("two")).unwrap();
        array.push(&Value::Null).unwrap();

        assert_eq!(array.len(), 3);
        assert_eq!(array.get(1).unwrap(), Some(Value::from("two")));
        assert_eq!(array.get(2).unwrap(), Some(Value::Null));
        assert_eq!(array.get(3).unwrap(), None);
        assert_eq!(array.encoded(2), Some(&[0u8][..]));
    }

    #[test]
    fn test_to_value_and_iter() {
        let mut array = small();
        for v in 0..4 {
            array.push(&Value::Long(v)).unwrap();
        }
        let expected = Value::Array((0..4).map(Value::Long).collect());
        assert_eq!(array.to_value().unwrap(), expected);

        let decoded: Vec<Value> = array.iter().map(|lazy| lazy.get().unwrap().clone()).collect();
        assert_eq!(Value::Array(decoded), expected);
    }

    #[test]
    fn test_push_past_cap_leaves_array_unchanged() {
        let mut array = small();
        for v in 0..7 {
            array.push(&Value::Long(v)).unwrap();
        }
        // 7 * 9 bytes used, no room for another long
        let err = array.push(&Value::Long(7)).unwrap_err();
        assert_eq!(err.code(), "QUARRY_CAPACITY_EXCEEDED");
        assert_eq!(array.len(), 7);
        assert_eq!(array.buffered_bytes(), 63);
        assert_eq!(array.get(6).unwrap(), Some(Value::Long(6)));
    }

    #[test]
    fn test_get_into_reuses_scratch() {
        let mut array = small();
        array.push(&Value::from("abc")).unwrap();
        let mut scratch = Value::String(String::with_capacity(40));
        assert!(array.get_into(0, &mut scratch).unwrap());
        assert_eq!(scratch, Value::from("abc"));
        assert!(scratch.as_string_mut().unwrap().capacity() >= 40);
        assert!(!array.get_into(5, &mut scratch).unwrap());
    }
}
