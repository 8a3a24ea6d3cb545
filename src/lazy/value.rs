//! Decode-on-first-access wrappers

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fmt;

use crate::observability::CodecMetrics;
use crate::serialization::{CodecResult, Serializer};
use crate::value::{EncodingTag, Value};

/// Decodes `bytes` into `cache` unless it is already filled.
fn decode_cached<'c, S: Serializer>(
    cache: &'c OnceCell<Value>,
    serializer: &S,
    bytes: &[u8],
    metrics: Option<&CodecMetrics>,
) -> CodecResult<&'c Value> {
    if let Some(value) = cache.get() {
        return Ok(value);
    }
    let value = serializer.decode(bytes)?;
    if let Some(metrics) = metrics {
        metrics.increment_decoded();
    }
    Ok(cache.get_or_init(|| value))
}

fn children(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Null => Box::new(std::iter::empty()),
        Value::Array(items) => Box::new(items.iter()),
        Value::Record(record) => Box::new(record.iter().map(|(_, v)| v)),
        atom => Box::new(std::iter::once(atom)),
    }
}

/// A value left encoded until something reads it.
///
/// Borrows both the encoded bytes and the serializer that wrote them. The
/// first read-only access (`get`, `count`, `iterate`, `get_field`,
/// `compare_to`) decodes and caches; later accesses are served from the
/// cache.
pub struct LazyValue<'buf, S> {
    serializer: &'buf S,
    bytes: &'buf [u8],
    cache: OnceCell<Value>,
    metrics: Option<&'buf CodecMetrics>,
}

impl<'buf, S: Serializer> LazyValue<'buf, S> {
    /// `bytes` must hold exactly one value encoded by `serializer`.
    pub fn new(serializer: &'buf S, bytes: &'buf [u8]) -> Self {
        Self {
            serializer,
            bytes,
            cache: OnceCell::new(),
            metrics: None,
        }
    }

    /// Counts decodes in `metrics`.
    pub fn with_metrics(mut self, metrics: &'buf CodecMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn encoded(&self) -> &'buf [u8] {
        self.bytes
    }

    /// Tag of the value, from the schema when it fixes one and from the
    /// leading tag byte otherwise. Never decodes.
    pub fn encoding_tag(&self) -> Option<EncodingTag> {
        self.serializer.leading_tag(self.bytes)
    }

    pub fn is_decoded(&self) -> bool {
        self.cache.get().is_some()
    }

    pub fn get(&self) -> CodecResult<&Value> {
        decode_cached(&self.cache, self.serializer, self.bytes, self.metrics)
    }

    pub fn count(&self) -> CodecResult<usize> {
        Ok(self.get()?.count())
    }

    /// Elements of an array, field values of a record, the value itself for
    /// an atom, nothing for null.
    pub fn iterate(&self) -> CodecResult<Box<dyn Iterator<Item = &Value> + '_>> {
        Ok(children(self.get()?))
    }

    pub fn get_field(&self, name: &str) -> CodecResult<Option<&Value>> {
        Ok(self.get()?.as_record().and_then(|r| r.get(name)))
    }

    pub fn get_index(&self, idx: usize) -> CodecResult<Option<&Value>> {
        Ok(self.get()?.as_array().and_then(|items| items.get(idx)))
    }

    /// Decodes both sides and compares the values.
    pub fn compare_to<T: Serializer>(&self, other: &LazyValue<'_, T>) -> CodecResult<Ordering> {
        Ok(self.get()?.compare_to(other.get()?))
    }

    /// Compares the encoded bytes without decoding either side. Both values
    /// must have been written by serializers for the same schema.
    pub fn compare_encoded(&self, other: &LazyValue<'_, S>) -> CodecResult<Ordering> {
        self.serializer.compare_bytes(self.bytes, other.bytes)
    }

    /// Owned, independent copy. The encoded bytes are copied; a cached
    /// decoded value is deep-copied along with them.
    pub fn get_copy(&self) -> OwnedLazyValue<S>
    where
        S: Clone,
    {
        let owned = self.to_owned_lazy();
        if let Some(value) = self.cache.get() {
            let _ = owned.cache.set(value.deep_copy());
        }
        owned
    }

    /// Owned copy of the encoded bytes only. Never decodes.
    pub fn to_owned_lazy(&self) -> OwnedLazyValue<S>
    where
        S: Clone,
    {
        OwnedLazyValue::new(self.serializer.clone(), self.bytes.to_vec())
    }
}

impl<S> fmt::Debug for LazyValue<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("len", &self.bytes.len())
            .field("decoded", &self.cache.get())
            .finish()
    }
}

/// A lazily decoded value that owns its bytes and its serializer.
#[derive(Clone)]
pub struct OwnedLazyValue<S> {
    serializer: S,
    bytes: Vec<u8>,
    cache: OnceCell<Value>,
}

impl<S: Serializer> OwnedLazyValue<S> {
    pub fn new(serializer: S, bytes: Vec<u8>) -> Self {
        Self {
            serializer,
            bytes,
            cache: OnceCell::new(),
        }
    }

    /// Encodes `value` and wraps the result, already decoded.
    pub fn from_value(serializer: S, value: Value) -> CodecResult<Self> {
        let bytes = serializer.encode(&value)?;
        let owned = Self::new(serializer, bytes);
        let _ = owned.cache.set(value);
        Ok(owned)
    }

    pub fn encoded(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding_tag(&self) -> Option<EncodingTag> {
        self.serializer.leading_tag(&self.bytes)
    }

    pub fn is_decoded(&self) -> bool {
        self.cache.get().is_some()
    }

    pub fn get(&self) -> CodecResult<&Value> {
        decode_cached(&self.cache, &self.serializer, &self.bytes, None)
    }

    pub fn count(&self) -> CodecResult<usize> {
        Ok(self.get()?.count())
    }

    pub fn iterate(&self) -> CodecResult<Box<dyn Iterator<Item = &Value> + '_>> {
        Ok(children(self.get()?))
    }

    pub fn compare_encoded(&self, other: &OwnedLazyValue<S>) -> CodecResult<Ordering> {
        self.serializer.compare_bytes(&self.bytes, &other.bytes)
    }

    /// Borrowed view sharing these bytes. The view has its own cache.
    pub fn as_lazy(&self) -> LazyValue<'_, S> {
        LazyValue::new(&self.serializer, &self.bytes)
    }

    pub fn into_value(self) -> CodecResult<Value> {
        match self.cache.into_inner() {
            Some(value) => Ok(value),
            None => self.serializer.decode(&self.bytes),
        }
    }
}

impl<S> fmt::Debug for OwnedLazyValue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedLazyValue")
            .field("len", &self.bytes.len())
            .field("decoded", &self.cache.get())
            .finish()
    }
}
