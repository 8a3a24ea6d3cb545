//! External sorter over encoded (key, value) pairs

use std::sync::Arc;

use crate::config::CodecConfig;
use crate::io::SpillBuffer;
use crate::lazy::LazyValue;
use crate::observability::{log_event_with_fields, CodecMetrics, Event, ObservationScope};
use crate::serialization::{CodecError, CodecResult, FullSerializer, Serializer};
use crate::value::Value;

use super::merge::merge_sort_by;
use super::types::{PairSlot, SortOrder, SortedPair};

/// Sorts (key, value) pairs without keeping them as decoded values.
///
/// Each pair is tagged-encoded into one spill buffer and tracked by an
/// `(offset, key length, value length)` slot. `sort` reorders the slots by
/// comparing key bytes directly; iteration hands out lazy views into the
/// buffer.
///
/// # Ordering
///
/// - Keys follow the total value order, reversed for [`SortOrder::Desc`]
/// - Pairs with equal keys come out in insertion order
/// - Before the first `sort`, and after an `add` that follows it, iteration
///   yields insertion order
pub struct ExternalSorter {
    full: FullSerializer,
    buffer: SpillBuffer,
    slots: Vec<PairSlot>,
    order: SortOrder,
    sorted: bool,
    log_events: bool,
    metrics: Arc<CodecMetrics>,
}

impl ExternalSorter {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            full: FullSerializer::new(config),
            buffer: SpillBuffer::with_config(config),
            slots: Vec::new(),
            order: SortOrder::Asc,
            sorted: false,
            log_events: config.log_events,
            metrics: Arc::new(CodecMetrics::new()),
        }
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self.sorted = false;
        self
    }

    /// Reports into a registry shared with the caller.
    pub fn with_metrics(mut self, metrics: Arc<CodecMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<CodecMetrics> {
        &self.metrics
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Bytes of encoded keys and values held.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Appends one pair. On failure nothing is kept of it.
    pub fn add(&mut self, key: &Value, value: &Value) -> CodecResult<()> {
        let offset = self.buffer.len();
        let growths = self.buffer.growths();

        let written = self.write_pair(key, value);
        let grown = self.buffer.growths() - growths;
        if grown > 0 {
            self.metrics.add_buffer_growths(grown);
            if self.log_events {
                let capacity = self.buffer.capacity().to_string();
                log_event_with_fields(Event::SpillBufferGrow, &[("capacity", capacity.as_str())]);
            }
        }

        let key_len = match written {
            Ok(key_len) => key_len,
            Err(err) => {
                self.buffer.truncate(offset);
                if self.log_events {
                    self.log_rejected(&err);
                }
                return Err(err);
            }
        };

        let total = self.buffer.len() - offset;
        self.metrics.record_encoded(total as u64);
        self.slots.push(PairSlot {
            offset,
            key_len,
            value_len: total - key_len,
        });
        self.sorted = false;
        Ok(())
    }

    /// Writes key then value; returns the key's encoded length.
    fn write_pair(&mut self, key: &Value, value: &Value) -> CodecResult<usize> {
        let offset = self.buffer.len();
        self.full.write(&mut self.buffer, key)?;
        let key_len = self.buffer.len() - offset;
        self.full.write(&mut self.buffer, value)?;
        Ok(key_len)
    }

    fn log_rejected(&self, err: &CodecError) {
        let event = if err.is_schema_violation() {
            Event::SchemaViolation
        } else {
            Event::MalformedInput
        };
        let reason = err.to_string();
        log_event_with_fields(event, &[("code", err.code()), ("reason", reason.as_str())]);
    }

    fn key_bytes(&self, slot: &PairSlot) -> &[u8] {
        self.buffer.slice(slot.offset..slot.key_end())
    }

    /// Orders the pairs by key. With no pairs this is a no-op.
    ///
    /// A comparator error aborts the sort and is returned; every pair is
    /// still held exactly once, in an order unspecified until the next
    /// successful `sort`.
    pub fn sort(&mut self) -> CodecResult<()> {
        if self.slots.is_empty() {
            self.sorted = true;
            return Ok(());
        }

        let pairs = self.slots.len().to_string();
        let scope = ObservationScope::begin(
            Event::SortBegin,
            Event::SortComplete,
            Event::SortFailed,
            vec![("pairs", pairs), ("order", self.order.as_str().to_string())],
            self.log_events,
        );

        let mut slots = std::mem::take(&mut self.slots);
        let result = merge_sort_by(&mut slots, |a, b| {
            let ordering = self.full.compare_bytes(self.key_bytes(a), self.key_bytes(b))?;
            Ok(self.order.apply(ordering))
        });
        self.slots = slots;

        match result {
            Ok(comparisons) => {
                self.sorted = true;
                self.metrics.add_comparisons(comparisons);
                self.metrics.record_sort(self.slots.len() as u64);
                let comparisons = comparisons.to_string();
                scope.complete(&[("comparisons", comparisons.as_str())]);
                Ok(())
            }
            Err(err) => {
                self.sorted = false;
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    /// Forward-only iteration in the current pair order.
    pub fn iter(&self) -> SortedIter<'_> {
        SortedIter {
            sorter: self,
            pos: 0,
        }
    }

    /// Drops all pairs, keeping the buffer allocation.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.slots.clear();
        self.sorted = false;
    }

    fn pair_at(&self, slot: &PairSlot) -> SortedPair<'_> {
        let key = LazyValue::new(&self.full, self.key_bytes(slot)).with_metrics(&self.metrics);
        let value = LazyValue::new(&self.full, self.buffer.slice(slot.key_end()..slot.end()))
            .with_metrics(&self.metrics);
        SortedPair::new(key, value)
    }
}

impl<'a> IntoIterator for &'a ExternalSorter {
    type Item = SortedPair<'a>;
    type IntoIter = SortedIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the pairs of an [`ExternalSorter`]
pub struct SortedIter<'a> {
    sorter: &'a ExternalSorter,
    pos: usize,
}

impl<'a> Iterator for SortedIter<'a> {
    type Item = SortedPair<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.sorter.slots.get(self.pos)?;
        self.pos += 1;
        Some(self.sorter.pair_at(slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.sorter.slots.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SortedIter<'_> {}
