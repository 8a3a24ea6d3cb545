//! Codec counters
//!
//! Monotonic `AtomicU64` counters with relaxed ordering. A registry can be
//! shared behind an `Arc` between a sorter and whoever reports on it.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct CodecMetrics {
    values_encoded: AtomicU64,
    values_decoded: AtomicU64,
    bytes_written: AtomicU64,
    comparisons: AtomicU64,
    sorts: AtomicU64,
    pairs_sorted: AtomicU64,
    buffer_growths: AtomicU64,
}

impl CodecMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_encoded(&self, bytes: u64) {
        self.values_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_decoded(&self) {
        self.values_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_comparisons(&self, n: u64) {
        self.comparisons.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_sort(&self, pairs: u64) {
        self.sorts.fetch_add(1, Ordering::Relaxed);
        self.pairs_sorted.fetch_add(pairs, Ordering::Relaxed);
    }

    pub fn add_buffer_growths(&self, n: u64) {
        self.buffer_growths.fetch_add(n, Ordering::Relaxed);
    }

    pub fn values_decoded(&self) -> u64 {
        self.values_decoded.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            values_encoded: self.values_encoded.load(Ordering::Relaxed),
            values_decoded: self.values_decoded.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            comparisons: self.comparisons.load(Ordering::Relaxed),
            sorts: self.sorts.load(Ordering::Relaxed),
            pairs_sorted: self.pairs_sorted.load(Ordering::Relaxed),
            buffer_growths: self.buffer_growths.load(Ordering::Relaxed),
        }
    }

    /// All counters as one JSON object, keys in declaration order.
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"values_encoded":{},"values_decoded":{},"bytes_written":{},"comparisons":{},"sorts":{},"pairs_sorted":{},"buffer_growths":{}}}"#,
            s.values_encoded,
            s.values_decoded,
            s.bytes_written,
            s.comparisons,
            s.sorts,
            s.pairs_sorted,
            s.buffer_growths,
        )
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub values_encoded: u64,
    pub values_decoded: u64,
    pub bytes_written: u64,
    pub comparisons: u64,
    pub sorts: u64,
    pub pairs_sorted: u64,
    pub buffer_growths: u64,
}
