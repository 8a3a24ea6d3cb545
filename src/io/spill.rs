//! Growable spill buffer
//!
//! Accumulates encoded bytes for the sorter and for spilled arrays.
//!
//! # Invariants
//!
//! - Capacity grows geometrically (doubling), never by a fixed increment
//! - Growth past the configured limit fails fast with `CapacityExceeded`
//! - Nothing is ever truncated

use std::ops::Range;

use crate::config::CodecConfig;
use crate::serialization::{CodecError, CodecResult};

use super::DataOutput;

const MIN_CAPACITY: usize = 64;

/// Append-only byte buffer with a hard size limit.
#[derive(Debug, Clone)]
pub struct SpillBuffer {
    data: Vec<u8>,
    limit: u64,
    growths: u64,
}

impl SpillBuffer {
    pub fn new(initial_capacity: usize, limit: u64) -> Self {
        let initial = (initial_capacity as u64).min(limit) as usize;
        Self {
            data: Vec::with_capacity(initial),
            limit,
            growths: 0,
        }
    }

    /// Buffer sized by the sorter settings of `config`.
    pub fn with_config(config: &CodecConfig) -> Self {
        Self::new(config.sort_buffer_initial_capacity, config.sort_buffer_max_bytes)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of reallocations so far.
    pub fn growths(&self) -> u64 {
        self.growths
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        &self.data[range]
    }

    /// Drops the contents but keeps the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Discards everything written after `len`.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Makes room for `additional` bytes, doubling the capacity as needed.
    pub fn reserve(&mut self, additional: usize) -> CodecResult<()> {
        let needed = self.data.len() as u64 + additional as u64;
        if needed > self.limit {
            return Err(CodecError::capacity_exceeded(needed, self.limit));
        }
        let capacity = self.data.capacity() as u64;
        if needed <= capacity {
            return Ok(());
        }
        let mut target = capacity.max(MIN_CAPACITY as u64);
        while target < needed {
            target = target.saturating_mul(2);
        }
        let target = target.min(self.limit) as usize;
        self.data.reserve_exact(target - self.data.len());
        self.growths += 1;
        Ok(())
    }
}

impl DataOutput for SpillBuffer {
    fn position(&self) -> u64 {
        self.data.len() as u64
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }
}
