//! Byte-stream outputs

use std::io::Write;

use crate::serialization::CodecResult;

use super::varint;

/// Synchronous sink for encoded bytes. Fixed-width integers are big-endian.
pub trait DataOutput {
    /// Number of bytes written so far.
    fn position(&self) -> u64;

    fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()>;

    fn write_u8(&mut self, byte: u8) -> CodecResult<()> {
        self.write_bytes(&[byte])
    }

    fn write_fixed64(&mut self, value: u64) -> CodecResult<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_i64(&mut self, value: i64) -> CodecResult<()> {
        self.write_fixed64(value as u64)
    }

    fn write_f64(&mut self, value: f64) -> CodecResult<()> {
        self.write_fixed64(value.to_bits())
    }

    fn write_varint(&mut self, value: u64) -> CodecResult<()> {
        varint::write_varint(self, value)
    }
}

impl DataOutput for Vec<u8> {
    fn position(&self) -> u64 {
        self.len() as u64
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn write_u8(&mut self, byte: u8) -> CodecResult<()> {
        self.push(byte);
        Ok(())
    }
}

/// Output over any [`Write`] implementation.
///
/// Bytes already handed to the writer are not rolled back when a later
/// write fails.
pub struct WriterOutput<W> {
    inner: W,
    pos: u64,
}

impl<W: Write> WriterOutput<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, pos: 0 }
    }

    pub fn flush(&mut self) -> CodecResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> DataOutput for WriterOutput<W> {
    fn position(&self) -> u64 {
        self.pos
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.inner.write_all(bytes)?;
        self.pos += bytes.len() as u64;
        Ok(())
    }
}
