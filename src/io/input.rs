//! Byte-stream inputs
//!
//! [`DataInput`] is the read side of the byte stream API. Serializers only
//! need exact reads, skips and the current position; position is what the
//! comparator contract is stated in terms of.

use std::io::{self, Read};

use crate::serialization::{CodecError, CodecResult};

use super::varint;

/// Largest step a generic input grows a byte buffer by before the bytes
/// have actually arrived.
const READ_CHUNK: usize = 64 * 1024;

/// Synchronous source of encoded bytes.
///
/// Fixed-width integers are big-endian.
pub trait DataInput {
    /// Number of bytes consumed so far.
    fn position(&self) -> u64;

    /// Fills `buf` completely or fails with a malformed-encoding error.
    fn read_exact_into(&mut self, buf: &mut [u8]) -> CodecResult<()>;

    /// Advances past `n` bytes without returning them.
    fn skip_bytes(&mut self, n: u64) -> CodecResult<()> {
        let mut scratch = [0u8; 256];
        let mut remaining = n;
        while remaining > 0 {
            let chunk = remaining.min(scratch.len() as u64) as usize;
            self.read_exact_into(&mut scratch[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    fn read_u8(&mut self) -> CodecResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact_into(&mut buf)?;
        Ok(buf[0])
    }

    fn read_fixed64(&mut self) -> CodecResult<u64> {
        let mut buf = [0u8; 8];
        self.read_exact_into(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    fn read_i64(&mut self) -> CodecResult<i64> {
        Ok(self.read_fixed64()? as i64)
    }

    fn read_f64(&mut self) -> CodecResult<f64> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    fn read_varint(&mut self) -> CodecResult<u64> {
        varint::read_varint(self)
    }

    /// Replaces the contents of `buf` with the next `n` bytes, reusing its
    /// allocation. The buffer grows with the bytes read, not with `n`.
    fn read_bytes_into(&mut self, n: usize, buf: &mut Vec<u8>) -> CodecResult<()> {
        buf.clear();
        while buf.len() < n {
            let filled = buf.len();
            let step = (n - filled).min(READ_CHUNK);
            buf.resize(filled + step, 0);
            if let Err(e) = self.read_exact_into(&mut buf[filled..]) {
                buf.truncate(filled);
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Input over an in-memory slice. Reads borrow from the slice, so lazy values
/// can keep a view of the bytes they were read from.
#[derive(Debug, Clone)]
pub struct SliceInput<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceInput<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Starts reading `data` at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Bytes between two absolute offsets of the underlying slice.
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.data[start.min(self.data.len())..end.min(self.data.len())]
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Consumes and borrows the next `n` bytes.
    pub fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::unexpected_eof(self.pos as u64, n - self.remaining()));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }
}

impl DataInput for SliceInput<'_> {
    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> CodecResult<()> {
        let bytes = self.take(buf.len())?;
        buf.copy_from_slice(bytes);
        Ok(())
    }

    fn skip_bytes(&mut self, n: u64) -> CodecResult<()> {
        let n = usize::try_from(n)
            .map_err(|_| CodecError::unexpected_eof(self.pos as u64, usize::MAX))?;
        self.take(n).map(|_| ())
    }

    fn read_bytes_into(&mut self, n: usize, buf: &mut Vec<u8>) -> CodecResult<()> {
        buf.clear();
        let bytes = self.take(n)?;
        buf.extend_from_slice(bytes);
        Ok(())
    }

    fn read_u8(&mut self) -> CodecResult<u8> {
        match self.data.get(self.pos) {
            Some(byte) => {
                self.pos += 1;
                Ok(*byte)
            }
            None => Err(CodecError::unexpected_eof(self.pos as u64, 1)),
        }
    }
}

/// Input over any [`Read`] implementation (file, socket, shuffle segment).
///
/// Blocking, if any, happens inside the wrapped reader.
pub struct ReaderInput<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> ReaderInput<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> DataInput for ReaderInput<R> {
    fn position(&self) -> u64 {
        self.pos
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> CodecResult<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(CodecError::unexpected_eof(self.pos, buf.len()))
            }
            Err(e) => Err(CodecError::Io(e)),
        }
    }

    fn read_bytes_into(&mut self, n: usize, buf: &mut Vec<u8>) -> CodecResult<()> {
        buf.clear();
        let read = (&mut self.inner).take(n as u64).read_to_end(buf)?;
        self.pos += read as u64;
        if read < n {
            return Err(CodecError::unexpected_eof(self.pos, n - read));
        }
        Ok(())
    }

    fn skip_bytes(&mut self, n: u64) -> CodecResult<()> {
        let copied = io::copy(&mut (&mut self.inner).take(n), &mut io::sink())?;
        self.pos += copied;
        if copied < n {
            return Err(CodecError::unexpected_eof(self.pos, (n - copied) as usize));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_input_tracks_position() {
        let data = [0u8, 0, 0, 0, 0, 0, 0, 42, 7];
        let mut input = SliceInput::new(&data);
        assert_eq!(input.read_i64().unwrap(), 42);
        assert_eq!(input.position(), 8);
        assert_eq!(input.read_u8().unwrap(), 7);
        assert!(input.is_exhausted());
    }

    #[test]
    fn test_slice_input_eof_is_malformed() {
        let data = [1u8, 2, 3];
        let mut input = SliceInput::new(&data);
        let err = input.read_fixed64().unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("byte 0"));
    }

    #[test]
    fn test_reader_input_matches_slice_input() {
        let data = [0x80u8, 0x01, 9, 9, 9, 5];
        let mut slice = SliceInput::new(&data);
        let mut reader = ReaderInput::new(&data[..]);

        assert_eq!(slice.read_varint().unwrap(), 128);
        assert_eq!(reader.read_varint().unwrap(), 128);
        slice.skip_bytes(3).unwrap();
        reader.skip_bytes(3).unwrap();
        assert_eq!(slice.position(), reader.position());
        assert_eq!(slice.read_u8().unwrap(), reader.read_u8().unwrap());
    }

    #[test]
    fn test_reader_skip_past_end_fails() {
        let data = [1u8, 2];
        let mut reader = ReaderInput::new(&data[..]);
        assert!(reader.skip_bytes(5).unwrap_err().is_malformed());
    }

    #[test]
    fn test_read_bytes_into_reuses_buffer() {
        let data = b"abcdef";
        let mut input = SliceInput::new(data);
        let mut buf = Vec::with_capacity(16);
        input.read_bytes_into(3, &mut buf).unwrap();
        assert_eq!(buf, b"abc");
        input.read_bytes_into(2, &mut buf).unwrap();
        assert_eq!(buf, b"de");
    }

    #[test]
    fn test_long_length_on_short_input_allocates_nothing_large() {
        let data = [7u8; 5];
        let mut buf = Vec::new();

        let mut slice = SliceInput::new(&data);
        assert!(slice.read_bytes_into(900_000_000, &mut buf).unwrap_err().is_malformed());
        assert!(buf.capacity() < 1024);

        let mut reader = ReaderInput::new(&data[..]);
        let err = reader.read_bytes_into(900_000_000, &mut buf).unwrap_err();
        assert!(err.is_malformed());
        assert!(buf.capacity() < 1024);
        assert_eq!(reader.position(), 5);
    }

    /// Input that only implements the required methods.
    struct Chunked<'a>(SliceInput<'a>);

    impl DataInput for Chunked<'_> {
        fn position(&self) -> u64 {
            self.0.position()
        }

        fn read_exact_into(&mut self, buf: &mut [u8]) -> CodecResult<()> {
            self.0.read_exact_into(buf)
        }
    }

    #[test]
    fn test_default_read_bytes_grows_in_steps() {
        let data = vec![3u8; READ_CHUNK + 10];
        let mut buf = Vec::new();

        let mut input = Chunked(SliceInput::new(&data));
        input.read_bytes_into(READ_CHUNK + 10, &mut buf).unwrap();
        assert_eq!(buf.len(), READ_CHUNK + 10);

        let mut short = Chunked(SliceInput::new(&data[..10]));
        assert!(short.read_bytes_into(usize::MAX / 2, &mut buf).unwrap_err().is_malformed());
        assert!(buf.capacity() <= 2 * (READ_CHUNK + 10));
    }
}
