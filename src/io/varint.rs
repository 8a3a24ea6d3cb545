//! Unsigned variable-length integers
//!
//! Least-significant 7-bit group first; the high bit of each byte signals
//! that another byte follows. A `u64` takes at most 10 bytes. Overlong or
//! overflowing encodings are rejected as malformed.

use crate::serialization::{CodecError, CodecResult};

use super::{DataInput, DataOutput};

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Encodes `value` into `buf`, returning the number of bytes used.
pub fn encode_varint(mut value: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

/// Number of bytes `value` occupies when encoded.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

pub fn write_varint<O: DataOutput + ?Sized>(out: &mut O, value: u64) -> CodecResult<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let n = encode_varint(value, &mut buf);
    out.write_bytes(&buf[..n])
}

pub fn read_varint<I: DataInput + ?Sized>(input: &mut I) -> CodecResult<u64> {
    let start = input.position();
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT_LEN {
        let byte = input.read_u8()?;
        let group = (byte & 0x7F) as u64;
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(CodecError::malformed(start, "varint overflows 64 bits"));
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::malformed(start, "varint longer than 10 bytes"))
}

/// Copies one varint verbatim, returning its value.
pub fn copy_varint<I, O>(input: &mut I, out: &mut O) -> CodecResult<u64>
where
    I: DataInput + ?Sized,
    O: DataOutput + ?Sized,
{
    let value = read_varint(input)?;
    write_varint(out, value)?;
    Ok(value)
}

/// Zig-zag maps signed integers onto unsigned ones so that small magnitudes
/// stay short.
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceInput;

    fn encoded(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, value).unwrap();
        out
    }

    #[test]
    fn test_small_values_take_one_byte() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(3), vec![0x03]);
        assert_eq!(encoded(127), vec![0x7F]);
    }

    #[test]
    fn test_least_significant_group_first() {
        assert_eq!(encoded(128), vec![0x80, 0x01]);
        assert_eq!(encoded(300), vec![0xAC, 0x02]);
    }

    #[test]
    fn test_max_value_takes_ten_bytes() {
        let bytes = encoded(u64::MAX);
        assert_eq!(bytes.len(), MAX_VARINT_LEN);
        assert_eq!(read_varint(&mut SliceInput::new(&bytes)).unwrap(), u64::MAX);
    }

    #[test]
    fn test_varint_len_matches_encoding() {
        for v in [0, 1, 127, 128, 16_383, 16_384, 1 << 35, u64::MAX] {
            assert_eq!(varint_len(v), encoded(v).len(), "value {}", v);
        }
    }

    #[test]
    fn test_overflow_rejected() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        let err = read_varint(&mut SliceInput::new(&bytes)).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_overlong_rejected() {
        let bytes = [0x80u8; 11];
        assert!(read_varint(&mut SliceInput::new(&bytes)).unwrap_err().is_malformed());
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = [0x80, 0x80];
        assert!(read_varint(&mut SliceInput::new(&bytes)).unwrap_err().is_malformed());
    }

    #[test]
    fn test_zigzag() {
        for v in [0i64, -1, 1, -64, 64, i64::MIN, i64::MAX] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
    }
}
