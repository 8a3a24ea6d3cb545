//! Atom payload codec
//!
//! Untagged payload layouts, shared by the schema-bound and the
//! self-describing serializers:
//!
//! | Tag      | Payload                                           |
//! |----------|---------------------------------------------------|
//! | null     | nothing                                           |
//! | boolean  | 1 byte, 0 or 1                                    |
//! | long     | 8 bytes, big-endian two's complement              |
//! | double   | 8 bytes, big-endian IEEE 754 bits                 |
//! | date     | 8 bytes, big-endian epoch millis                  |
//! | span     | 8 bytes start, 8 bytes end                        |
//! | decimal  | varint zig-zag scale, varint len, BE signed bytes |
//! | string   | varint len, UTF-8 bytes                           |
//! | binary   | varint len, bytes                                 |
//! | regex    | string pattern, string flags                      |
//! | function | string name                                       |
//! | native   | string type name, binary payload                  |
//!
//! Comparison reads both sides field by field and never builds a `Value`,
//! except for decimals, whose order is numeric and needs the big integer.

use std::cmp::Ordering;

use num_bigint::BigInt;

use crate::config::CodecConfig;
use crate::io::varint::{zigzag_decode, zigzag_encode};
use crate::io::{DataInput, DataOutput};
use crate::value::{DateValue, Decimal, EncodingTag, FunctionRef, NativeValue, RegexValue, SpanValue, Value};

use super::errors::{CodecError, CodecResult};

const CHUNK: usize = 256;

/// Read-side limits derived from [`CodecConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Limits {
    pub max_length_prefix: u64,
    pub max_depth: usize,
}

impl Limits {
    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            max_length_prefix: config.max_length_prefix,
            max_depth: config.max_nesting_depth,
        }
    }

    /// Reads a length or count prefix and checks it against the limit.
    pub fn read_len<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<usize> {
        let at = input.position();
        let len = input.read_varint()?;
        if len > self.max_length_prefix {
            return Err(CodecError::malformed(
                at,
                format!("length prefix {} exceeds limit {}", len, self.max_length_prefix),
            ));
        }
        usize::try_from(len).map_err(|_| CodecError::malformed(at, format!("length prefix {} too large", len)))
    }
}

// ==================
// Write
// ==================

pub(crate) fn write_str<O: DataOutput + ?Sized>(out: &mut O, s: &str) -> CodecResult<()> {
    write_blob(out, s.as_bytes())
}

pub(crate) fn write_blob<O: DataOutput + ?Sized>(out: &mut O, bytes: &[u8]) -> CodecResult<()> {
    out.write_varint(bytes.len() as u64)?;
    out.write_bytes(bytes)
}

/// Writes the untagged payload of an atomic value.
pub(crate) fn write_payload<O: DataOutput + ?Sized>(out: &mut O, value: &Value) -> CodecResult<()> {
    match value {
        Value::Null => Ok(()),
        Value::Boolean(b) => out.write_u8(*b as u8),
        Value::Long(n) => out.write_i64(*n),
        Value::Double(d) => out.write_f64(*d),
        Value::Date(d) => out.write_i64(d.millis()),
        Value::Span(s) => {
            out.write_i64(s.start())?;
            out.write_i64(s.end())
        }
        Value::Decimal(d) => {
            out.write_varint(zigzag_encode(d.scale() as i64))?;
            write_blob(out, &d.unscaled().to_signed_bytes_be())
        }
        Value::String(s) => write_str(out, s),
        Value::Binary(b) => write_blob(out, b),
        Value::Regex(r) => {
            write_str(out, r.pattern())?;
            write_str(out, r.flags())
        }
        Value::Function(f) => write_str(out, f.name()),
        Value::Native(n) => {
            write_str(out, n.type_name())?;
            write_blob(out, n.payload())
        }
        Value::Record(_) | Value::Array(_) => {
            Err(CodecError::schema_violation("$", "atom", value.type_name()))
        }
    }
}

// ==================
// Read
// ==================

pub(crate) fn read_blob_into<I: DataInput + ?Sized>(
    input: &mut I,
    buf: &mut Vec<u8>,
    limits: &Limits,
) -> CodecResult<()> {
    let len = limits.read_len(input)?;
    input.read_bytes_into(len, buf)
}

/// Reads a length-prefixed UTF-8 string into `target`, reusing its buffer.
pub(crate) fn read_str_into<I: DataInput + ?Sized>(
    input: &mut I,
    target: &mut String,
    limits: &Limits,
) -> CodecResult<()> {
    let at = input.position();
    let mut buf = std::mem::take(target).into_bytes();
    read_blob_into(input, &mut buf, limits)?;
    *target = String::from_utf8(buf).map_err(|_| CodecError::malformed(at, "string is not valid UTF-8"))?;
    Ok(())
}

fn read_bool<I: DataInput + ?Sized>(input: &mut I) -> CodecResult<bool> {
    let at = input.position();
    match input.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::malformed(at, format!("invalid boolean byte {:#04x}", other))),
    }
}

fn read_span<I: DataInput + ?Sized>(input: &mut I) -> CodecResult<SpanValue> {
    let at = input.position();
    let start = input.read_i64()?;
    let end = input.read_i64()?;
    SpanValue::new(start, end)
        .ok_or_else(|| CodecError::malformed(at, format!("span start {} after end {}", start, end)))
}

fn read_decimal<I: DataInput + ?Sized>(input: &mut I, limits: &Limits) -> CodecResult<Decimal> {
    let at = input.position();
    let scale = zigzag_decode(input.read_varint()?);
    let scale = i32::try_from(scale).map_err(|_| CodecError::malformed(at, format!("decimal scale {} out of range", scale)))?;
    let mut bytes = Vec::new();
    read_blob_into(input, &mut bytes, limits)?;
    Ok(Decimal::new(BigInt::from_signed_bytes_be(&bytes), scale))
}

/// Reads the payload of an atom with a known tag into `target`.
///
/// Storage of `target` is reused when it already holds the same variant.
pub(crate) fn read_payload_into<I: DataInput + ?Sized>(
    tag: EncodingTag,
    input: &mut I,
    target: &mut Value,
    limits: &Limits,
) -> CodecResult<()> {
    match tag {
        EncodingTag::Null => *target = Value::Null,
        EncodingTag::Boolean => *target = Value::Boolean(read_bool(input)?),
        EncodingTag::Long => *target = Value::Long(input.read_i64()?),
        EncodingTag::Double => *target = Value::Double(input.read_f64()?),
        EncodingTag::Date => *target = Value::Date(DateValue::from_millis(input.read_i64()?)),
        EncodingTag::Span => *target = Value::Span(read_span(input)?),
        EncodingTag::Decimal => *target = Value::Decimal(read_decimal(input, limits)?),
        EncodingTag::String => {
            if !matches!(target, Value::String(_)) {
                *target = Value::String(String::new());
            }
            if let Value::String(s) = target {
                read_str_into(input, s, limits)?;
            }
        }
        EncodingTag::Binary => {
            if !matches!(target, Value::Binary(_)) {
                *target = Value::Binary(Vec::new());
            }
            if let Value::Binary(b) = target {
                read_blob_into(input, b, limits)?;
            }
        }
        EncodingTag::Regex => {
            if !matches!(target, Value::Regex(_)) {
                *target = Value::Regex(RegexValue::new("", ""));
            }
            if let Value::Regex(r) = target {
                let (pattern, flags) = r.parts_mut();
                read_str_into(input, pattern, limits)?;
                read_str_into(input, flags, limits)?;
            }
        }
        EncodingTag::Function => {
            if !matches!(target, Value::Function(_)) {
                *target = Value::Function(FunctionRef::new(""));
            }
            if let Value::Function(f) = target {
                read_str_into(input, f.name_mut(), limits)?;
            }
        }
        EncodingTag::Native => {
            if !matches!(target, Value::Native(_)) {
                *target = Value::Native(NativeValue::new("", Vec::new()));
            }
            if let Value::Native(n) = target {
                let (type_name, payload) = n.parts_mut();
                read_str_into(input, type_name, limits)?;
                read_blob_into(input, payload, limits)?;
            }
        }
        EncodingTag::Record | EncodingTag::Array => {
            return Err(CodecError::type_mismatch(input.position(), "atom", tag));
        }
    }
    Ok(())
}

// ==================
// Skip / copy
// ==================

fn skip_blob<I: DataInput + ?Sized>(input: &mut I, limits: &Limits) -> CodecResult<()> {
    let len = limits.read_len(input)?;
    input.skip_bytes(len as u64)
}

/// Advances past an atom payload without decoding it.
pub(crate) fn skip_payload<I: DataInput + ?Sized>(tag: EncodingTag, input: &mut I, limits: &Limits) -> CodecResult<()> {
    if let Some(width) = tag.fixed_width() {
        return input.skip_bytes(width as u64);
    }
    match tag {
        EncodingTag::String | EncodingTag::Binary | EncodingTag::Function => skip_blob(input, limits),
        EncodingTag::Regex | EncodingTag::Native => {
            skip_blob(input, limits)?;
            skip_blob(input, limits)
        }
        EncodingTag::Decimal => {
            input.read_varint()?;
            skip_blob(input, limits)
        }
        _ => Err(CodecError::type_mismatch(input.position(), "atom", tag)),
    }
}

pub(crate) fn copy_bytes<I, O>(input: &mut I, out: &mut O, n: u64) -> CodecResult<()>
where
    I: DataInput + ?Sized,
    O: DataOutput + ?Sized,
{
    let mut buf = [0u8; CHUNK];
    let mut remaining = n;
    while remaining > 0 {
        let chunk = remaining.min(CHUNK as u64) as usize;
        input.read_exact_into(&mut buf[..chunk])?;
        out.write_bytes(&buf[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(())
}

pub(crate) fn copy_blob<I, O>(input: &mut I, out: &mut O, limits: &Limits) -> CodecResult<()>
where
    I: DataInput + ?Sized,
    O: DataOutput + ?Sized,
{
    let len = limits.read_len(input)?;
    out.write_varint(len as u64)?;
    copy_bytes(input, out, len as u64)
}

/// Copies an atom payload verbatim.
pub(crate) fn copy_payload<I, O>(tag: EncodingTag, input: &mut I, out: &mut O, limits: &Limits) -> CodecResult<()>
where
    I: DataInput + ?Sized,
    O: DataOutput + ?Sized,
{
    match tag {
        // validated on the way through
        EncodingTag::Boolean => out.write_u8(read_bool(input)? as u8),
        EncodingTag::Span => {
            let span = read_span(input)?;
            out.write_i64(span.start())?;
            out.write_i64(span.end())
        }
        EncodingTag::String => {
            let mut s = String::new();
            read_str_into(input, &mut s, limits)?;
            write_str(out, &s)
        }
        EncodingTag::Binary => copy_blob(input, out, limits),
        EncodingTag::Decimal => {
            let at = input.position();
            let scale = input.read_varint()?;
            if i32::try_from(zigzag_decode(scale)).is_err() {
                return Err(CodecError::malformed(at, "decimal scale out of range"));
            }
            out.write_varint(scale)?;
            copy_blob(input, out, limits)
        }
        EncodingTag::Regex | EncodingTag::Function | EncodingTag::Native => {
            let mut scratch = Value::Null;
            read_payload_into(tag, input, &mut scratch, limits)?;
            write_payload(out, &scratch)
        }
        _ => match tag.fixed_width() {
            Some(width) => copy_bytes(input, out, width as u64),
            None => Err(CodecError::type_mismatch(input.position(), "atom", tag)),
        },
    }
}

// ==================
// Compare
// ==================

/// Compares two length-prefixed byte strings chunk by chunk: unsigned byte
/// order, shorter prefix first. Both sides are fully consumed when equal.
pub(crate) fn compare_blobs<A, B>(a: &mut A, b: &mut B, limits: &Limits) -> CodecResult<Ordering>
where
    A: DataInput + ?Sized,
    B: DataInput + ?Sized,
{
    let len_a = limits.read_len(a)?;
    let len_b = limits.read_len(b)?;
    let common = len_a.min(len_b);

    let mut buf_a = [0u8; CHUNK];
    let mut buf_b = [0u8; CHUNK];
    let mut done = 0;
    while done < common {
        let n = (common - done).min(CHUNK);
        a.read_exact_into(&mut buf_a[..n])?;
        b.read_exact_into(&mut buf_b[..n])?;
        let ord = buf_a[..n].cmp(&buf_b[..n]);
        if ord != Ordering::Equal {
            return Ok(ord);
        }
        done += n;
    }
    Ok(len_a.cmp(&len_b))
}

/// Decode-free comparison of two atom payloads of the same tag. Agrees with
/// [`Value::compare_to`].
pub(crate) fn compare_payloads<A, B>(tag: EncodingTag, a: &mut A, b: &mut B, limits: &Limits) -> CodecResult<Ordering>
where
    A: DataInput + ?Sized,
    B: DataInput + ?Sized,
{
    match tag {
        EncodingTag::Null => Ok(Ordering::Equal),
        EncodingTag::Boolean => Ok(read_bool(a)?.cmp(&read_bool(b)?)),
        EncodingTag::Long | EncodingTag::Date => Ok(a.read_i64()?.cmp(&b.read_i64()?)),
        EncodingTag::Double => Ok(a.read_f64()?.total_cmp(&b.read_f64()?)),
        EncodingTag::Span => {
            let sa = read_span(a)?;
            let sb = read_span(b)?;
            Ok(sa.cmp(&sb))
        }
        EncodingTag::Decimal => {
            let da = read_decimal(a, limits)?;
            let db = read_decimal(b, limits)?;
            Ok(da.numeric_cmp(&db))
        }
        EncodingTag::String | EncodingTag::Binary | EncodingTag::Function => compare_blobs(a, b, limits),
        EncodingTag::Regex | EncodingTag::Native => {
            let first = compare_blobs(a, b, limits)?;
            if first != Ordering::Equal {
                return Ok(first);
            }
            compare_blobs(a, b, limits)
        }
        EncodingTag::Record | EncodingTag::Array => Err(CodecError::type_mismatch(a.position(), "atom", tag)),
    }
}
