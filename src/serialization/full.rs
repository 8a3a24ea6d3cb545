//! Self-describing serializer
//!
//! Layout: `[tag: 1 byte][payload]`. Null is tag 0 with no payload. Atom
//! payloads are the basic layouts; containers are
//!
//! - record: `varint count`, then `(varint-len name, tagged value)` per field
//!   in name order
//! - array: `varint count`, then one tagged value per element
//!
//! Values of different tags compare by tag alone.

use std::cmp::Ordering;

use crate::config::CodecConfig;
use crate::io::{DataInput, DataOutput};
use crate::schema::SchemaValidator;
use crate::value::{EncodingTag, Value};

use super::atom::{self, Limits};
use super::errors::{CodecError, CodecResult};
use super::record::entry_slot;
use super::serializer::Serializer;

/// Schema-free serializer. Cheap to copy; build one from the startup
/// [`CodecConfig`] and hand it to whatever needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullSerializer {
    limits: Limits,
}

impl Default for FullSerializer {
    fn default() -> Self {
        Self::get_default()
    }
}

impl FullSerializer {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            limits: Limits::from_config(config),
        }
    }

    /// Serializer with default limits.
    pub fn get_default() -> Self {
        Self::new(&CodecConfig::default())
    }

    pub(crate) fn limits(&self) -> &Limits {
        &self.limits
    }

    pub(crate) fn read_tag<I: DataInput + ?Sized>(input: &mut I) -> CodecResult<EncodingTag> {
        let at = input.position();
        let byte = input.read_u8()?;
        EncodingTag::from_byte(byte).ok_or_else(|| CodecError::malformed(at, format!("invalid tag byte {:#04x}", byte)))
    }

    fn enter(&self, depth: usize, at: u64) -> CodecResult<()> {
        if depth >= self.limits.max_depth {
            return Err(CodecError::malformed(
                at,
                format!("nesting deeper than {}", self.limits.max_depth),
            ));
        }
        Ok(())
    }

    // ==================
    // Write
    // ==================

    /// Writes a tagged value without validating it first.
    pub(crate) fn write_value<O: DataOutput + ?Sized>(&self, out: &mut O, value: &Value) -> CodecResult<()> {
        out.write_u8(value.encoding_tag().as_byte())?;
        match value {
            Value::Record(record) => {
                out.write_varint(record.len() as u64)?;
                for (name, field) in record.iter() {
                    atom::write_str(out, name)?;
                    self.write_value(out, field)?;
                }
                Ok(())
            }
            Value::Array(items) => {
                out.write_varint(items.len() as u64)?;
                for item in items {
                    self.write_value(out, item)?;
                }
                Ok(())
            }
            atomic => atom::write_payload(out, atomic),
        }
    }

    // ==================
    // Read
    // ==================

    pub(crate) fn read_value<I: DataInput + ?Sized>(
        &self,
        input: &mut I,
        target: &mut Value,
        depth: usize,
    ) -> CodecResult<()> {
        let tag = Self::read_tag(input)?;
        self.read_body(tag, input, target, depth)
    }

    /// Reads the payload following an already consumed tag.
    pub(crate) fn read_body<I: DataInput + ?Sized>(
        &self,
        tag: EncodingTag,
        input: &mut I,
        target: &mut Value,
        depth: usize,
    ) -> CodecResult<()> {
        match tag {
            EncodingTag::Record => {
                self.enter(depth, input.position())?;
                if !matches!(target, Value::Record(_)) {
                    *target = Value::Record(Default::default());
                }
                let Value::Record(record) = target else {
                    return Ok(());
                };
                let entries = record.entries_mut();
                let result = self.read_fields(input, entries, depth);
                if result.is_err() {
                    entries.clear();
                }
                result
            }
            EncodingTag::Array => {
                self.enter(depth, input.position())?;
                if !matches!(target, Value::Array(_)) {
                    *target = Value::Array(Vec::new());
                }
                let Value::Array(items) = target else {
                    return Ok(());
                };
                let count = self.limits.read_len(input)?;
                for idx in 0..count {
                    if idx == items.len() {
                        items.push(Value::Null);
                    }
                    self.read_value(input, &mut items[idx], depth + 1)?;
                }
                items.truncate(count);
                Ok(())
            }
            atomic => atom::read_payload_into(atomic, input, target, &self.limits),
        }
    }

    /// Record entries; the caller clears them if this fails.
    fn read_fields<I: DataInput + ?Sized>(
        &self,
        input: &mut I,
        entries: &mut Vec<(String, Value)>,
        depth: usize,
    ) -> CodecResult<()> {
        let count = self.limits.read_len(input)?;
        for idx in 0..count {
            let at = input.position();
            let (name, _) = entry_slot(entries, idx);
            atom::read_str_into(input, name, &self.limits)?;
            if idx > 0 && entries[idx - 1].0 >= entries[idx].0 {
                return Err(CodecError::malformed(at, "record field names out of order"));
            }
            self.read_value(input, &mut entries[idx].1, depth + 1)?;
        }
        entries.truncate(count);
        Ok(())
    }

    // ==================
    // Skip / copy
    // ==================

    pub(crate) fn skip_value<I: DataInput + ?Sized>(&self, input: &mut I, depth: usize) -> CodecResult<()> {
        let tag = Self::read_tag(input)?;
        self.skip_body(tag, input, depth)
    }

    pub(crate) fn skip_body<I: DataInput + ?Sized>(
        &self,
        tag: EncodingTag,
        input: &mut I,
        depth: usize,
    ) -> CodecResult<()> {
        match tag {
            EncodingTag::Record => {
                self.enter(depth, input.position())?;
                let count = self.limits.read_len(input)?;
                for _ in 0..count {
                    let len = self.limits.read_len(input)?;
                    input.skip_bytes(len as u64)?;
                    self.skip_value(input, depth + 1)?;
                }
                Ok(())
            }
            EncodingTag::Array => {
                self.enter(depth, input.position())?;
                let count = self.limits.read_len(input)?;
                for _ in 0..count {
                    self.skip_value(input, depth + 1)?;
                }
                Ok(())
            }
            atomic => atom::skip_payload(atomic, input, &self.limits),
        }
    }

    pub(crate) fn copy_value<I, O>(&self, input: &mut I, out: &mut O, depth: usize) -> CodecResult<()>
    where
        I: DataInput + ?Sized,
        O: DataOutput + ?Sized,
    {
        let tag = Self::read_tag(input)?;
        out.write_u8(tag.as_byte())?;
        self.copy_body(tag, input, out, depth)
    }

    pub(crate) fn copy_body<I, O>(&self, tag: EncodingTag, input: &mut I, out: &mut O, depth: usize) -> CodecResult<()>
    where
        I: DataInput + ?Sized,
        O: DataOutput + ?Sized,
    {
        match tag {
            EncodingTag::Record => {
                self.enter(depth, input.position())?;
                let count = self.limits.read_len(input)?;
                out.write_varint(count as u64)?;
                for _ in 0..count {
                    atom::copy_blob(input, out, &self.limits)?;
                    self.copy_value(input, out, depth + 1)?;
                }
                Ok(())
            }
            EncodingTag::Array => {
                self.enter(depth, input.position())?;
                let count = self.limits.read_len(input)?;
                out.write_varint(count as u64)?;
                for _ in 0..count {
                    self.copy_value(input, out, depth + 1)?;
                }
                Ok(())
            }
            atomic => atom::copy_payload(atomic, input, out, &self.limits),
        }
    }

    // ==================
    // Compare
    // ==================

    pub(crate) fn compare_values<A, B>(&self, a: &mut A, b: &mut B, depth: usize) -> CodecResult<Ordering>
    where
        A: DataInput + ?Sized,
        B: DataInput + ?Sized,
    {
        let tag_a = Self::read_tag(a)?;
        let tag_b = Self::read_tag(b)?;
        if tag_a != tag_b {
            return Ok(tag_a.cmp(&tag_b));
        }
        self.compare_body(tag_a, a, b, depth)
    }

    /// Compares two payloads of the same tag. Records compare as sequences of
    /// `(name, value)` pairs, arrays element-wise; a prefix sorts first.
    pub(crate) fn compare_body<A, B>(&self, tag: EncodingTag, a: &mut A, b: &mut B, depth: usize) -> CodecResult<Ordering>
    where
        A: DataInput + ?Sized,
        B: DataInput + ?Sized,
    {
        match tag {
            EncodingTag::Record => {
                self.enter(depth, a.position())?;
                let count_a = self.limits.read_len(a)?;
                let count_b = self.limits.read_len(b)?;
                for _ in 0..count_a.min(count_b) {
                    let ord = atom::compare_blobs(a, b, &self.limits)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                    let ord = self.compare_values(a, b, depth + 1)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(count_a.cmp(&count_b))
            }
            EncodingTag::Array => {
                self.enter(depth, a.position())?;
                let count_a = self.limits.read_len(a)?;
                let count_b = self.limits.read_len(b)?;
                for _ in 0..count_a.min(count_b) {
                    let ord = self.compare_values(a, b, depth + 1)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(count_a.cmp(&count_b))
            }
            atomic => atom::compare_payloads(atomic, a, b, &self.limits),
        }
    }
}

impl Serializer for FullSerializer {
    fn encoding_tag(&self) -> Option<EncodingTag> {
        None
    }

    fn leading_tag(&self, encoded: &[u8]) -> Option<EncodingTag> {
        encoded.first().and_then(|byte| EncodingTag::from_byte(*byte))
    }

    fn read_into<I: DataInput + ?Sized>(&self, input: &mut I, target: &mut Value) -> CodecResult<()> {
        self.read_value(input, target, 0)
    }

    fn write<O: DataOutput + ?Sized>(&self, out: &mut O, value: &Value) -> CodecResult<()> {
        SchemaValidator::new(self.limits.max_depth).check_depth(value)?;
        self.write_value(out, value)
    }

    fn skip<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<()> {
        self.skip_value(input, 0)
    }

    fn compare<A, B>(&self, a: &mut A, b: &mut B) -> CodecResult<Ordering>
    where
        A: DataInput + ?Sized,
        B: DataInput + ?Sized,
    {
        self.compare_values(a, b, 0)
    }

    fn copy<I, O>(&self, input: &mut I, out: &mut O) -> CodecResult<()>
    where
        I: DataInput + ?Sized,
        O: DataOutput + ?Sized,
    {
        self.copy_value(input, out, 0)
    }
}
