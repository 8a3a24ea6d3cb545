//! Schema-bound record codec
//!
//! Layout:
//!
//! ```text
//! [presence bitmap]           ceil(optional / 8) bytes, bit i = i-th optional
//!                             field in name order, LSB first; padding bits 0
//! [field payloads]            required and present optional fields, name order
//! [varint count]              only with a wildcard schema
//! [(varint-len name, payload)] per undeclared field, name order
//! ```

use std::cmp::Ordering;

use crate::io::{DataInput, DataOutput, SliceInput};
use crate::schema::{FieldDef, Schema};
use crate::value::{Record, Value};

use super::atom::{self, Limits};
use super::basic::Node;
use super::errors::{CodecError, CodecResult};
use super::full::FullSerializer;

/// Returns entry `idx`, appending a blank one when `idx` is one past the end.
pub(crate) fn entry_slot(entries: &mut Vec<(String, Value)>, idx: usize) -> &mut (String, Value) {
    if idx == entries.len() {
        entries.push((String::new(), Value::Null));
    }
    &mut entries[idx]
}

#[derive(Debug, Clone)]
struct FieldCodec {
    name: String,
    node: Node,
    /// Bit position in the presence bitmap, `None` for required fields
    slot: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordCodec {
    fields: Vec<FieldCodec>,
    optional: usize,
    rest: Option<Node>,
    limits: Limits,
}

impl RecordCodec {
    /// `fields` must be sorted by name.
    pub fn build(fields: &[FieldDef], rest: Option<&Schema>, full: FullSerializer) -> Self {
        let mut optional = 0;
        let fields = fields
            .iter()
            .map(|field| {
                let slot = if field.optional {
                    optional += 1;
                    Some(optional - 1)
                } else {
                    None
                };
                FieldCodec {
                    name: field.name.clone(),
                    node: Node::build(&field.schema, full),
                    slot,
                }
            })
            .collect();
        Self {
            fields,
            optional,
            rest: rest.map(|schema| Node::build(schema, full)),
            limits: *full.limits(),
        }
    }

    fn bitmap_len(&self) -> usize {
        self.optional.div_ceil(8)
    }

    fn is_declared(&self, name: &str) -> bool {
        self.fields
            .binary_search_by(|field| field.name.as_str().cmp(name))
            .is_ok()
    }

    fn is_present(field: &FieldCodec, bitmap: &[u8]) -> bool {
        match field.slot {
            Some(slot) => bitmap[slot / 8] & (1 << (slot % 8)) != 0,
            None => true,
        }
    }

    fn read_bitmap<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<Vec<u8>> {
        let at = input.position();
        let mut bitmap = vec![0u8; self.bitmap_len()];
        input.read_exact_into(&mut bitmap)?;
        let used = self.optional % 8;
        let padding = match bitmap.last() {
            Some(&last) if used != 0 => last >> used,
            _ => 0,
        };
        if padding != 0 {
            return Err(CodecError::malformed(at, "presence bitmap has padding bits set"));
        }
        Ok(bitmap)
    }

    // ==================
    // Write
    // ==================

    pub fn write<O: DataOutput + ?Sized>(&self, out: &mut O, record: &Record) -> CodecResult<()> {
        if self.optional > 0 {
            let mut bitmap = vec![0u8; self.bitmap_len()];
            for field in &self.fields {
                if let Some(slot) = field.slot {
                    if record.contains(&field.name) {
                        bitmap[slot / 8] |= 1 << (slot % 8);
                    }
                }
            }
            out.write_bytes(&bitmap)?;
        }

        for field in &self.fields {
            match record.get(&field.name) {
                Some(value) => field.node.write(out, value)?,
                None if field.slot.is_some() => {}
                None => {
                    return Err(CodecError::schema_violation(
                        format!("$.{}", field.name),
                        "field to be present",
                        "missing",
                    ))
                }
            }
        }

        if let Some(rest) = &self.rest {
            let count = record.names().filter(|name| !self.is_declared(name)).count();
            out.write_varint(count as u64)?;
            for (name, value) in record.iter().filter(|(name, _)| !self.is_declared(name)) {
                atom::write_str(out, name)?;
                rest.write(out, value)?;
            }
        }
        Ok(())
    }

    // ==================
    // Read
    // ==================

    /// On error the target record is left empty.
    pub fn read_into<I: DataInput + ?Sized>(&self, input: &mut I, target: &mut Value) -> CodecResult<()> {
        if !matches!(target, Value::Record(_)) {
            *target = Value::Record(Record::new());
        }
        let Value::Record(record) = target else {
            return Ok(());
        };
        let entries = record.entries_mut();
        let result = self.read_entries(input, entries);
        if result.is_err() {
            entries.clear();
        }
        result
    }

    fn read_entries<I: DataInput + ?Sized>(&self, input: &mut I, entries: &mut Vec<(String, Value)>) -> CodecResult<()> {
        let bitmap = self.read_bitmap(input)?;
        let mut idx = 0;
        for field in &self.fields {
            if !Self::is_present(field, &bitmap) {
                continue;
            }
            let (name, value) = entry_slot(entries, idx);
            name.clear();
            name.push_str(&field.name);
            field.node.read_into(input, value)?;
            idx += 1;
        }

        let declared = idx;
        if let Some(rest) = &self.rest {
            let count = self.limits.read_len(input)?;
            for _ in 0..count {
                let at = input.position();
                let (name, value) = entry_slot(entries, idx);
                atom::read_str_into(input, name, &self.limits)?;
                if self.is_declared(name) {
                    return Err(CodecError::malformed(at, format!("wildcard field '{}' is declared", name)));
                }
                rest.read_into(input, value)?;
                if idx > declared && entries[idx - 1].0 >= entries[idx].0 {
                    return Err(CodecError::malformed(at, "wildcard fields out of order"));
                }
                idx += 1;
            }
        }
        entries.truncate(idx);

        if idx > declared {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Ok(())
    }

    pub fn skip<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<()> {
        let bitmap = self.read_bitmap(input)?;
        for field in &self.fields {
            if Self::is_present(field, &bitmap) {
                field.node.skip(input)?;
            }
        }
        if let Some(rest) = &self.rest {
            let count = self.limits.read_len(input)?;
            for _ in 0..count {
                let len = self.limits.read_len(input)?;
                input.skip_bytes(len as u64)?;
                rest.skip(input)?;
            }
        }
        Ok(())
    }

    pub fn copy<I, O>(&self, input: &mut I, out: &mut O) -> CodecResult<()>
    where
        I: DataInput + ?Sized,
        O: DataOutput + ?Sized,
    {
        let bitmap = self.read_bitmap(input)?;
        out.write_bytes(&bitmap)?;
        for field in &self.fields {
            if Self::is_present(field, &bitmap) {
                field.node.copy(input, out)?;
            }
        }
        if let Some(rest) = &self.rest {
            let count = self.limits.read_len(input)?;
            out.write_varint(count as u64)?;
            for _ in 0..count {
                atom::copy_blob(input, out, &self.limits)?;
                rest.copy(input, out)?;
            }
        }
        Ok(())
    }

    // ==================
    // Compare
    // ==================

    /// Orders records as sequences of `(name, value)` pairs.
    ///
    /// Without a wildcard this reads only the bitmaps and the payloads of
    /// fields present on both sides. Where presence first differs, the side
    /// holding the field is less if the other side has any later field (its
    /// next name sorts after), and greater otherwise (the other side is a
    /// prefix). Wildcard records are merged by name, see `compare_open`.
    pub fn compare<A, B>(&self, a: &mut A, b: &mut B) -> CodecResult<Ordering>
    where
        A: DataInput + ?Sized,
        B: DataInput + ?Sized,
    {
        if let Some(rest) = &self.rest {
            return self.compare_open(rest, a, b);
        }

        let bitmap_a = self.read_bitmap(a)?;
        let bitmap_b = self.read_bitmap(b)?;
        for (i, field) in self.fields.iter().enumerate() {
            let in_a = Self::is_present(field, &bitmap_a);
            let in_b = Self::is_present(field, &bitmap_b);
            match (in_a, in_b) {
                (true, true) => {
                    let ord = field.node.compare(a, b)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                (false, false) => {}
                (true, false) => {
                    let b_has_later = self.fields[i + 1..].iter().any(|f| Self::is_present(f, &bitmap_b));
                    return Ok(if b_has_later { Ordering::Less } else { Ordering::Greater });
                }
                (false, true) => {
                    let a_has_later = self.fields[i + 1..].iter().any(|f| Self::is_present(f, &bitmap_a));
                    return Ok(if a_has_later { Ordering::Greater } else { Ordering::Less });
                }
            }
        }
        Ok(Ordering::Equal)
    }
}

/// One side of an open-record comparison. Declared payloads precede the
/// wildcard section on the wire, so their bytes are copied out (not decoded)
/// before merging the two name-ordered sequences.
struct OpenSide {
    /// `(field index, start, end)` into `bytes`, in name order
    declared: Vec<(usize, usize, usize)>,
    bytes: Vec<u8>,
    next_declared: usize,
    wildcard_left: usize,
    wildcard_name: Option<String>,
    last_wildcard: Option<String>,
}

#[derive(Clone, Copy)]
enum OpenEntry {
    Declared,
    Wildcard,
}

impl RecordCodec {
    fn open_side<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<OpenSide> {
        let bitmap = self.read_bitmap(input)?;
        let mut declared = Vec::new();
        let mut bytes = Vec::new();
        for (idx, field) in self.fields.iter().enumerate() {
            if Self::is_present(field, &bitmap) {
                let start = bytes.len();
                field.node.copy(input, &mut bytes)?;
                declared.push((idx, start, bytes.len()));
            }
        }
        let wildcard_left = self.limits.read_len(input)?;
        Ok(OpenSide {
            declared,
            bytes,
            next_declared: 0,
            wildcard_left,
            wildcard_name: None,
            last_wildcard: None,
        })
    }

    /// Reads the next wildcard name if none is pending.
    fn peek_wildcard<I: DataInput + ?Sized>(&self, side: &mut OpenSide, input: &mut I) -> CodecResult<()> {
        if side.wildcard_name.is_some() || side.wildcard_left == 0 {
            return Ok(());
        }
        let at = input.position();
        let mut name = String::new();
        atom::read_str_into(input, &mut name, &self.limits)?;
        if self.is_declared(&name) {
            return Err(CodecError::malformed(at, format!("wildcard field '{}' is declared", name)));
        }
        if side.last_wildcard.as_deref().is_some_and(|prev| name.as_str() <= prev) {
            return Err(CodecError::malformed(at, "wildcard fields out of order"));
        }
        side.wildcard_left -= 1;
        side.wildcard_name = Some(name);
        Ok(())
    }

    /// Name and kind of the side's next entry in merged name order.
    fn open_next<'s>(&'s self, side: &'s OpenSide) -> Option<(&'s str, OpenEntry)> {
        let declared = side
            .declared
            .get(side.next_declared)
            .map(|(idx, _, _)| self.fields[*idx].name.as_str());
        match (declared, side.wildcard_name.as_deref()) {
            (Some(d), Some(w)) if w < d => Some((w, OpenEntry::Wildcard)),
            (Some(d), _) => Some((d, OpenEntry::Declared)),
            (None, Some(w)) => Some((w, OpenEntry::Wildcard)),
            (None, None) => None,
        }
    }

    fn compare_open<A, B>(&self, rest: &Node, a: &mut A, b: &mut B) -> CodecResult<Ordering>
    where
        A: DataInput + ?Sized,
        B: DataInput + ?Sized,
    {
        let mut side_a = self.open_side(a)?;
        let mut side_b = self.open_side(b)?;
        loop {
            self.peek_wildcard(&mut side_a, a)?;
            self.peek_wildcard(&mut side_b, b)?;

            let (kind_a, kind_b) = match (self.open_next(&side_a), self.open_next(&side_b)) {
                (None, None) => return Ok(Ordering::Equal),
                (None, Some(_)) => return Ok(Ordering::Less),
                (Some(_), None) => return Ok(Ordering::Greater),
                (Some((name_a, kind_a)), Some((name_b, kind_b))) => {
                    let ord = name_a.cmp(name_b);
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                    (kind_a, kind_b)
                }
            };

            let ord = match (kind_a, kind_b) {
                (OpenEntry::Declared, OpenEntry::Declared) => {
                    let (field, start_a, end_a) = side_a.declared[side_a.next_declared];
                    let (_, start_b, end_b) = side_b.declared[side_b.next_declared];
                    side_a.next_declared += 1;
                    side_b.next_declared += 1;
                    self.fields[field].node.compare(
                        &mut SliceInput::new(&side_a.bytes[start_a..end_a]),
                        &mut SliceInput::new(&side_b.bytes[start_b..end_b]),
                    )?
                }
                (OpenEntry::Wildcard, OpenEntry::Wildcard) => {
                    side_a.last_wildcard = side_a.wildcard_name.take();
                    side_b.last_wildcard = side_b.wildcard_name.take();
                    rest.compare(a, b)?
                }
                _ => return Err(CodecError::malformed(a.position(), "wildcard field shadows a declared field")),
            };
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{BasicSerializer, Serializer};

    fn record(fields: Vec<(&str, Value)>) -> Value {
        Value::Record(fields.into_iter().collect())
    }

    fn optional_schema() -> Schema {
        Schema::record(vec![
            FieldDef::optional("a", Schema::long()),
            FieldDef::optional("b", Schema::long()),
            FieldDef::required("c", Schema::string()),
            FieldDef::optional("d", Schema::long()),
        ])
    }

    #[test]
    fn test_entry_slot_appends() {
        let mut entries = Vec::new();
        entry_slot(&mut entries, 0).0.push_str("x");
        entry_slot(&mut entries, 1).0.push_str("y");
        entry_slot(&mut entries, 0).0.push_str("z");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "xz");
    }

    #[test]
    fn test_bitmap_then_fields() {
        let ser = BasicSerializer::for_schema(&optional_schema()).unwrap();
        let bytes = ser
            .encode(&record(vec![("c", "x".into()), ("b", Value::Long(2))]))
            .unwrap();
        // bitmap: b is optional slot 1
        assert_eq!(bytes[0], 0b0000_0010);
        assert_eq!(&bytes[1..9], &2i64.to_be_bytes());
        assert_eq!(&bytes[9..], &[1, b'x']);
    }

    #[test]
    fn test_padding_bits_rejected() {
        let ser = BasicSerializer::for_schema(&optional_schema()).unwrap();
        let mut bytes = ser.encode(&record(vec![("c", "x".into())])).unwrap();
        bytes[0] |= 0b1000_0000;
        assert!(ser.decode(&bytes).unwrap_err().is_malformed());
    }

    #[test]
    fn test_presence_ordering_matches_values() {
        let ser = BasicSerializer::for_schema(&optional_schema()).unwrap();
        let values = vec![
            record(vec![("c", "m".into())]),
            record(vec![("a", Value::Long(1)), ("c", "m".into())]),
            record(vec![("b", Value::Long(1)), ("c", "m".into())]),
            record(vec![("c", "m".into()), ("d", Value::Long(0))]),
            record(vec![("a", Value::Long(1)), ("b", Value::Long(1)), ("c", "m".into())]),
            record(vec![("a", Value::Long(0)), ("c", "z".into()), ("d", Value::Long(9))]),
            record(vec![("c", "a".into())]),
        ];
        for x in &values {
            for y in &values {
                let ex = ser.encode(x).unwrap();
                let ey = ser.encode(y).unwrap();
                assert_eq!(ser.compare_bytes(&ex, &ey).unwrap(), x.compare_to(y), "{} vs {}", x, y);
            }
        }
    }

    #[test]
    fn test_wildcard_fields_merge_in_name_order() {
        let schema = Schema::open_record(
            vec![FieldDef::required("m", Schema::long())],
            Schema::string(),
        );
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        let value = record(vec![
            ("z", "last".into()),
            ("m", Value::Long(5)),
            ("a", "first".into()),
        ]);
        let bytes = ser.encode(&value).unwrap();
        // m payload, count 2, then "a" before "z"
        assert_eq!(&bytes[..8], &5i64.to_be_bytes());
        assert_eq!(bytes[8], 2);
        assert_eq!(&bytes[9..11], &[1, b'a']);

        let decoded = ser.decode(&bytes).unwrap();
        assert_eq!(decoded, value);
        let names: Vec<&str> = decoded.as_record().unwrap().names().collect();
        assert_eq!(names, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_wildcard_compare_consumes_exactly() {
        let schema = Schema::open_record(vec![FieldDef::optional("k", Schema::long())], Schema::Any);
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        let value = record(vec![("k", Value::Long(1)), ("x", Value::Array(vec![Value::Null]))]);
        let mut a = ser.encode(&value).unwrap();
        let len = a.len() as u64;
        let mut b = a.clone();
        a.push(0xEE);
        b.extend_from_slice(&[0xEE, 0xEE]);

        let mut ia = SliceInput::new(&a);
        let mut ib = SliceInput::new(&b);
        assert_eq!(ser.compare(&mut ia, &mut ib).unwrap(), Ordering::Equal);
        assert_eq!(ia.position(), len);
        assert_eq!(ib.position(), len);
    }

    #[test]
    fn test_declared_name_in_wildcard_section_rejected() {
        let schema = Schema::open_record(vec![FieldDef::optional("k", Schema::long())], Schema::long());
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        // bitmap 0, one wildcard field named "k"
        let mut bytes = vec![0u8, 1, 1, b'k'];
        bytes.extend_from_slice(&3i64.to_be_bytes());
        assert!(ser.decode(&bytes).unwrap_err().is_malformed());
    }

    fn open_schema() -> Schema {
        Schema::open_record(vec![FieldDef::optional("m", Schema::long())], Schema::long())
    }

    #[test]
    fn test_wildcard_compare_interleaves_declared_fields() {
        let ser = BasicSerializer::for_schema(&open_schema()).unwrap();
        let values = vec![
            record(vec![]),
            record(vec![("a", Value::Long(1))]),
            record(vec![("a", Value::Long(2))]),
            record(vec![("a", Value::Long(1)), ("m", Value::Long(5))]),
            record(vec![("a", Value::Long(1)), ("m", Value::Long(4)), ("z", Value::Long(9))]),
            record(vec![("b", Value::Long(0))]),
            record(vec![("m", Value::Long(5))]),
            record(vec![("m", Value::Long(5)), ("z", Value::Long(0))]),
            record(vec![("n", Value::Long(0))]),
        ];
        for x in &values {
            for y in &values {
                let ex = ser.encode(x).unwrap();
                let ey = ser.encode(y).unwrap();
                assert_eq!(ser.compare_bytes(&ex, &ey).unwrap(), x.compare_to(y), "{} vs {}", x, y);
            }
        }
    }

    #[test]
    fn test_wildcard_out_of_order_rejected() {
        let ser = BasicSerializer::for_schema(&open_schema()).unwrap();
        // bitmap 0, two wildcard fields "b" then "a"
        let mut bytes = vec![0u8, 2, 1, b'b'];
        bytes.extend_from_slice(&1i64.to_be_bytes());
        bytes.extend_from_slice(&[1, b'a']);
        bytes.extend_from_slice(&2i64.to_be_bytes());

        assert!(ser.decode(&bytes).unwrap_err().is_malformed());
        assert!(ser.compare_bytes(&bytes, &bytes).unwrap_err().is_malformed());
    }

    #[test]
    fn test_failed_read_leaves_target_empty() {
        let ser = BasicSerializer::for_schema(&open_schema()).unwrap();
        let mut target = record(vec![("a", Value::Long(1)), ("m", Value::Long(2)), ("q", Value::Long(3))]);

        let good = ser.encode(&record(vec![("c", Value::Long(7)), ("m", Value::Long(1))])).unwrap();
        let truncated = &good[..good.len() - 3];
        assert!(ser.read_into(&mut SliceInput::new(truncated), &mut target).is_err());
        assert_eq!(target, Value::Record(Record::new()));
    }

    #[test]
    fn test_read_reuses_target_record() {
        let ser = BasicSerializer::for_schema(&optional_schema()).unwrap();
        let first = record(vec![("a", Value::Long(1)), ("c", "one".into()), ("d", Value::Long(4))]);
        let second = record(vec![("c", "two".into())]);

        let mut target = Value::Null;
        ser.read_into(&mut SliceInput::new(&ser.encode(&first).unwrap()), &mut target)
            .unwrap();
        assert_eq!(target, first);
        ser.read_into(&mut SliceInput::new(&ser.encode(&second).unwrap()), &mut target)
            .unwrap();
        assert_eq!(target, second);
    }
}
