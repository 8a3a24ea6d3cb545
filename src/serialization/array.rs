//! Schema-bound array codec
//!
//! Layout: `[head payloads][varint rest count][rest payloads]`. The count is
//! left out when the rest length is fixed by the schema (`min_rest ==
//! max_rest`, or no rest at all).

use std::cmp::Ordering;

use crate::io::{DataInput, DataOutput};
use crate::schema::Schema;
use crate::value::Value;

use super::atom::Limits;
use super::basic::Node;
use super::errors::{CodecError, CodecResult};
use super::full::FullSerializer;

#[derive(Debug, Clone)]
pub(crate) struct ArrayCodec {
    head: Vec<Node>,
    rest: Option<Node>,
    min_rest: u64,
    max_rest: Option<u64>,
    fixed_rest: Option<u64>,
    limits: Limits,
}

impl ArrayCodec {
    pub fn build(schema: &Schema, full: FullSerializer) -> Self {
        let (min_rest, max_rest) = match schema {
            Schema::Array { min_rest, max_rest, .. } => (*min_rest, *max_rest),
            _ => (0, None),
        };
        Self {
            head: schema.head().iter().map(|s| Node::build(s, full)).collect(),
            rest: schema.rest().map(|s| Node::build(s, full)),
            min_rest,
            max_rest,
            fixed_rest: schema.fixed_rest_len(),
            limits: *full.limits(),
        }
    }

    /// Rest element count: fixed by the schema, or read and bounds-checked.
    fn read_rest_len<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<usize> {
        if let Some(fixed) = self.fixed_rest {
            return Ok(fixed as usize);
        }
        let at = input.position();
        let count = self.limits.read_len(input)?;
        let too_long = self.max_rest.map_or(false, |max| count as u64 > max);
        if (count as u64) < self.min_rest || too_long {
            return Err(CodecError::type_mismatch(
                at,
                "array",
                format!("rest count {} outside schema bounds", count),
            ));
        }
        Ok(count)
    }

    fn rest_node(&self, at: u64) -> CodecResult<&Node> {
        self.rest
            .as_ref()
            .ok_or_else(|| CodecError::type_mismatch(at, "array", "rest elements without a rest schema"))
    }

    pub fn write<O: DataOutput + ?Sized>(&self, out: &mut O, items: &[Value]) -> CodecResult<()> {
        if items.len() < self.head.len() {
            return Err(CodecError::schema_violation(
                "$",
                format!("at least {} elements", self.head.len()),
                format!("{} elements", items.len()),
            ));
        }
        let (head_items, rest_items) = items.split_at(self.head.len());
        if !rest_items.is_empty() && self.rest.is_none() {
            return Err(CodecError::schema_violation(
                "$",
                format!("at most {} elements", self.head.len()),
                format!("{} elements", items.len()),
            ));
        }

        for (node, item) in self.head.iter().zip(head_items) {
            node.write(out, item)?;
        }
        if self.fixed_rest.is_none() {
            out.write_varint(rest_items.len() as u64)?;
        }
        if let Some(rest) = &self.rest {
            for item in rest_items {
                rest.write(out, item)?;
            }
        }
        Ok(())
    }

    pub fn read_into<I: DataInput + ?Sized>(&self, input: &mut I, target: &mut Value) -> CodecResult<()> {
        if !matches!(target, Value::Array(_)) {
            *target = Value::Array(Vec::new());
        }
        let Value::Array(items) = target else {
            return Ok(());
        };

        for (idx, node) in self.head.iter().enumerate() {
            node.read_into(input, slot(items, idx))?;
        }
        let count = self.read_rest_len(input)?;
        let total = self.head.len() + count;
        if count > 0 {
            let rest = self.rest_node(input.position())?;
            for idx in self.head.len()..total {
                rest.read_into(input, slot(items, idx))?;
            }
        }
        items.truncate(total);
        Ok(())
    }

    pub fn skip<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<()> {
        for node in &self.head {
            node.skip(input)?;
        }
        let count = self.read_rest_len(input)?;
        if count > 0 {
            let rest = self.rest_node(input.position())?;
            for _ in 0..count {
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
        for node in &self.head {
            node.copy(input, out)?;
        }
        let count = self.read_rest_len(input)?;
        if self.fixed_rest.is_none() {
            out.write_varint(count as u64)?;
        }
        if count > 0 {
            let rest = self.rest_node(input.position())?;
            for _ in 0..count {
                rest.copy(input, out)?;
            }
        }
        Ok(())
    }

    /// Element-wise; the shorter array sorts first on an equal prefix.
    pub fn compare<A, B>(&self, a: &mut A, b: &mut B) -> CodecResult<Ordering>
    where
        A: DataInput + ?Sized,
        B: DataInput + ?Sized,
    {
        for node in &self.head {
            let ord = node.compare(a, b)?;
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        let count_a = self.read_rest_len(a)?;
        let count_b = self.read_rest_len(b)?;
        let common = count_a.min(count_b);
        if common > 0 {
            let rest = self.rest_node(a.position())?;
            for _ in 0..common {
                let ord = rest.compare(a, b)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
        }
        Ok(count_a.cmp(&count_b))
    }
}

fn slot(items: &mut Vec<Value>, idx: usize) -> &mut Value {
    if idx == items.len() {
        items.push(Value::Null);
    }
    &mut items[idx]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceInput;
    use crate::serialization::{BasicSerializer, Serializer};

    fn longs(values: &[i64]) -> Value {
        Value::Array(values.iter().map(|v| Value::Long(*v)).collect())
    }

    #[test]
    fn test_unbounded_rest_writes_count() {
        let ser = BasicSerializer::for_schema(&Schema::array_of(Schema::long())).unwrap();
        let bytes = ser.encode(&longs(&[1, 2, 3])).unwrap();
        assert_eq!(bytes.len(), 1 + 24);
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[1..9], &1i64.to_be_bytes());
        assert_eq!(ser.decode(&bytes).unwrap(), longs(&[1, 2, 3]));
    }

    #[test]
    fn test_fixed_rest_omits_count() {
        let ser = BasicSerializer::for_schema(&Schema::fixed_array(Schema::long(), 3)).unwrap();
        let bytes = ser.encode(&longs(&[7, 8, 9])).unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(ser.decode(&bytes).unwrap(), longs(&[7, 8, 9]));

        let mut input = SliceInput::new(&bytes);
        ser.skip(&mut input).unwrap();
        assert!(input.is_exhausted());
    }

    #[test]
    fn test_head_then_rest() {
        let schema = Schema::array(vec![Schema::string(), Schema::boolean()], Schema::long(), 0, Some(4));
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        let value = Value::Array(vec!["id".into(), Value::Boolean(true), Value::Long(5)]);
        let bytes = ser.encode(&value).unwrap();
        // "id", true, count 1, 5
        assert_eq!(&bytes[..4], &[2, b'i', b'd', 1]);
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes.len(), 5 + 8);
        assert_eq!(ser.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_length_outside_bounds_rejected_before_writing() {
        let schema = Schema::array(vec![], Schema::long(), 1, Some(2));
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        let mut out = Vec::new();
        let err = ser.write(&mut out, &longs(&[1, 2, 3])).unwrap_err();
        assert!(err.is_schema_violation());
        assert!(out.is_empty());

        let err = ser.write(&mut out, &longs(&[])).unwrap_err();
        assert!(err.is_schema_violation());
        assert!(out.is_empty());
    }

    #[test]
    fn test_count_outside_bounds_on_read_is_malformed() {
        let schema = Schema::array(vec![], Schema::long(), 0, Some(1));
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        let mut bytes = vec![2u8];
        bytes.extend_from_slice(&[0; 16]);
        assert!(ser.decode(&bytes).unwrap_err().is_malformed());
    }

    #[test]
    fn test_shorter_array_sorts_first() {
        let ser = BasicSerializer::for_schema(&Schema::array_of(Schema::long())).unwrap();
        let short = ser.encode(&longs(&[1, 2])).unwrap();
        let long = ser.encode(&longs(&[1, 2, 3])).unwrap();
        assert_eq!(ser.compare_bytes(&short, &long).unwrap(), Ordering::Less);
        assert_eq!(ser.compare_bytes(&long, &short).unwrap(), Ordering::Greater);

        let bigger = ser.encode(&longs(&[1, 3])).unwrap();
        assert_eq!(ser.compare_bytes(&bigger, &long).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_read_reuses_elements() {
        let ser = BasicSerializer::for_schema(&Schema::array_of(Schema::string())).unwrap();
        let mut target = Value::Array((0..4).map(|_| Value::String(String::with_capacity(32))).collect());
        let bytes = ser.encode(&Value::Array(vec!["a".into(), "b".into()])).unwrap();
        ser.read_into(&mut SliceInput::new(&bytes), &mut target).unwrap();

        let items = target.as_array_mut().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].as_string_mut().unwrap().capacity() >= 32);
    }

    #[test]
    fn test_copy_matches_bytes() {
        let schema = Schema::array(vec![Schema::Any], Schema::double(), 0, None);
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        let value = Value::Array(vec![Value::from("tagged"), Value::Double(1.5), Value::Double(-2.0)]);
        let bytes = ser.encode(&value).unwrap();
        let mut out = Vec::new();
        ser.copy(&mut SliceInput::new(&bytes), &mut out).unwrap();
        assert_eq!(out, bytes);
    }
}
