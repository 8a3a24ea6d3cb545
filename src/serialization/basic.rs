//! Schema-bound serializer tree
//!
//! One node per schema node, built once and reused. Positions whose schema
//! fixes a single atom tag write the bare payload; `any` positions and
//! atoms with several legal tags fall back to the tagged encoding.

use std::cmp::Ordering;

use crate::config::CodecConfig;
use crate::io::{DataInput, DataOutput};
use crate::schema::{Schema, SchemaError, SchemaResult, SchemaValidator};
use crate::value::{EncodingTag, Value};

use super::array::ArrayCodec;
use super::atom::{self, Limits};
use super::errors::{CodecError, CodecResult};
use super::full::FullSerializer;
use super::record::RecordCodec;
use super::serializer::Serializer;

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Atom {
        tag: EncodingTag,
        limits: Limits,
    },
    Record(Box<RecordCodec>),
    Array(Box<ArrayCodec>),
    /// Tagged encoding restricted to `allowed` (any tag when `None`)
    Tagged {
        full: FullSerializer,
        allowed: Option<Vec<EncodingTag>>,
    },
}

impl Node {
    pub fn build(schema: &Schema, full: FullSerializer) -> Node {
        match schema {
            Schema::Any => Node::Tagged { full, allowed: None },
            Schema::Atom { tags, .. } => match tags.as_slice() {
                [tag] if tag.is_atomic() => Node::Atom {
                    tag: *tag,
                    limits: *full.limits(),
                },
                _ => Node::Tagged {
                    full,
                    allowed: Some(tags.clone()),
                },
            },
            Schema::Record { fields, rest } => {
                Node::Record(Box::new(RecordCodec::build(fields, rest.as_deref(), full)))
            }
            Schema::Array { .. } => Node::Array(Box::new(ArrayCodec::build(schema, full))),
        }
    }

    fn check_tag(allowed: &Option<Vec<EncodingTag>>, tag: EncodingTag, at: u64) -> CodecResult<()> {
        match allowed {
            Some(tags) if !tags.contains(&tag) => Err(CodecError::type_mismatch(
                at,
                "one of the schema's tags",
                format!("found {}", tag),
            )),
            _ => Ok(()),
        }
    }

    /// Writes without validating; callers validate the whole value first.
    pub fn write<O: DataOutput + ?Sized>(&self, out: &mut O, value: &Value) -> CodecResult<()> {
        match self {
            Node::Atom { .. } => atom::write_payload(out, value),
            Node::Record(codec) => match value {
                Value::Record(record) => codec.write(out, record),
                other => Err(CodecError::schema_violation("$", "record", other.type_name())),
            },
            Node::Array(codec) => match value {
                Value::Array(items) => codec.write(out, items),
                other => Err(CodecError::schema_violation("$", "array", other.type_name())),
            },
            Node::Tagged { full, .. } => full.write_value(out, value),
        }
    }

    pub fn read_into<I: DataInput + ?Sized>(&self, input: &mut I, target: &mut Value) -> CodecResult<()> {
        match self {
            Node::Atom { tag, limits } => atom::read_payload_into(*tag, input, target, limits),
            Node::Record(codec) => codec.read_into(input, target),
            Node::Array(codec) => codec.read_into(input, target),
            Node::Tagged { full, allowed } => {
                let at = input.position();
                let tag = FullSerializer::read_tag(input)?;
                Self::check_tag(allowed, tag, at)?;
                full.read_body(tag, input, target, 0)
            }
        }
    }

    pub fn skip<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<()> {
        match self {
            Node::Atom { tag, limits } => atom::skip_payload(*tag, input, limits),
            Node::Record(codec) => codec.skip(input),
            Node::Array(codec) => codec.skip(input),
            Node::Tagged { full, .. } => full.skip_value(input, 0),
        }
    }

    pub fn copy<I, O>(&self, input: &mut I, out: &mut O) -> CodecResult<()>
    where
        I: DataInput + ?Sized,
        O: DataOutput + ?Sized,
    {
        match self {
            Node::Atom { tag, limits } => atom::copy_payload(*tag, input, out, limits),
            Node::Record(codec) => codec.copy(input, out),
            Node::Array(codec) => codec.copy(input, out),
            Node::Tagged { full, allowed } => {
                let at = input.position();
                let tag = FullSerializer::read_tag(input)?;
                Self::check_tag(allowed, tag, at)?;
                out.write_u8(tag.as_byte())?;
                full.copy_body(tag, input, out, 0)
            }
        }
    }

    pub fn compare<A, B>(&self, a: &mut A, b: &mut B) -> CodecResult<Ordering>
    where
        A: DataInput + ?Sized,
        B: DataInput + ?Sized,
    {
        match self {
            Node::Atom { tag, limits } => atom::compare_payloads(*tag, a, b, limits),
            Node::Record(codec) => codec.compare(a, b),
            Node::Array(codec) => codec.compare(a, b),
            Node::Tagged { full, .. } => full.compare_values(a, b, 0),
        }
    }
}

/// Serializer bound to one schema.
///
/// Produces the most compact encoding the schema allows: no tags where the
/// schema fixes the type, no presence markers for required fields, no count
/// for fixed-length arrays. Bytes written by one schema can only be read back
/// by a serializer for the identical schema.
#[derive(Debug, Clone)]
pub struct BasicSerializer {
    schema: Schema,
    root: Node,
    validator: SchemaValidator,
}

impl BasicSerializer {
    /// Builds the serializer tree for `schema` with default limits.
    pub fn for_schema(schema: &Schema) -> SchemaResult<Self> {
        Self::for_schema_with(schema, &CodecConfig::default())
    }

    /// Fails with `QUARRY_MALFORMED_SCHEMA` when the schema is structurally
    /// invalid (duplicate field names, empty tag set, inverted bounds).
    pub fn for_schema_with(schema: &Schema, config: &CodecConfig) -> SchemaResult<Self> {
        let mut schema = schema.clone();
        schema.normalize();
        schema
            .validate_structure()
            .map_err(|e| SchemaError::malformed_schema("<in-memory>", e))?;
        let root = Node::build(&schema, FullSerializer::new(config));
        Ok(Self {
            schema,
            root,
            validator: SchemaValidator::new(config.max_nesting_depth),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Serializer for BasicSerializer {
    fn encoding_tag(&self) -> Option<EncodingTag> {
        self.schema.single_tag()
    }

    fn leading_tag(&self, encoded: &[u8]) -> Option<EncodingTag> {
        match &self.root {
            Node::Tagged { .. } => encoded.first().and_then(|byte| EncodingTag::from_byte(*byte)),
            _ => self.encoding_tag(),
        }
    }

    fn read_into<I: DataInput + ?Sized>(&self, input: &mut I, target: &mut Value) -> CodecResult<()> {
        self.root.read_into(input, target)
    }

    fn write<O: DataOutput + ?Sized>(&self, out: &mut O, value: &Value) -> CodecResult<()> {
        self.validator.validate(&self.schema, value)?;
        self.root.write(out, value)
    }

    fn skip<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<()> {
        self.root.skip(input)
    }

    fn compare<A, B>(&self, a: &mut A, b: &mut B) -> CodecResult<Ordering>
    where
        A: DataInput + ?Sized,
        B: DataInput + ?Sized,
    {
        self.root.compare(a, b)
    }

    fn copy<I, O>(&self, input: &mut I, out: &mut O) -> CodecResult<()>
    where
        I: DataInput + ?Sized,
        O: DataOutput + ?Sized,
    {
        self.root.copy(input, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceInput;
    use crate::schema::{AtomConstraint, FieldDef, SchemaErrorCode};
    use crate::value::Record;

    #[test]
    fn test_long_atom_is_eight_bytes() {
        let ser = BasicSerializer::for_schema(&Schema::long()).unwrap();
        let bytes = ser.encode(&Value::Long(42)).unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(ser.decode(&bytes).unwrap(), Value::Long(42));
    }

    #[test]
    fn test_record_fields_written_in_name_order() {
        let schema = Schema::record(vec![
            FieldDef::required("a", Schema::long()),
            FieldDef::required("b", Schema::string()),
        ]);
        let ser = BasicSerializer::for_schema(&schema).unwrap();

        let mut record = Record::new();
        record.insert("b", Value::from("x"));
        record.insert("a", Value::Long(1));
        let bytes = ser.encode(&Value::Record(record)).unwrap();

        assert_eq!(&bytes[..8], &1i64.to_be_bytes());
        assert_eq!(&bytes[8..], &[1, b'x']);

        let decoded = ser.decode(&bytes).unwrap();
        let expected: Record = vec![("a", Value::Long(1)), ("b", Value::from("x"))].into_iter().collect();
        assert_eq!(decoded, Value::Record(expected));
    }

    #[test]
    fn test_violation_writes_nothing() {
        let schema = Schema::record(vec![
            FieldDef::required("a", Schema::long()),
            FieldDef::required("b", Schema::string()),
        ]);
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        let value: Record = vec![("a", Value::Long(1)), ("b", Value::Long(2))].into_iter().collect();

        let mut out = Vec::new();
        let err = ser.write(&mut out, &Value::Record(value)).unwrap_err();
        assert!(err.is_schema_violation());
        assert!(err.to_string().contains("$.b"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_constraint_enforced_at_write() {
        let schema = Schema::long().with_constraint(AtomConstraint::LongRange { min: 0, max: 9 });
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        assert!(ser.encode(&Value::Long(9)).is_ok());
        assert!(ser.encode(&Value::Long(10)).unwrap_err().is_schema_violation());
    }

    #[test]
    fn test_nullable_atom_is_tagged() {
        let ser = BasicSerializer::for_schema(&Schema::nullable(EncodingTag::Long)).unwrap();
        assert_eq!(ser.encode(&Value::Null).unwrap(), vec![0]);
        let bytes = ser.encode(&Value::Long(3)).unwrap();
        assert_eq!(bytes[0], EncodingTag::Long.as_byte());
        assert_eq!(bytes.len(), 9);
        assert_eq!(ser.leading_tag(&bytes), Some(EncodingTag::Long));
        assert_eq!(ser.encoding_tag(), None);
    }

    #[test]
    fn test_tagged_position_rejects_foreign_tag_on_read() {
        let ser = BasicSerializer::for_schema(&Schema::nullable(EncodingTag::Long)).unwrap();
        let foreign = FullSerializer::get_default().encode(&Value::from("x")).unwrap();
        assert!(ser.decode(&foreign).unwrap_err().is_malformed());
    }

    #[test]
    fn test_encoding_tag_from_schema() {
        let ser = BasicSerializer::for_schema(&Schema::string()).unwrap();
        assert_eq!(ser.encoding_tag(), Some(EncodingTag::String));
        // no byte inspection for fixed-tag schemas
        assert_eq!(ser.leading_tag(&[]), Some(EncodingTag::String));
    }

    #[test]
    fn test_skip_matches_read() {
        let schema = Schema::record(vec![
            FieldDef::optional("n", Schema::nullable(EncodingTag::Double)),
            FieldDef::required("tags", Schema::array_of(Schema::string())),
        ]);
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        let value: Record = vec![
            ("n", Value::Double(1.0)),
            ("tags", Value::Array(vec!["x".into(), "yy".into()])),
        ]
        .into_iter()
        .collect();
        let mut bytes = ser.encode(&Value::Record(value)).unwrap();
        bytes.extend_from_slice(&[9, 9]);

        let mut read = SliceInput::new(&bytes);
        ser.read(&mut read).unwrap();
        let mut skipped = SliceInput::new(&bytes);
        ser.skip(&mut skipped).unwrap();
        assert_eq!(read.position(), skipped.position());
        assert_eq!(skipped.remaining(), 2);
    }

    #[test]
    fn test_unsorted_schema_is_normalized() {
        let schema = Schema::Record {
            fields: vec![
                FieldDef::required("z", Schema::long()),
                FieldDef::required("a", Schema::long()),
            ],
            rest: None,
        };
        let ser = BasicSerializer::for_schema(&schema).unwrap();
        let value: Record = vec![("z", Value::Long(2)), ("a", Value::Long(1))].into_iter().collect();
        let bytes = ser.encode(&Value::Record(value)).unwrap();
        assert_eq!(&bytes[..8], &1i64.to_be_bytes());
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let schema = Schema::record(vec![
            FieldDef::required("a", Schema::long()),
            FieldDef::required("a", Schema::long()),
        ]);
        let err = BasicSerializer::for_schema(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::QuarryMalformedSchema);
        assert!(err.message().contains("duplicate field 'a'"));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let schema = Schema::long().with_constraint(AtomConstraint::LongRange { min: 5, max: 1 });
        assert!(BasicSerializer::for_schema(&schema).is_err());

        let nested = Schema::array_of(Schema::record(vec![
            FieldDef::required("x", Schema::string()),
            FieldDef::optional("x", Schema::long()),
        ]));
        assert!(BasicSerializer::for_schema(&nested).is_err());
    }
}
