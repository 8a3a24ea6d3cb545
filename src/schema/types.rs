//! Schema descriptor types
//!
//! A schema describes which value shapes are legal at a position:
//!
//! - `any`: anything, encoded self-describing
//! - `atom`: a set of legal encoding tags with an optional constraint
//! - `record`: name-sorted field list plus an optional wildcard schema
//! - `array`: head schemas for fixed positions plus an optional rest schema
//!   repeated between `min_rest` and `max_rest` times
//!
//! Schemas are produced elsewhere (inference, user declarations) and consumed
//! here as given.

use serde::{Deserialize, Serialize};

use crate::value::EncodingTag;

/// Value constraint on an atom position, checked at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AtomConstraint {
    /// Inclusive bounds on a long value
    LongRange { min: i64, max: i64 },
    /// Inclusive bounds on the byte length of a string or binary
    Length {
        #[serde(default)]
        min: u64,
        #[serde(default)]
        max: Option<u64>,
    },
}

/// One declared record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub schema: Schema,
    /// Whether the field may be absent
    #[serde(default)]
    pub optional: bool,
}

impl FieldDef {
    pub fn required(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            optional: true,
        }
    }
}

/// Node kind, as seen by serializer construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Any,
    Atom,
    Record,
    Array,
}

/// Schema descriptor tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Schema {
    Any,
    Atom {
        tags: Vec<EncodingTag>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        constraint: Option<AtomConstraint>,
    },
    Record {
        /// Declared fields, kept sorted by name
        fields: Vec<FieldDef>,
        /// Schema of undeclared ("wildcard") fields
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rest: Option<Box<Schema>>,
    },
    Array {
        #[serde(default)]
        head: Vec<Schema>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rest: Option<Box<Schema>>,
        #[serde(default)]
        min_rest: u64,
        /// `None` means unbounded
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_rest: Option<u64>,
    },
}

impl Schema {
    /// Atom accepting exactly one tag.
    pub fn atom(tag: EncodingTag) -> Self {
        Schema::Atom {
            tags: vec![tag],
            constraint: None,
        }
    }

    /// Atom accepting any of `tags`.
    pub fn atom_of(tags: impl IntoIterator<Item = EncodingTag>) -> Self {
        let mut tags: Vec<EncodingTag> = tags.into_iter().collect();
        tags.sort();
        tags.dedup();
        Schema::Atom {
            tags,
            constraint: None,
        }
    }

    pub fn long() -> Self {
        Self::atom(EncodingTag::Long)
    }

    pub fn double() -> Self {
        Self::atom(EncodingTag::Double)
    }

    pub fn boolean() -> Self {
        Self::atom(EncodingTag::Boolean)
    }

    pub fn string() -> Self {
        Self::atom(EncodingTag::String)
    }

    pub fn binary() -> Self {
        Self::atom(EncodingTag::Binary)
    }

    /// `schema` or null.
    pub fn nullable(tag: EncodingTag) -> Self {
        Self::atom_of([EncodingTag::Null, tag])
    }

    /// Adds a constraint to an atom schema. Other kinds are returned as is.
    pub fn with_constraint(self, constraint: AtomConstraint) -> Self {
        match self {
            Schema::Atom { tags, .. } => Schema::Atom {
                tags,
                constraint: Some(constraint),
            },
            other => other,
        }
    }

    /// Closed record; `fields` may be given in any order.
    pub fn record(fields: Vec<FieldDef>) -> Self {
        Self::record_with_rest(fields, None)
    }

    /// Record whose undeclared fields must match `rest`.
    pub fn open_record(fields: Vec<FieldDef>, rest: Schema) -> Self {
        Self::record_with_rest(fields, Some(rest))
    }

    fn record_with_rest(mut fields: Vec<FieldDef>, rest: Option<Schema>) -> Self {
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        Schema::Record {
            fields,
            rest: rest.map(Box::new),
        }
    }

    /// Array of any length whose elements all match `element`.
    pub fn array_of(element: Schema) -> Self {
        Schema::Array {
            head: Vec::new(),
            rest: Some(Box::new(element)),
            min_rest: 0,
            max_rest: None,
        }
    }

    /// Array of exactly `len` elements matching `element`.
    pub fn fixed_array(element: Schema, len: u64) -> Self {
        Schema::Array {
            head: Vec::new(),
            rest: Some(Box::new(element)),
            min_rest: len,
            max_rest: Some(len),
        }
    }

    /// Fixed positions only.
    pub fn tuple(head: Vec<Schema>) -> Self {
        Schema::Array {
            head,
            rest: None,
            min_rest: 0,
            max_rest: None,
        }
    }

    /// Head positions followed by a rest of `min..=max` elements.
    pub fn array(head: Vec<Schema>, rest: Schema, min_rest: u64, max_rest: Option<u64>) -> Self {
        Schema::Array {
            head,
            rest: Some(Box::new(rest)),
            min_rest,
            max_rest,
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            Schema::Any => SchemaKind::Any,
            Schema::Atom { .. } => SchemaKind::Atom,
            Schema::Record { .. } => SchemaKind::Record,
            Schema::Array { .. } => SchemaKind::Array,
        }
    }

    /// Legal tags of an atom position.
    pub fn atom_tags(&self) -> Option<&[EncodingTag]> {
        match self {
            Schema::Atom { tags, .. } => Some(tags),
            _ => None,
        }
    }

    pub fn atom_constraint(&self) -> Option<&AtomConstraint> {
        match self {
            Schema::Atom { constraint, .. } => constraint.as_ref(),
            _ => None,
        }
    }

    /// Declared fields of a record position, in name order.
    pub fn fields(&self) -> &[FieldDef] {
        match self {
            Schema::Record { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        let fields = self.fields();
        fields
            .binary_search_by(|f| f.name.as_str().cmp(name))
            .ok()
            .map(|idx| &fields[idx])
    }

    /// Wildcard schema of a record position.
    pub fn wildcard(&self) -> Option<&Schema> {
        match self {
            Schema::Record { rest, .. } => rest.as_deref(),
            _ => None,
        }
    }

    pub fn head(&self) -> &[Schema] {
        match self {
            Schema::Array { head, .. } => head,
            _ => &[],
        }
    }

    /// Rest element schema of an array position.
    pub fn rest(&self) -> Option<&Schema> {
        match self {
            Schema::Array { rest, .. } => rest.as_deref(),
            _ => None,
        }
    }

    /// Smallest legal array length.
    pub fn min_elements(&self) -> u64 {
        match self {
            Schema::Array {
                head,
                rest,
                min_rest,
                ..
            } => head.len() as u64 + if rest.is_some() { *min_rest } else { 0 },
            _ => 0,
        }
    }

    /// Largest legal array length, `None` if unbounded.
    pub fn max_elements(&self) -> Option<u64> {
        match self {
            Schema::Array {
                head,
                rest,
                max_rest,
                ..
            } => match rest {
                None => Some(head.len() as u64),
                Some(_) => max_rest.map(|max| head.len() as u64 + max),
            },
            _ => None,
        }
    }

    /// Rest length when it is statically known. Such arrays are encoded
    /// without a count prefix.
    pub fn fixed_rest_len(&self) -> Option<u64> {
        match self {
            Schema::Array {
                rest,
                min_rest,
                max_rest,
                ..
            } => match rest {
                None => Some(0),
                Some(_) if *max_rest == Some(*min_rest) => Some(*min_rest),
                Some(_) => None,
            },
            _ => None,
        }
    }

    /// The single tag every conforming value carries, if the schema fixes one.
    pub fn single_tag(&self) -> Option<EncodingTag> {
        match self {
            Schema::Any => None,
            Schema::Atom { tags, .. } if tags.len() == 1 => Some(tags[0]),
            Schema::Atom { .. } => None,
            Schema::Record { .. } => Some(EncodingTag::Record),
            Schema::Array { .. } => Some(EncodingTag::Array),
        }
    }

    /// Restores the name order of record fields, recursively. Schemas read
    /// from files are normalized before use.
    pub fn normalize(&mut self) {
        match self {
            Schema::Any => {}
            Schema::Atom { tags, .. } => {
                tags.sort();
                tags.dedup();
            }
            Schema::Record { fields, rest } => {
                fields.sort_by(|a, b| a.name.cmp(&b.name));
                for field in fields.iter_mut() {
                    field.schema.normalize();
                }
                if let Some(rest) = rest {
                    rest.normalize();
                }
            }
            Schema::Array { head, rest, .. } => {
                for schema in head.iter_mut() {
                    schema.normalize();
                }
                if let Some(rest) = rest {
                    rest.normalize();
                }
            }
        }
    }

    /// Validates the schema tree itself (not a value).
    pub fn validate_structure(&self) -> Result<(), String> {
        self.validate_at("$")
    }

    fn validate_at(&self, path: &str) -> Result<(), String> {
        match self {
            Schema::Any => Ok(()),
            Schema::Atom { tags, constraint } => {
                if tags.is_empty() {
                    return Err(format!("{}: atom must allow at least one tag", path));
                }
                match constraint {
                    Some(AtomConstraint::LongRange { min, max }) if min > max => {
                        Err(format!("{}: long range min {} exceeds max {}", path, min, max))
                    }
                    Some(AtomConstraint::Length { min, max: Some(max) }) if min > max => {
                        Err(format!("{}: length min {} exceeds max {}", path, min, max))
                    }
                    _ => Ok(()),
                }
            }
            Schema::Record { fields, rest } => {
                for pair in fields.windows(2) {
                    if pair[0].name == pair[1].name {
                        return Err(format!("{}: duplicate field '{}'", path, pair[0].name));
                    }
                    if pair[0].name > pair[1].name {
                        return Err(format!("{}: fields are not sorted by name", path));
                    }
                }
                for field in fields {
                    field.schema.validate_at(&format!("{}.{}", path, field.name))?;
                }
                match rest {
                    Some(rest) => rest.validate_at(&format!("{}.*", path)),
                    None => Ok(()),
                }
            }
            Schema::Array {
                head,
                rest,
                min_rest,
                max_rest,
            } => {
                for (idx, schema) in head.iter().enumerate() {
                    schema.validate_at(&format!("{}[{}]", path, idx))?;
                }
                match rest {
                    Some(rest) => {
                        if let Some(max) = max_rest {
                            if min_rest > max {
                                return Err(format!(
                                    "{}: min_rest {} exceeds max_rest {}",
                                    path, min_rest, max
                                ));
                            }
                        }
                        rest.validate_at(&format!("{}[*]", path))
                    }
                    None if *min_rest > 0 || max_rest.map_or(false, |max| max > 0) => {
                        Err(format!("{}: rest bounds given without a rest schema", path))
                    }
                    None => Ok(()),
                }
            }
        }
    }
}

/// A schema registered under a name, as stored in schema files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Schema,
}

impl NamedSchema {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema,
        }
    }
}
