//! Conformance of values against schemas
//!
//! Serializers run this before writing anything, so a rejected value never
//! leaves partial bytes behind.
//!
//! Rules:
//! - the value's tag must be legal at the position
//! - atom constraints hold
//! - every required record field is present
//! - undeclared fields only when the record has a wildcard schema
//! - array length within the head/rest bounds
//! - nesting under an `any` position within the configured depth
//!
//! No coercion: `Long(1)` does not conform to a double position.

use crate::value::{EncodingTag, Record, Value};

use super::errors::ValidationDetails;
use super::types::{AtomConstraint, Schema};

/// Stateless validator; the only setting is the nesting limit applied to
/// values in `any` positions.
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator {
    max_depth: usize,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self { max_depth: 128 }
    }
}

impl SchemaValidator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn validate(&self, schema: &Schema, value: &Value) -> Result<(), ValidationDetails> {
        let mut path = String::from("$");
        self.validate_at(schema, value, &mut path)
    }

    pub fn conforms(&self, schema: &Schema, value: &Value) -> bool {
        self.validate(schema, value).is_ok()
    }

    /// Depth check for a value in a self-describing position.
    pub fn check_depth(&self, value: &Value) -> Result<(), ValidationDetails> {
        let mut path = String::from("$");
        self.check_depth_at(value, 0, &mut path)
    }

    fn validate_at(&self, schema: &Schema, value: &Value, path: &mut String) -> Result<(), ValidationDetails> {
        match schema {
            Schema::Any => self.check_depth_at(value, 0, path),
            Schema::Atom { tags, constraint } => {
                let tag = value.encoding_tag();
                if !tags.contains(&tag) {
                    return Err(ValidationDetails::new(path.as_str(), describe_tags(tags), tag.type_name()));
                }
                if !tag.is_atomic() {
                    // records and arrays in atom positions are self-describing
                    self.check_depth_at(value, 0, path)?;
                }
                match constraint {
                    Some(constraint) => check_constraint(constraint, value, path),
                    None => Ok(()),
                }
            }
            Schema::Record { rest, .. } => {
                let record = match value {
                    Value::Record(record) => record,
                    other => return Err(ValidationDetails::new(path.as_str(), "record", other.type_name())),
                };
                self.validate_record(schema, rest.as_deref(), record, path)
            }
            Schema::Array { head, rest, .. } => {
                let items = match value {
                    Value::Array(items) => items,
                    other => return Err(ValidationDetails::new(path.as_str(), "array", other.type_name())),
                };
                let len = items.len() as u64;
                let min = schema.min_elements();
                if len < min {
                    return Err(ValidationDetails::new(
                        path.as_str(),
                        format!("at least {} elements", min),
                        format!("{} elements", len),
                    ));
                }
                if let Some(max) = schema.max_elements() {
                    if len > max {
                        return Err(ValidationDetails::new(
                            path.as_str(),
                            format!("at most {} elements", max),
                            format!("{} elements", len),
                        ));
                    }
                }
                for (idx, item) in items.iter().enumerate() {
                    let item_schema = match head.get(idx) {
                        Some(schema) => schema,
                        // length already checked, so a rest schema exists here
                        None => match rest.as_deref() {
                            Some(schema) => schema,
                            None => break,
                        },
                    };
                    let mark = path.len();
                    path.push_str(&format!("[{}]", idx));
                    self.validate_at(item_schema, item, path)?;
                    path.truncate(mark);
                }
                Ok(())
            }
        }
    }

    fn validate_record(
        &self,
        schema: &Schema,
        rest: Option<&Schema>,
        record: &Record,
        path: &mut String,
    ) -> Result<(), ValidationDetails> {
        for field in schema.fields() {
            let mark = path.len();
            path.push('.');
            path.push_str(&field.name);
            match record.get(&field.name) {
                Some(value) => self.validate_at(&field.schema, value, path)?,
                None if field.optional => {}
                None => return Err(ValidationDetails::missing_field(path.as_str())),
            }
            path.truncate(mark);
        }

        for (name, value) in record.iter() {
            if schema.field(name).is_some() {
                continue;
            }
            let mark = path.len();
            path.push('.');
            path.push_str(name);
            match rest {
                Some(rest) => self.validate_at(rest, value, path)?,
                None => return Err(ValidationDetails::extra_field(path.as_str())),
            }
            path.truncate(mark);
        }
        Ok(())
    }

    fn check_depth_at(&self, value: &Value, depth: usize, path: &mut String) -> Result<(), ValidationDetails> {
        let children: Box<dyn Iterator<Item = (String, &Value)> + '_> = match value {
            Value::Record(record) => Box::new(record.iter().map(|(name, v)| (format!(".{}", name), v))),
            Value::Array(items) => Box::new(items.iter().enumerate().map(|(i, v)| (format!("[{}]", i), v))),
            _ => return Ok(()),
        };
        if depth >= self.max_depth {
            return Err(ValidationDetails::new(
                path.as_str(),
                format!("nesting depth at most {}", self.max_depth),
                "deeper nesting",
            ));
        }
        for (segment, child) in children {
            let mark = path.len();
            path.push_str(&segment);
            self.check_depth_at(child, depth + 1, path)?;
            path.truncate(mark);
        }
        Ok(())
    }
}

fn check_constraint(constraint: &AtomConstraint, value: &Value, path: &str) -> Result<(), ValidationDetails> {
    match (constraint, value) {
        (AtomConstraint::LongRange { min, max }, Value::Long(v)) if v < min || v > max => Err(
            ValidationDetails::new(path, format!("long in [{}, {}]", min, max), v.to_string()),
        ),
        (AtomConstraint::Length { min, max }, Value::String(_) | Value::Binary(_)) => {
            let len = match value {
                Value::String(s) => s.len(),
                Value::Binary(b) => b.len(),
                _ => 0,
            } as u64;
            let too_long = max.map_or(false, |max| len > max);
            if len < *min || too_long {
                let expected = match max {
                    Some(max) => format!("length in [{}, {}]", min, max),
                    None => format!("length at least {}", min),
                };
                return Err(ValidationDetails::new(path, expected, format!("length {}", len)));
            }
            Ok(())
        }
        // constraints only restrict the tags they name
        _ => Ok(()),
    }
}

fn describe_tags(tags: &[EncodingTag]) -> String {
    let names: Vec<&str> = tags.iter().map(|t| t.type_name()).collect();
    names.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    fn validator() -> SchemaValidator {
        SchemaValidator::default()
    }

    fn person() -> Schema {
        Schema::record(vec![
            FieldDef::required("id", Schema::long()),
            FieldDef::optional("nick", Schema::string()),
        ])
    }

    fn record(fields: Vec<(&str, Value)>) -> Value {
        Value::Record(fields.into_iter().collect())
    }

    #[test]
    fn test_atom_tags() {
        let v = validator();
        assert!(v.conforms(&Schema::long(), &Value::Long(1)));
        let err = v.validate(&Schema::long(), &Value::Double(1.0)).unwrap_err();
        assert_eq!(err.expected, "long");
        assert_eq!(err.actual, "double");
        assert!(v.conforms(&Schema::nullable(EncodingTag::Long), &Value::Null));
    }

    #[test]
    fn test_missing_required_field() {
        let err = validator()
            .validate(&person(), &record(vec![("nick", "x".into())]))
            .unwrap_err();
        assert_eq!(err.path, "$.id");
        assert_eq!(err.actual, "missing");
    }

    #[test]
    fn test_optional_field_may_be_absent() {
        assert!(validator().conforms(&person(), &record(vec![("id", Value::Long(7))])));
    }

    #[test]
    fn test_extra_field_needs_wildcard() {
        let value = record(vec![("id", Value::Long(7)), ("zip", "x".into())]);
        let err = validator().validate(&person(), &value).unwrap_err();
        assert_eq!(err.path, "$.zip");

        let open = Schema::open_record(vec![FieldDef::required("id", Schema::long())], Schema::string());
        assert!(validator().conforms(&open, &value));
        let bad = record(vec![("id", Value::Long(7)), ("zip", Value::Long(1))]);
        assert_eq!(validator().validate(&open, &bad).unwrap_err().path, "$.zip");
    }

    #[test]
    fn test_array_bounds() {
        let schema = Schema::array(vec![Schema::string()], Schema::long(), 1, Some(2));
        let v = validator();
        assert!(v.conforms(&schema, &Value::Array(vec!["a".into(), Value::Long(1)])));
        assert!(!v.conforms(&schema, &Value::Array(vec!["a".into()])));
        let err = v
            .validate(
                &schema,
                &Value::Array(vec!["a".into(), Value::Long(1), Value::Long(2), Value::Long(3)]),
            )
            .unwrap_err();
        assert_eq!(err.expected, "at most 3 elements");

        let err = v
            .validate(&schema, &Value::Array(vec!["a".into(), "b".into()]))
            .unwrap_err();
        assert_eq!(err.path, "$[1]");
    }

    #[test]
    fn test_constraints() {
        let v = validator();
        let ranged = Schema::long().with_constraint(AtomConstraint::LongRange { min: 0, max: 10 });
        assert!(v.conforms(&ranged, &Value::Long(10)));
        assert!(!v.conforms(&ranged, &Value::Long(11)));

        let short = Schema::string().with_constraint(AtomConstraint::Length { min: 1, max: Some(3) });
        assert!(v.conforms(&short, &Value::from("abc")));
        assert!(!v.conforms(&short, &Value::from("")));
        assert!(!v.conforms(&short, &Value::from("abcd")));
    }

    #[test]
    fn test_depth_limit_in_any_positions() {
        let mut value = Value::Long(1);
        for _ in 0..4 {
            value = Value::Array(vec![value]);
        }
        assert!(SchemaValidator::new(4).conforms(&Schema::Any, &value));
        assert!(!SchemaValidator::new(3).conforms(&Schema::Any, &value));
    }

    #[test]
    fn test_no_numeric_coercion() {
        assert!(!validator().conforms(&Schema::double(), &Value::Long(1)));
    }
}
