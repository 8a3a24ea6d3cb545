//! The decoded value representation
//!
//! `Value` is a closed tagged union. Adding a variant is a compile-time
//! checked change across every serializer because all dispatch is an
//! exhaustive `match` on the variant or its [`EncodingTag`].

use std::cmp::Ordering;
use std::fmt;

use super::atoms::{DateValue, Decimal, FunctionRef, NativeValue, RegexValue, SpanValue};
use super::record::Record;
use super::tag::EncodingTag;

/// A decoded semi-structured value.
///
/// Equality and ordering both follow the total order documented on
/// [`Value::compare_to`]; in particular `Double(NaN) == Double(NaN)`.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Binary(Vec<u8>),
    Date(DateValue),
    Span(SpanValue),
    Regex(RegexValue),
    Record(Record),
    Array(Vec<Value>),
    Function(FunctionRef),
    Native(NativeValue),
}

impl Value {
    /// Runtime type tag of this value.
    pub fn encoding_tag(&self) -> EncodingTag {
        match self {
            Value::Null => EncodingTag::Null,
            Value::Boolean(_) => EncodingTag::Boolean,
            Value::Long(_) => EncodingTag::Long,
            Value::Double(_) => EncodingTag::Double,
            Value::Decimal(_) => EncodingTag::Decimal,
            Value::String(_) => EncodingTag::String,
            Value::Binary(_) => EncodingTag::Binary,
            Value::Date(_) => EncodingTag::Date,
            Value::Span(_) => EncodingTag::Span,
            Value::Regex(_) => EncodingTag::Regex,
            Value::Record(_) => EncodingTag::Record,
            Value::Array(_) => EncodingTag::Array,
            Value::Function(_) => EncodingTag::Function,
            Value::Native(_) => EncodingTag::Native,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.encoding_tag().type_name()
    }

    /// Total order across all values.
    ///
    /// Values with different tags are ordered by tag alone; numbers of
    /// different tags are never coerced. Within a tag:
    ///
    /// - booleans: `false < true`
    /// - longs and dates: numeric
    /// - doubles: IEEE 754 total order (`f64::total_cmp`)
    /// - decimals: numeric, scale-insensitive
    /// - strings, binaries, function names: unsigned byte order, prefix first
    /// - regexes: pattern, then flags; natives: type name, then payload
    /// - spans: start, then end
    /// - records: `(name, value)` pairs in name order, prefix first
    /// - arrays: element-wise, prefix first
    pub fn compare_to(&self, other: &Value) -> Ordering {
        let (ta, tb) = (self.encoding_tag(), other.encoding_tag());
        if ta != tb {
            return ta.cmp(&tb);
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.numeric_cmp(b),
            (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Value::Binary(a), Value::Binary(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Span(a), Value::Span(b)) => a.cmp(b),
            (Value::Regex(a), Value::Regex(b)) => a.cmp(b),
            (Value::Record(a), Value::Record(b)) => a.compare(b),
            (Value::Array(a), Value::Array(b)) => compare_arrays(a, b),
            (Value::Function(a), Value::Function(b)) => a.cmp(b),
            (Value::Native(a), Value::Native(b)) => a.cmp(b),
            // tags are equal, so the variants are equal
            _ => Ordering::Equal,
        }
    }

    /// Copies `self` into `target`, reusing its allocations when `target`
    /// already holds the same variant. Otherwise `target` is replaced.
    pub fn deep_copy_into(&self, target: &mut Value) {
        match (self, target) {
            (Value::String(src), Value::String(dst)) => dst.clone_from(src),
            (Value::Binary(src), Value::Binary(dst)) => dst.clone_from(src),
            (Value::Record(src), Value::Record(dst)) => {
                let entries = dst.entries_mut();
                entries.truncate(src.len());
                for (idx, (name, value)) in src.iter().enumerate() {
                    match entries.get_mut(idx) {
                        Some((dst_name, dst_value)) => {
                            dst_name.clear();
                            dst_name.push_str(name);
                            value.deep_copy_into(dst_value);
                        }
                        None => entries.push((name.to_string(), value.clone())),
                    }
                }
            }
            (Value::Array(src), Value::Array(dst)) => {
                dst.truncate(src.len());
                for (idx, value) in src.iter().enumerate() {
                    match dst.get_mut(idx) {
                        Some(slot) => value.deep_copy_into(slot),
                        None => dst.push(value.clone()),
                    }
                }
            }
            (src, dst) => *dst = src.clone(),
        }
    }

    /// Returns an owned deep copy, allocating fresh storage.
    pub fn deep_copy(&self) -> Value {
        self.clone()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    // Mutable views. They hand out the backing storage so callers can
    // overwrite a value in place without reallocating.

    pub fn as_long_mut(&mut self) -> Option<&mut i64> {
        match self {
            Value::Long(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_double_mut(&mut self) -> Option<&mut f64> {
        match self {
            Value::Double(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_string_mut(&mut self) -> Option<&mut String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Number of elements for arrays, fields for records, 1 for atoms and 0
    /// for null.
    pub fn count(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Array(a) => a.len(),
            Value::Record(r) => r.len(),
            _ => 1,
        }
    }
}

fn compare_arrays(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = x.compare_to(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare_to(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_to(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<DateValue> for Value {
    fn from(d: DateValue) -> Self {
        Value::Date(d)
    }
}

impl From<SpanValue> for Value {
    fn from(s: SpanValue) -> Self {
        Value::Span(s)
    }
}

impl From<RegexValue> for Value {
    fn from(r: RegexValue) -> Self {
        Value::Regex(r)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<FunctionRef> for Value {
    fn from(f: FunctionRef) -> Self {
        Value::Function(f)
    }
}

impl From<NativeValue> for Value {
    fn from(n: NativeValue) -> Self {
        Value::Native(n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Long(n) => write!(f, "{}", n),
            Value::Double(d) => write!(f, "{}", d),
            Value::Decimal(d) => write!(f, "{}m", d),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Binary(b) => {
                f.write_str("hex'")?;
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                f.write_str("'")
            }
            Value::Date(d) => write!(f, "date('{}')", d),
            Value::Span(s) => write!(f, "span({}, {})", s.start(), s.end()),
            Value::Regex(r) => write!(f, "/{}/{}", r.pattern(), r.flags()),
            Value::Record(r) => {
                f.write_str("{")?;
                for (i, (name, value)) in r.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", name, value)?;
                }
                f.write_str("}")
            }
            Value::Array(a) => {
                f.write_str("[")?;
                for (i, value) in a.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
            Value::Function(func) => write!(f, "fn {}", func.name()),
            Value::Native(n) => write!(f, "native<{}>({} bytes)", n.type_name(), n.payload().len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_type_order_follows_tags() {
        let ordered = vec![
            Value::Null,
            Value::Boolean(true),
            Value::Long(i64::MAX),
            Value::Double(-1.0),
            Value::Decimal(Decimal::from_i64(-5)),
            Value::from("a"),
            Value::Binary(vec![]),
            Value::Date(DateValue::from_millis(0)),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(pair[0].compare_to(&pair[1]), Ordering::Less, "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_long_and_double_are_not_coerced() {
        assert_eq!(Value::Long(1).compare_to(&Value::Double(0.5)), Ordering::Less);
        assert_ne!(Value::Long(1), Value::Double(1.0));
    }

    #[test]
    fn test_nan_equals_itself() {
        let nan = Value::Double(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(Value::Double(f64::INFINITY).compare_to(&nan), Ordering::Less);
    }

    #[test]
    fn test_string_prefix_sorts_first() {
        assert_eq!(Value::from("ab").compare_to(&Value::from("abc")), Ordering::Less);
        assert_eq!(Value::from("b").compare_to(&Value::from("abc")), Ordering::Greater);
    }

    #[test]
    fn test_array_shorter_prefix_sorts_first() {
        let a = Value::Array(vec![Value::Long(1), Value::Long(2)]);
        let b = Value::Array(vec![Value::Long(1), Value::Long(2), Value::Long(3)]);
        assert_eq!(a.compare_to(&b), Ordering::Less);
        assert_eq!(b.compare_to(&a), Ordering::Greater);
    }

    #[test]
    fn test_deep_copy_into_reuses_matching_variant() {
        let src = Value::from("hello");
        let mut target = Value::String(String::with_capacity(64));
        let before = target.as_str().map(|s| s.as_ptr());
        src.deep_copy_into(&mut target);
        assert_eq!(target, src);
        assert_eq!(target.as_str().map(|s| s.as_ptr()), before);
    }

    #[test]
    fn test_deep_copy_into_replaces_mismatched_variant() {
        let src = Value::Array(vec![Value::Long(1), Value::from("x")]);
        let mut target = Value::Long(7);
        src.deep_copy_into(&mut target);
        assert_eq!(target, src);
    }

    #[test]
    fn test_deep_copy_into_nested_record() {
        let src: Record = [("a", Value::Long(1)), ("b", Value::from("x"))]
            .into_iter()
            .collect();
        let mut target = Value::Record(
            [("z", Value::Long(0)), ("y", Value::Null), ("w", Value::Null)]
                .into_iter()
                .collect(),
        );
        Value::Record(src.clone()).deep_copy_into(&mut target);
        assert_eq!(target, Value::Record(src));
    }

    #[test]
    fn test_mutable_views() {
        let mut v = Value::Long(1);
        *v.as_long_mut().unwrap() = 5;
        assert_eq!(v.as_long(), Some(5));
        assert!(v.as_string_mut().is_none());

        let mut s = Value::from("ab");
        s.as_string_mut().unwrap().push('c');
        assert_eq!(s.as_str(), Some("abc"));
    }

    #[test]
    fn test_count() {
        assert_eq!(Value::Null.count(), 0);
        assert_eq!(Value::Long(3).count(), 1);
        assert_eq!(Value::Array(vec![Value::Null; 4]).count(), 4);
    }
}
