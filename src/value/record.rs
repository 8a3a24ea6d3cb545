//! Name-sorted record of fields
//!
//! Fields are kept sorted by name at all times so that iteration, encoding and
//! comparison share one deterministic order. Names are unique; inserting an
//! existing name replaces its value.

use std::cmp::Ordering;

use super::Value;

/// Ordered mapping from field name to [`Value`].
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.fields
            .binary_search_by(|(field, _)| field.as_str().cmp(name))
    }

    /// Inserts or replaces a field. Returns the previous value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        match self.position(&name) {
            Ok(idx) => Some(std::mem::replace(&mut self.fields[idx].1, value)),
            Err(idx) => {
                self.fields.insert(idx, (name, value));
                None
            }
        }
    }

    /// Appends a field known to sort after every existing field.
    ///
    /// Falls back to an ordered insert when that precondition does not hold,
    /// so decoders can use it on untrusted input without breaking the order.
    pub fn push_sorted(&mut self, name: String, value: Value) {
        match self.fields.last() {
            Some((last, _)) if last.as_str() >= name.as_str() => {
                self.insert(name, value);
            }
            _ => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.position(name).ok().map(|idx| &self.fields[idx].1)
    }

    /// Mutable view of a field's value.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self.position(name) {
            Ok(idx) => Some(&mut self.fields[idx].1),
            Err(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_ok()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        match self.position(name) {
            Ok(idx) => Some(self.fields.remove(idx).1),
            Err(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Field at position `idx` in name order.
    pub fn field_at(&self, idx: usize) -> Option<(&str, &Value)> {
        self.fields.get(idx).map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<(String, Value)> {
        &mut self.fields
    }

    /// Lexicographic order over `(name, value)` pairs; a prefix sorts first.
    pub fn compare(&self, other: &Record) -> Ordering {
        for ((na, va), (nb, vb)) in self.fields.iter().zip(other.fields.iter()) {
            let ord = na.as_bytes().cmp(nb.as_bytes()).then_with(|| va.compare_to(vb));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.fields.len().cmp(&other.fields.len())
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (N, Value)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Record {}
