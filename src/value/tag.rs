//! Encoding tags for the value model
//!
//! Every value variant has a stable one-byte tag. The tag is written in front
//! of every self-describing (full) encoding and defines the order between
//! values of different variants: a smaller tag always sorts first.
//!
//! Tag 0 is reserved for null; a null carries no payload.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable runtime type identifier of a [`Value`](super::Value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EncodingTag {
    Null = 0,
    Boolean = 1,
    Long = 2,
    Double = 3,
    Decimal = 4,
    String = 5,
    Binary = 6,
    Date = 7,
    Span = 8,
    Regex = 9,
    Record = 10,
    Array = 11,
    Function = 12,
    Native = 13,
}

impl EncodingTag {
    /// All tags in ascending order.
    pub const ALL: [EncodingTag; 14] = [
        EncodingTag::Null,
        EncodingTag::Boolean,
        EncodingTag::Long,
        EncodingTag::Double,
        EncodingTag::Decimal,
        EncodingTag::String,
        EncodingTag::Binary,
        EncodingTag::Date,
        EncodingTag::Span,
        EncodingTag::Regex,
        EncodingTag::Record,
        EncodingTag::Array,
        EncodingTag::Function,
        EncodingTag::Native,
    ];

    /// Returns the wire byte for this tag.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Maps a wire byte back to its tag, `None` if the byte is out of range.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Returns the type name used in error messages and schema files.
    pub fn type_name(self) -> &'static str {
        match self {
            EncodingTag::Null => "null",
            EncodingTag::Boolean => "boolean",
            EncodingTag::Long => "long",
            EncodingTag::Double => "double",
            EncodingTag::Decimal => "decimal",
            EncodingTag::String => "string",
            EncodingTag::Binary => "binary",
            EncodingTag::Date => "date",
            EncodingTag::Span => "span",
            EncodingTag::Regex => "regex",
            EncodingTag::Record => "record",
            EncodingTag::Array => "array",
            EncodingTag::Function => "function",
            EncodingTag::Native => "native",
        }
    }

    /// Looks a tag up by its type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.type_name() == name)
    }

    /// Whether values of this tag are atoms (neither record nor array).
    pub fn is_atomic(self) -> bool {
        !matches!(self, EncodingTag::Record | EncodingTag::Array)
    }

    /// Encoded payload width for fixed-width atoms.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            EncodingTag::Null => Some(0),
            EncodingTag::Boolean => Some(1),
            EncodingTag::Long | EncodingTag::Double | EncodingTag::Date => Some(8),
            EncodingTag::Span => Some(16),
            _ => None,
        }
    }
}

impl fmt::Display for EncodingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
