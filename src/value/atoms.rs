//! Non-primitive atom types of the value model
//!
//! - Decimal: arbitrary precision, unscaled integer plus base-10 scale
//! - Date: milliseconds since the Unix epoch
//! - Span: half-open `[start, end)` integer range
//! - Regex: pattern plus flag letters
//! - Function reference: qualified function name
//! - Native: opaque payload tagged with a type name

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use num_bigint::{BigInt, Sign};

/// Arbitrary-precision decimal: `unscaled * 10^(-scale)`.
#[derive(Debug, Clone)]
pub struct Decimal {
    unscaled: BigInt,
    scale: i32,
}

impl Decimal {
    /// Creates a decimal from its unscaled integer and scale.
    pub fn new(unscaled: BigInt, scale: i32) -> Self {
        Self { unscaled, scale }
    }

    /// Creates an integral decimal.
    pub fn from_i64(value: i64) -> Self {
        Self::new(BigInt::from(value), 0)
    }

    /// Parses plain decimal notation such as `-12.0450`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (digits, scale) = match text.split_once('.') {
            Some((int_part, frac_part)) => {
                if frac_part.is_empty() || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                (format!("{}{}", int_part, frac_part), frac_part.len())
            }
            None => (text.to_string(), 0),
        };
        let scale = i32::try_from(scale).ok()?;
        let unscaled = BigInt::from_str(&digits).ok()?;
        Some(Self::new(unscaled, scale))
    }

    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// Numeric comparison; `1.0` and `1.00` compare equal.
    ///
    /// Orders by adjusted exponent first, so a rescale only happens when
    /// both magnitudes have the same number of integer digits and costs at
    /// most the longer mantissa.
    pub fn numeric_cmp(&self, other: &Decimal) -> Ordering {
        let (sa, sb) = (self.unscaled.sign(), other.unscaled.sign());
        if sa != sb {
            return sign_rank(sa).cmp(&sign_rank(sb));
        }
        if sa == Sign::NoSign {
            return Ordering::Equal;
        }
        if self.scale == other.scale {
            return self.unscaled.cmp(&other.unscaled);
        }

        let (da, db) = (decimal_digits(&self.unscaled), decimal_digits(&other.unscaled));
        let exponent_order = (da - self.scale as i64).cmp(&(db - other.scale as i64));
        if exponent_order != Ordering::Equal {
            return match sa {
                Sign::Minus => exponent_order.reverse(),
                _ => exponent_order,
            };
        }

        // equal exponents: the scale gap equals the digit-count gap
        let diff = (self.scale as i64 - other.scale as i64).unsigned_abs() as u32;
        let factor = BigInt::from(10u8).pow(diff);
        if self.scale > other.scale {
            self.unscaled.cmp(&(&other.unscaled * factor))
        } else {
            (&self.unscaled * factor).cmp(&other.unscaled)
        }
    }
}

fn decimal_digits(value: &BigInt) -> i64 {
    value.magnitude().to_str_radix(10).len() as i64
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.numeric_cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric_cmp(other)
    }
}

fn sign_rank(sign: Sign) -> i8 {
    match sign {
        Sign::Minus => -1,
        Sign::NoSign => 0,
        Sign::Plus => 1,
    }
}

/// Widest zero padding written in plain notation; past it `Display` uses
/// `<digits>E<exponent>`.
const MAX_PLAIN_ZEROS: u64 = 64;

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.unscaled.sign() == Sign::Minus;
        let digits = self.unscaled.magnitude().to_string();
        if negative {
            f.write_str("-")?;
        }
        let padding = if self.scale <= 0 {
            self.scale.unsigned_abs() as u64
        } else {
            (self.scale as u64).saturating_sub(digits.len() as u64)
        };
        if padding > MAX_PLAIN_ZEROS {
            return write!(f, "{}E{}", digits, -(self.scale as i64));
        }
        if self.scale <= 0 {
            f.write_str(&digits)?;
            for _ in 0..padding {
                f.write_str("0")?;
            }
            return Ok(());
        }
        let scale = self.scale as usize;
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{}.{}", int_part, frac_part)
        } else {
            write!(f, "0.{}{}", "0".repeat(padding as usize), digits)
        }
    }
}

/// Point in time with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateValue {
    millis: i64,
}

impl DateValue {
    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Truncates to millisecond precision.
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self::from_millis(datetime.timestamp_millis())
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Returns `None` when the instant is outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.millis)
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "date({})", self.millis),
        }
    }
}

/// Half-open integer range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanValue {
    start: i64,
    end: i64,
}

impl SpanValue {
    /// Returns `None` if `end < start`.
    pub fn new(start: i64, end: i64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, point: i64) -> bool {
        self.start <= point && point < self.end
    }

    pub fn overlaps(&self, other: &SpanValue) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Regular expression kept in source form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegexValue {
    pattern: String,
    flags: String,
}

impl RegexValue {
    pub fn new(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Compiles the pattern. Recognized flags: `i`, `m`, `s`, `x`.
    pub fn compile(&self) -> Result<regex::Regex, regex::Error> {
        let mut builder = regex::RegexBuilder::new(&self.pattern);
        for flag in self.flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                _ => &mut builder,
            };
        }
        builder.build()
    }
}

/// Reference to a function by qualified name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionRef {
    name: String,
}

impl FunctionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Opaque value produced by a host extension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeValue {
    type_name: String,
    payload: Vec<u8>,
}

impl NativeValue {
    pub fn new(type_name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            payload,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut String, &mut Vec<u8>) {
        (&mut self.type_name, &mut self.payload)
    }
}

impl RegexValue {
    pub(crate) fn parts_mut(&mut self) -> (&mut String, &mut String) {
        (&mut self.pattern, &mut self.flags)
    }
}

impl FunctionRef {
    pub(crate) fn name_mut(&mut self) -> &mut String {
        &mut self.name
    }
}
