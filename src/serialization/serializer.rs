//! The serializer contract shared by basic and full serializers

use std::cmp::Ordering;

use crate::io::{DataInput, DataOutput, SliceInput};
use crate::value::{EncodingTag, Value};

use super::errors::CodecResult;

/// Encode, decode, skip, copy and compare values on byte streams.
///
/// Serializers hold no per-call state: scratch is passed in by the caller
/// through `read_into`, so one instance can be reused for any number of
/// values.
///
/// # Comparator contract
///
/// `compare` works on the encoded bytes and agrees in sign with
/// [`Value::compare_to`] on the decoded values. When it returns
/// `Ordering::Equal`, both inputs have advanced by exactly the encoded length
/// of their value. After any other result, stream positions are unspecified.
pub trait Serializer {
    /// Tag every value at this position carries, if the schema fixes one.
    fn encoding_tag(&self) -> Option<EncodingTag>;

    /// Tag of an encoded value, found without decoding it: the schema's tag
    /// when it fixes one, otherwise the leading tag byte of a tagged encoding.
    fn leading_tag(&self, _encoded: &[u8]) -> Option<EncodingTag> {
        self.encoding_tag()
    }

    /// Decodes into `target`, reusing its storage when its shape matches.
    fn read_into<I: DataInput + ?Sized>(&self, input: &mut I, target: &mut Value) -> CodecResult<()>;

    fn read<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<Value> {
        let mut value = Value::Null;
        self.read_into(input, &mut value)?;
        Ok(value)
    }

    /// Encodes `value`. Nothing is written if the value is rejected.
    fn write<O: DataOutput + ?Sized>(&self, out: &mut O, value: &Value) -> CodecResult<()>;

    /// Advances past one value.
    fn skip<I: DataInput + ?Sized>(&self, input: &mut I) -> CodecResult<()> {
        let mut scratch = Value::Null;
        self.read_into(input, &mut scratch)
    }

    fn compare<A, B>(&self, a: &mut A, b: &mut B) -> CodecResult<Ordering>
    where
        A: DataInput + ?Sized,
        B: DataInput + ?Sized;

    /// Re-emits one value from `input` on `out`, byte for byte.
    fn copy<I, O>(&self, input: &mut I, out: &mut O) -> CodecResult<()>
    where
        I: DataInput + ?Sized,
        O: DataOutput + ?Sized,
    {
        let value = self.read(input)?;
        self.write(out, &value)
    }

    /// Encodes into a fresh buffer.
    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out, value)?;
        Ok(out)
    }

    /// Decodes a buffer holding exactly one value.
    fn decode(&self, bytes: &[u8]) -> CodecResult<Value> {
        let mut input = SliceInput::new(bytes);
        let value = self.read(&mut input)?;
        if !input.is_exhausted() {
            return Err(super::CodecError::malformed(
                input.position(),
                format!("{} trailing bytes after value", input.remaining()),
            ));
        }
        Ok(value)
    }

    /// Compares two buffers each holding one encoded value.
    fn compare_bytes(&self, a: &[u8], b: &[u8]) -> CodecResult<Ordering> {
        self.compare(&mut SliceInput::new(a), &mut SliceInput::new(b))
    }
}
