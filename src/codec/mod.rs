//! Fixed-layout binary codec
//!
//! Records are written field by field in the order declared by their
//! [`Schema`] entry. Integers are little-endian, strings and vectors carry a
//! u32 length prefix, options carry a single presence byte. The format is not
//! self-describing: the reader must know the target type.
//!
//! ```
//! use hero_nft::codec::{self, FieldType, Schema, Fields, Value, SchemaType, CodecResult};
//!
//! struct Price { id: u32, amount: u64 }
//!
//! impl SchemaType for Price {
//!     const TYPE_NAME: &'static str = "Price";
//!     fn to_value(&self) -> Value {
//!         Fields::new().with("id", self.id).with("amount", self.amount).into()
//!     }
//!     fn from_value(value: Value) -> CodecResult<Self> {
//!         let mut f = value.into_fields(Self::TYPE_NAME)?;
//!         Ok(Self { id: f.take_u32("id")?, amount: f.take_u64("amount")? })
//!     }
//! }
//!
//! let schema = Schema::builder()
//!     .register("Price", vec![("id", FieldType::U32), ("amount", FieldType::U64)])
//!     .build();
//! let bytes = codec::encode(&schema, &Price { id: 3, amount: 10 }).unwrap();
//! assert_eq!(bytes.len(), 12);
//! let back: Price = codec::decode(&schema, &bytes).unwrap();
//! assert_eq!(back.amount, 10);
//! ```

pub mod errors;
pub mod schema;
pub mod value;

pub use errors::{CodecError, CodecResult};
pub use schema::{Field, FieldType, Schema, SchemaBuilder, StructSchema};
pub use value::{Fields, SchemaType, Value};

use bytes::{Buf, BufMut};

/// Serialize a typed value with its registered layout
pub fn encode<T: SchemaType>(schema: &Schema, value: &T) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(schema.min_len(T::TYPE_NAME)?);
    encode_struct(schema, T::TYPE_NAME, &value.to_value(), &mut out)?;
    Ok(out)
}

/// Deserialize a typed value, rejecting trailing bytes
pub fn decode<T: SchemaType>(schema: &Schema, bytes: &[u8]) -> CodecResult<T> {
    let mut reader = Reader::new(bytes);
    let value = decode_struct(schema, T::TYPE_NAME, &mut reader)?;
    if reader.remaining() > 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }
    T::from_value(value)
}

/// Deserialize a typed value from the front of `bytes`, ignoring anything after it
///
/// Program accounts are allocated at a fixed size larger than the record they
/// hold, so account data is read with this variant.
pub fn decode_prefix<T: SchemaType>(schema: &Schema, bytes: &[u8]) -> CodecResult<T> {
    let mut reader = Reader::new(bytes);
    let value = decode_struct(schema, T::TYPE_NAME, &mut reader)?;
    T::from_value(value)
}

/// Serialize a dynamic struct value under the named layout
pub fn encode_struct(
    schema: &Schema,
    type_name: &str,
    value: &Value,
    out: &mut Vec<u8>,
) -> CodecResult<()> {
    let layout = schema.get(type_name)?;
    let fields = match value {
        Value::Struct(fields) => fields,
        _ => return Err(CodecError::mismatch(type_name, "struct")),
    };

    for field in &layout.fields {
        let v = fields
            .get(field.name)
            .ok_or_else(|| CodecError::MissingField(field.name.to_string()))?;
        encode_field(schema, field.name, &field.ty, v, out)?;
    }
    Ok(())
}

fn encode_field(
    schema: &Schema,
    name: &str,
    ty: &FieldType,
    value: &Value,
    out: &mut Vec<u8>,
) -> CodecResult<()> {
    match (ty, value) {
        (FieldType::U8, Value::U8(v)) => out.put_u8(*v),
        (FieldType::U16, Value::U16(v)) => out.put_u16_le(*v),
        (FieldType::U32, Value::U32(v)) => out.put_u32_le(*v),
        (FieldType::U64, Value::U64(v)) => out.put_u64_le(*v),
        (FieldType::Bool, Value::Bool(v)) => out.put_u8(u8::from(*v)),
        (FieldType::String, Value::String(s)) => {
            put_len(out, s.len())?;
            out.put_slice(s.as_bytes());
        }
        (FieldType::FixedBytes(n), Value::Bytes(b)) if b.len() == *n => out.put_slice(b),
        (FieldType::FixedBytes(32), Value::Pubkey(k)) | (FieldType::Pubkey, Value::Pubkey(k)) => {
            out.put_slice(k.as_ref())
        }
        (FieldType::Pubkey, Value::Bytes(b)) if b.len() == 32 => out.put_slice(b),
        (FieldType::Struct(inner), v @ Value::Struct(_)) => encode_struct(schema, inner, v, out)?,
        (FieldType::Option(_), Value::Option(None)) => out.put_u8(0),
        (FieldType::Option(inner), Value::Option(Some(v))) => {
            out.put_u8(1);
            encode_field(schema, name, inner, v, out)?;
        }
        (FieldType::Vec(inner), Value::Vec(items)) => {
            put_len(out, items.len())?;
            for item in items {
                encode_field(schema, name, inner, item, out)?;
            }
        }
        _ => return Err(CodecError::mismatch(name, ty.describe())),
    }
    Ok(())
}

fn put_len(out: &mut Vec<u8>, len: usize) -> CodecResult<()> {
    let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
    out.put_u32_le(len);
    Ok(())
}

/// Read a dynamic struct value with the named layout
pub fn decode_struct(schema: &Schema, type_name: &str, reader: &mut Reader<'_>) -> CodecResult<Value> {
    let layout = schema.get(type_name)?;
    let mut fields = Fields::new();
    for field in &layout.fields {
        let v = decode_field(schema, &field.ty, reader)?;
        fields.insert(field.name, v);
    }
    Ok(Value::Struct(fields))
}

fn decode_field(schema: &Schema, ty: &FieldType, reader: &mut Reader<'_>) -> CodecResult<Value> {
    Ok(match ty {
        FieldType::U8 => Value::U8(reader.take(1)?.get_u8()),
        FieldType::U16 => Value::U16(reader.take(2)?.get_u16_le()),
        FieldType::U32 => Value::U32(reader.take(4)?.get_u32_le()),
        FieldType::U64 => Value::U64(reader.take(8)?.get_u64_le()),
        FieldType::Bool => match reader.take(1)?.get_u8() {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => return Err(CodecError::InvalidBool(other)),
        },
        FieldType::String => {
            let len = reader.take(4)?.get_u32_le() as usize;
            let raw = reader.take(len)?;
            let s = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)?;
            Value::String(s.to_string())
        }
        FieldType::FixedBytes(n) => Value::Bytes(reader.take(*n)?.to_vec()),
        FieldType::Pubkey => {
            let raw: [u8; 32] = reader
                .take(32)?
                .try_into()
                .map_err(|_| CodecError::mismatch("pubkey", "32 bytes"))?;
            Value::Pubkey(solana_sdk::pubkey::Pubkey::new_from_array(raw))
        }
        FieldType::Struct(name) => decode_struct(schema, name, reader)?,
        FieldType::Option(inner) => match reader.take(1)?.get_u8() {
            0 => Value::Option(None),
            1 => Value::some(decode_field(schema, inner, reader)?),
            other => return Err(CodecError::InvalidPresenceByte(other)),
        },
        FieldType::Vec(inner) => {
            let count = reader.take(4)?.get_u32_le() as usize;
            // A hostile length prefix must not drive the allocation
            let mut items = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                items.push(decode_field(schema, inner, reader)?);
            }
            Value::Vec(items)
        }
    })
}

/// Bounds-checked cursor over an input buffer
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Split off the next `n` bytes or fail without consuming anything
    pub fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.buf.len() < n {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use solana_sdk::pubkey::Pubkey;

    #[derive(Debug, Clone, PartialEq)]
    struct Sample {
        tag: u8,
        label: String,
        amount: Option<u64>,
        key: Pubkey,
        list: Vec<u16>,
        flag: bool,
    }

    impl SchemaType for Sample {
        const TYPE_NAME: &'static str = "Sample";

        fn to_value(&self) -> Value {
            Fields::new()
                .with("tag", self.tag)
                .with("label", self.label.as_str())
                .with("amount", Value::from_option(self.amount))
                .with("key", self.key)
                .with("list", Value::Vec(self.list.iter().map(|v| Value::U16(*v)).collect()))
                .with("flag", self.flag)
                .into()
        }

        fn from_value(value: Value) -> CodecResult<Self> {
            let mut f = value.into_fields(Self::TYPE_NAME)?;
            Ok(Self {
                tag: f.take_u8("tag")?,
                label: f.take_string("label")?,
                amount: f.take_option("amount", Value::into_u64)?,
                key: f.take_pubkey("key")?,
                list: f
                    .take("list")?
                    .into_vec("list")?
                    .into_iter()
                    .map(|v| v.into_u16("list"))
                    .collect::<CodecResult<_>>()?,
                flag: match f.take("flag")? {
                    Value::Bool(b) => b,
                    _ => return Err(CodecError::mismatch("flag", "bool")),
                },
            })
        }
    }

    fn schema() -> Schema {
        Schema::builder()
            .register(
                "Sample",
                vec![
                    ("tag", FieldType::U8),
                    ("label", FieldType::String),
                    ("amount", FieldType::option(FieldType::U64)),
                    ("key", FieldType::Pubkey),
                    ("list", FieldType::vec(FieldType::U16)),
                    ("flag", FieldType::Bool),
                ],
            )
            .build()
    }

    fn sample() -> Sample {
        Sample {
            tag: 7,
            label: "abc".to_string(),
            amount: Some(258),
            key: Pubkey::new_from_array([9u8; 32]),
            list: vec![1, 2],
            flag: true,
        }
    }

    #[test]
    fn test_layout_is_field_ordered() {
        let bytes = encode(&schema(), &sample()).unwrap();
        let mut expected = vec![7u8, 3, 0, 0, 0, b'a', b'b', b'c', 1];
        expected.extend_from_slice(&258u64.to_le_bytes());
        expected.extend_from_slice(&[9u8; 32]);
        expected.extend_from_slice(&[2, 0, 0, 0, 1, 0, 2, 0, 1]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_none_is_single_zero_byte() {
        let mut s = sample();
        s.amount = None;
        let with_none = encode(&schema(), &s).unwrap();
        let with_some = encode(&schema(), &sample()).unwrap();
        assert_eq!(with_some.len() - with_none.len(), 8);
        assert_eq!(with_none[8], 0);
    }

    #[test]
    fn test_short_input_fails() {
        let bytes = encode(&schema(), &sample()).unwrap();
        for cut in [0, 1, 5, 9, bytes.len() - 1] {
            let err = decode::<Sample>(&schema(), &bytes[..cut]).unwrap_err();
            assert!(
                matches!(err, CodecError::UnexpectedEof { .. }),
                "cut at {} gave {:?}",
                cut,
                err
            );
        }
    }

    #[test]
    fn test_bad_presence_byte_fails() {
        let mut bytes = encode(&schema(), &sample()).unwrap();
        bytes[8] = 2;
        assert_eq!(
            decode::<Sample>(&schema(), &bytes),
            Err(CodecError::InvalidPresenceByte(2))
        );
    }

    #[test]
    fn test_strict_vs_prefix_decode() {
        let mut bytes = encode(&schema(), &sample()).unwrap();
        bytes.extend_from_slice(&[0u8; 16]);
        assert_eq!(
            decode::<Sample>(&schema(), &bytes),
            Err(CodecError::TrailingBytes(16))
        );
        assert_eq!(decode_prefix::<Sample>(&schema(), &bytes).unwrap(), sample());
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let mut bytes = encode(&schema(), &sample()).unwrap();
        bytes[5] = 0xff;
        assert_eq!(decode::<Sample>(&schema(), &bytes), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn test_encode_rejects_wrong_shape() {
        let schema = schema();
        let value = Fields::new()
            .with("tag", 1u64)
            .into();
        let mut out = Vec::new();
        let err = encode_struct(&schema, "Sample", &value, &mut out).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn test_huge_vec_prefix_does_not_allocate() {
        let schema = Schema::builder()
            .register("V", vec![("items", FieldType::vec(FieldType::U64))])
            .build();
        let bytes = [0xff, 0xff, 0xff, 0xff, 1, 2];
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            decode_struct(&schema, "V", &mut reader),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            tag in any::<u8>(),
            label in ".{0,40}",
            amount in proptest::option::of(any::<u64>()),
            key in any::<[u8; 32]>(),
            list in proptest::collection::vec(any::<u16>(), 0..8),
            flag in any::<bool>(),
        ) {
            let s = Sample { tag, label, amount, key: Pubkey::new_from_array(key), list, flag };
            let bytes = encode(&schema(), &s).unwrap();
            prop_assert_eq!(decode::<Sample>(&schema(), &bytes).unwrap(), s);
        }
    }
}
