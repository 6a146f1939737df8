//! Dynamic value tree and the bridge to typed structs

use super::errors::{CodecError, CodecResult};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;

/// A decoded (or to-be-encoded) value matching some [`FieldType`](super::FieldType)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Pubkey(Pubkey),
    Struct(Fields),
    Option(Option<Box<Value>>),
    Vec(Vec<Value>),
}

impl Value {
    pub fn none() -> Self {
        Self::Option(None)
    }

    pub fn some(inner: Value) -> Self {
        Self::Option(Some(Box::new(inner)))
    }

    /// Wrap an optional value, converting the inner payload
    pub fn from_option<T: Into<Value>>(value: Option<T>) -> Self {
        Self::Option(value.map(|v| Box::new(v.into())))
    }

    pub fn into_u8(self, field: &str) -> CodecResult<u8> {
        match self {
            Self::U8(v) => Ok(v),
            _ => Err(CodecError::mismatch(field, "u8")),
        }
    }

    pub fn into_u16(self, field: &str) -> CodecResult<u16> {
        match self {
            Self::U16(v) => Ok(v),
            _ => Err(CodecError::mismatch(field, "u16")),
        }
    }

    pub fn into_u32(self, field: &str) -> CodecResult<u32> {
        match self {
            Self::U32(v) => Ok(v),
            _ => Err(CodecError::mismatch(field, "u32")),
        }
    }

    pub fn into_u64(self, field: &str) -> CodecResult<u64> {
        match self {
            Self::U64(v) => Ok(v),
            _ => Err(CodecError::mismatch(field, "u64")),
        }
    }

    pub fn into_string(self, field: &str) -> CodecResult<String> {
        match self {
            Self::String(v) => Ok(v),
            _ => Err(CodecError::mismatch(field, "string")),
        }
    }

    pub fn into_bytes(self, field: &str) -> CodecResult<Vec<u8>> {
        match self {
            Self::Bytes(v) => Ok(v),
            _ => Err(CodecError::mismatch(field, "bytes")),
        }
    }

    pub fn into_pubkey(self, field: &str) -> CodecResult<Pubkey> {
        match self {
            Self::Pubkey(v) => Ok(v),
            Self::Bytes(v) => Pubkey::try_from(v.as_slice())
                .map_err(|_| CodecError::mismatch(field, "pubkey")),
            _ => Err(CodecError::mismatch(field, "pubkey")),
        }
    }

    pub fn into_option(self, field: &str) -> CodecResult<Option<Value>> {
        match self {
            Self::Option(v) => Ok(v.map(|b| *b)),
            _ => Err(CodecError::mismatch(field, "option")),
        }
    }

    pub fn into_vec(self, field: &str) -> CodecResult<Vec<Value>> {
        match self {
            Self::Vec(v) => Ok(v),
            _ => Err(CodecError::mismatch(field, "vec")),
        }
    }

    pub fn into_struct<T: SchemaType>(self, field: &str) -> CodecResult<T> {
        match self {
            Self::Struct(_) => T::from_value(self),
            _ => Err(CodecError::mismatch(field, T::TYPE_NAME)),
        }
    }

    pub fn into_fields(self, field: &str) -> CodecResult<Fields> {
        match self {
            Self::Struct(f) => Ok(f),
            _ => Err(CodecError::mismatch(field, "struct")),
        }
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Self::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Pubkey> for Value {
    fn from(v: Pubkey) -> Self {
        Self::Pubkey(v)
    }
}

impl From<Fields> for Value {
    fn from(v: Fields) -> Self {
        Self::Struct(v)
    }
}

/// Named field values of one struct
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fields(BTreeMap<&'static str, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.0.insert(name, value.into());
        self
    }

    pub fn insert(&mut self, name: &'static str, value: Value) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Remove and return a field, failing if it is absent
    pub fn take(&mut self, name: &str) -> CodecResult<Value> {
        self.0
            .remove(name)
            .ok_or_else(|| CodecError::MissingField(name.to_string()))
    }

    pub fn take_u8(&mut self, name: &str) -> CodecResult<u8> {
        self.take(name)?.into_u8(name)
    }

    pub fn take_u16(&mut self, name: &str) -> CodecResult<u16> {
        self.take(name)?.into_u16(name)
    }

    pub fn take_u32(&mut self, name: &str) -> CodecResult<u32> {
        self.take(name)?.into_u32(name)
    }

    pub fn take_u64(&mut self, name: &str) -> CodecResult<u64> {
        self.take(name)?.into_u64(name)
    }

    pub fn take_string(&mut self, name: &str) -> CodecResult<String> {
        self.take(name)?.into_string(name)
    }

    pub fn take_pubkey(&mut self, name: &str) -> CodecResult<Pubkey> {
        self.take(name)?.into_pubkey(name)
    }

    pub fn take_struct<T: SchemaType>(&mut self, name: &str) -> CodecResult<T> {
        self.take(name)?.into_struct(name)
    }

    /// Take an optional field and convert its payload when present
    pub fn take_option<T>(
        &mut self,
        name: &str,
        convert: impl FnOnce(Value, &str) -> CodecResult<T>,
    ) -> CodecResult<Option<T>> {
        match self.take(name)?.into_option(name)? {
            Some(inner) => convert(inner, name).map(Some),
            None => Ok(None),
        }
    }

    /// Check a constant discriminant field
    pub fn expect_discriminant(&mut self, name: &str, expected: u8) -> CodecResult<()> {
        let found = self.take_u8(name)?;
        if found != expected {
            return Err(CodecError::UnexpectedDiscriminant { expected, found });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A Rust type with a registered layout in a [`Schema`](super::Schema)
pub trait SchemaType: Sized {
    /// Name under which the layout is registered
    const TYPE_NAME: &'static str;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> CodecResult<Self>;
}
