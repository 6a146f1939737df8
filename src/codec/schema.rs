//! Declarative schema table
//!
//! A schema maps a type name to its ordered list of fields. Field types are a
//! closed set; new wire types are added here as variants, never patched in at
//! runtime.

use super::errors::{CodecError, CodecResult};
use std::collections::HashMap;

/// Wire type of a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    U8,
    U16,
    U32,
    U64,
    /// Single byte, 0 or 1
    Bool,
    /// u32 little-endian length prefix followed by UTF-8 bytes
    String,
    /// Exactly `n` raw bytes, no prefix
    FixedBytes(usize),
    /// 32 raw bytes interpreted as an address
    Pubkey,
    /// Nested struct, resolved by name in the same schema
    Struct(&'static str),
    /// Presence byte (0 = absent, 1 = present) followed by the inner value
    Option(Box<FieldType>),
    /// u32 little-endian element count followed by the elements
    Vec(Box<FieldType>),
}

impl FieldType {
    pub fn option(inner: FieldType) -> Self {
        Self::Option(Box::new(inner))
    }

    pub fn vec(inner: FieldType) -> Self {
        Self::Vec(Box::new(inner))
    }

    /// Smallest number of bytes any value of this type occupies
    pub fn min_len(&self, schema: &Schema) -> CodecResult<usize> {
        Ok(match self {
            Self::U8 | Self::Bool | Self::Option(_) => 1,
            Self::U16 => 2,
            Self::U32 | Self::String | Self::Vec(_) => 4,
            Self::U64 => 8,
            Self::FixedBytes(n) => *n,
            Self::Pubkey => 32,
            Self::Struct(name) => schema.min_len(name)?,
        })
    }

    /// Short human-readable name used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::U8 => "u8".into(),
            Self::U16 => "u16".into(),
            Self::U32 => "u32".into(),
            Self::U64 => "u64".into(),
            Self::Bool => "bool".into(),
            Self::String => "string".into(),
            Self::FixedBytes(n) => format!("[u8; {}]", n),
            Self::Pubkey => "pubkey".into(),
            Self::Struct(name) => (*name).to_string(),
            Self::Option(inner) => format!("option<{}>", inner.describe()),
            Self::Vec(inner) => format!("vec<{}>", inner.describe()),
        }
    }
}

/// One named field of a struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

/// Ordered field layout of one struct type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructSchema {
    pub name: &'static str,
    pub fields: Vec<Field>,
}

/// Registry of struct layouts, built once and shared read-only
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: HashMap<&'static str, StructSchema>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Look up a struct layout by name
    pub fn get(&self, name: &str) -> CodecResult<&StructSchema> {
        self.types
            .get(name)
            .ok_or_else(|| CodecError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Minimum encoded size of the named struct
    pub fn min_len(&self, name: &str) -> CodecResult<usize> {
        let layout = self.get(name)?;
        layout
            .fields
            .iter()
            .try_fold(0usize, |acc, f| Ok(acc + f.ty.min_len(self)?))
    }

    /// Check that every nested struct reference resolves
    pub fn validate(&self) -> CodecResult<()> {
        fn check(schema: &Schema, ty: &FieldType) -> CodecResult<()> {
            match ty {
                FieldType::Struct(name) => schema.get(name).map(|_| ()),
                FieldType::Option(inner) | FieldType::Vec(inner) => check(schema, inner),
                _ => Ok(()),
            }
        }

        for layout in self.types.values() {
            for field in &layout.fields {
                check(self, &field.ty)?;
            }
        }
        Ok(())
    }
}

/// Incremental schema construction
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    types: HashMap<&'static str, StructSchema>,
}

impl SchemaBuilder {
    /// Register a struct layout; a later registration under the same name replaces it
    pub fn register(mut self, name: &'static str, fields: Vec<(&'static str, FieldType)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, ty)| Field { name, ty })
            .collect();
        self.types.insert(name, StructSchema { name, fields });
        self
    }

    pub fn build(self) -> Schema {
        Schema { types: self.types }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::builder()
            .register("Inner", vec![("a", FieldType::U16), ("b", FieldType::String)])
            .register(
                "Outer",
                vec![
                    ("tag", FieldType::U8),
                    ("inner", FieldType::Struct("Inner")),
                    ("maybe", FieldType::option(FieldType::U64)),
                    ("key", FieldType::Pubkey),
                ],
            )
            .build()
    }

    #[test]
    fn test_min_len_includes_nested() {
        let schema = sample();
        assert_eq!(schema.min_len("Inner").unwrap(), 6);
        assert_eq!(schema.min_len("Outer").unwrap(), 1 + 6 + 1 + 32);
    }

    #[test]
    fn test_validate_detects_dangling_reference() {
        let schema = Schema::builder()
            .register("Broken", vec![("x", FieldType::vec(FieldType::Struct("Missing")))])
            .build();
        assert_eq!(
            schema.validate(),
            Err(CodecError::UnknownType("Missing".to_string()))
        );
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            FieldType::option(FieldType::vec(FieldType::Struct("Creator"))).describe(),
            "option<vec<Creator>>"
        );
        assert_eq!(FieldType::FixedBytes(32).describe(), "[u8; 32]");
    }
}
