//! Error types for the binary codec

use thiserror::Error;

/// Failure while encoding or decoding a schema-described record
///
/// Decoding never falls back to defaults: short input, bad presence bytes
/// and invalid UTF-8 all surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before the field could be read
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// Option marker was neither 0 nor 1
    #[error("Invalid presence byte: {0:#04x}")]
    InvalidPresenceByte(u8),

    /// Bool byte was neither 0 nor 1
    #[error("Invalid bool byte: {0:#04x}")]
    InvalidBool(u8),

    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    /// Length does not fit the u32 length prefix
    #[error("Length {0} overflows u32 length prefix")]
    LengthOverflow(usize),

    /// Struct reference not present in the schema table
    #[error("Unknown schema type: {0}")]
    UnknownType(String),

    /// Value shape does not match the declared field type
    #[error("Type mismatch for field '{field}': expected {expected}")]
    TypeMismatch { field: String, expected: String },

    #[error("Missing field: {0}")]
    MissingField(String),

    /// Strict decode left unread bytes behind
    #[error("{0} trailing bytes after decode")]
    TrailingBytes(usize),

    /// Leading instruction byte does not match the target variant
    #[error("Unexpected discriminant: expected {expected}, found {found}")]
    UnexpectedDiscriminant { expected: u8, found: u8 },
}

impl CodecError {
    pub(crate) fn mismatch(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::UnexpectedEof {
            needed: 8,
            remaining: 3,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected end of input: needed 8 bytes, 3 remaining"
        );

        let err = CodecError::InvalidPresenceByte(7);
        assert_eq!(err.to_string(), "Invalid presence byte: 0x07");
    }
}
