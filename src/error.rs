//! Error types for schema parsing, decoding and resolution

use thiserror::Error;

/// Errors that can occur while building a schema graph
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Schema text is not valid JSON
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Structurally invalid schema
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Type name that is neither a primitive nor a defined named type
    #[error("Unknown type: {0}")]
    UnknownType(String),
    /// Named type defined twice
    #[error("Duplicate named type: {0}")]
    DuplicateName(String),
    /// Field default does not match the field's declared type
    #[error("Invalid default for field '{field}': {reason}")]
    InvalidDefault { field: String, reason: String },
}

/// Errors raised by schema resolution between a writer and a reader schema
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// Reader field missing from the writer, without a default
    #[error("Reader field '{record}.{field}' not in writer schema and has no default")]
    MissingDefault { record: String, field: String },
    /// Writer union branch matches no reader branch
    #[error("Writer type '{writer}' matches no branch of reader union {reader}")]
    UnresolvableUnion { writer: String, reader: String },
    /// Writer enum symbol missing from the reader, which has no default symbol
    #[error("Symbol '{symbol}' not in reader enum '{enum_name}' and no default symbol")]
    UnknownEnumSymbol { enum_name: String, symbol: String },
    /// Writer and reader types cannot be reconciled
    #[error("Cannot resolve writer type '{writer}' to reader type '{reader}'")]
    TypeMismatch { writer: String, reader: String },
}

/// Errors raised when a decode would exceed resource limits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Allocation for decoded data failed
    #[error("Allocation of {requested} elements failed")]
    AllocationFailed { requested: usize },
    /// Value nesting is deeper than the configured limit
    #[error("Nesting depth exceeds limit of {limit}")]
    DepthLimitExceeded { limit: usize },
    /// Array or map holds more elements than the configured limit
    #[error("Collection of {count} elements exceeds limit of {limit}")]
    CollectionTooLarge { count: u64, limit: usize },
}

/// Errors that can occur during decoding
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Fewer bytes remain than the next read requires
    #[error("Truncated input at position {position}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        position: usize,
        needed: usize,
        remaining: usize,
    },
    /// Varint longer than 10 bytes or overflowing 64 bits
    #[error("Malformed varint at position {position}")]
    MalformedVarint { position: usize },
    /// Invalid Avro data
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// String is not valid UTF-8
    #[error("Invalid UTF-8 at position {position}")]
    InvalidUtf8 { position: usize },
    /// Input continues after the value was complete
    #[error("{remaining} trailing bytes after value at position {position}")]
    TrailingBytes { position: usize, remaining: usize },
    /// Resolution failure reached while reading data
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// Resource limit reached while reading data
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Top-level error type returned by [`crate::AvroDeserializer`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeserializerError {
    /// Reader or writer schema could not be parsed
    #[error("Error reading schema: {0}")]
    Schema(#[from] SchemaError),

    /// Payload could not be decoded
    #[error("Deserialization error: {0}")]
    Decode(DecodeError),

    /// Writer schema could not be resolved against the reader schema
    #[error("Schema resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Resource limit or allocation failure
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Session already closed
    #[error("Deserializer is closed")]
    Closed,
}

impl From<DecodeError> for DeserializerError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Resolution(e) => DeserializerError::Resolution(e),
            DecodeError::Resource(e) => DeserializerError::Resource(e),
            other => DeserializerError::Decode(other),
        }
    }
}

/// Coarse classification of a [`DeserializerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Schema,
    TruncatedInput,
    MalformedVarint,
    InvalidData,
    MissingDefault,
    UnresolvableUnion,
    UnknownEnumSymbol,
    TypeMismatch,
    Resource,
    Closed,
}

impl DeserializerError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeserializerError::Schema(_) => ErrorKind::Schema,
            DeserializerError::Decode(DecodeError::TruncatedInput { .. }) => {
                ErrorKind::TruncatedInput
            }
            DeserializerError::Decode(DecodeError::MalformedVarint { .. }) => {
                ErrorKind::MalformedVarint
            }
            DeserializerError::Decode(DecodeError::Resolution(e))
            | DeserializerError::Resolution(e) => match e {
                ResolutionError::MissingDefault { .. } => ErrorKind::MissingDefault,
                ResolutionError::UnresolvableUnion { .. } => ErrorKind::UnresolvableUnion,
                ResolutionError::UnknownEnumSymbol { .. } => ErrorKind::UnknownEnumSymbol,
                ResolutionError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            },
            DeserializerError::Decode(DecodeError::Resource(_))
            | DeserializerError::Resource(_) => ErrorKind::Resource,
            DeserializerError::Decode(_) => ErrorKind::InvalidData,
            DeserializerError::Closed => ErrorKind::Closed,
        }
    }

    /// Whether the same call may succeed later without changing the input.
    ///
    /// Only allocation failures qualify; everything else is permanent for
    /// the payload that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeserializerError::Resource(ResourceError::AllocationFailed { .. })
        )
    }

    /// Whether the error came from reconciling writer and reader schemas.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingDefault
                | ErrorKind::UnresolvableUnion
                | ErrorKind::UnknownEnumSymbol
                | ErrorKind::TypeMismatch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_flattens_resolution() {
        let err: DeserializerError = DecodeError::Resolution(ResolutionError::UnknownEnumSymbol {
            enum_name: "Suit".to_string(),
            symbol: "JOKER".to_string(),
        })
        .into();
        assert!(matches!(err, DeserializerError::Resolution(_)));
        assert_eq!(err.kind(), ErrorKind::UnknownEnumSymbol);
        assert!(err.is_resolution_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_decode_error_flattens_resource() {
        let err: DeserializerError =
            DecodeError::Resource(ResourceError::AllocationFailed { requested: 10 }).into();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.is_retryable());

        let err: DeserializerError =
            DecodeError::Resource(ResourceError::DepthLimitExceeded { limit: 4 }).into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_message_includes_diagnostic() {
        let err: DeserializerError = DecodeError::TruncatedInput {
            position: 3,
            needed: 8,
            remaining: 2,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::TruncatedInput);
        let msg = err.to_string();
        assert!(msg.starts_with("Deserialization error"));
        assert!(msg.contains("position 3"));
    }
}
