//! Schema-bound Avro datum deserializer
//!
//! This library decodes Avro binary-encoded datums into native values using
//! a reader schema, optionally resolving bytes written with a different
//! writer schema. A session parses its reader schema once, derives a reusable
//! decode plan, and then decodes any number of payloads against it.
//!
//! # Example
//! ```
//! use avro_deser::{AvroDeserializer, NativeValue};
//!
//! let reader = r#"{"type": "record", "name": "P", "fields": [
//!     {"name": "a", "type": "long"},
//!     {"name": "b", "type": "string", "default": ""}
//! ]}"#;
//! let writer = r#"{"type": "record", "name": "P", "fields": [
//!     {"name": "a", "type": "int"}
//! ]}"#;
//!
//! let mut deser = AvroDeserializer::new(reader).unwrap();
//! let value = deser.decode(&[0x02], Some(writer)).unwrap();
//! assert_eq!(value.get("a"), Some(&NativeValue::Int(1)));
//! assert_eq!(value.get("b").and_then(NativeValue::as_str), Some(""));
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod reader;
pub mod schema;
pub mod session;
pub mod value;

// Re-export main types
pub use config::DeserializerConfig;
pub use convert::{to_native, NamedKind, NamedType, NativeValue, TypeRegistry};
pub use error::{
    DecodeError, DeserializerError, ErrorKind, ResolutionError, ResourceError, SchemaError,
};
pub use reader::{decode_resolved, decode_value, BinaryCursor, DecodeLimits};
pub use schema::{
    apply_promotion, parse_schema, parse_schema_with_options, rabin_fingerprint, DecodePlan,
    Resolution, SchemaGraph, SchemaNode, SchemaParser, TypePromotion,
};
pub use session::{AvroDeserializer, DecodeState, Reconstruction, TYPE_IDENTITY};
pub use value::AvroValue;
