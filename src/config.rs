//! Deserializer configuration.

use serde::{Deserialize, Serialize};

use crate::reader::{DecodeLimits, DEFAULT_MAX_COLLECTION_LEN, DEFAULT_MAX_DEPTH};

/// Configuration for an [`AvroDeserializer`](crate::AvroDeserializer).
///
/// Missing keys take their default when loaded from JSON:
///
/// ```
/// use avro_deser::DeserializerConfig;
///
/// let config: DeserializerConfig = serde_json::from_str(r#"{"track_types": true}"#).unwrap();
/// assert!(config.track_types);
/// assert_eq!(config.max_depth, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeserializerConfig {
    /// Record named types in a registry and tag union values (default: false).
    pub track_types: bool,
    /// Reject schema rule violations instead of warning (default: false).
    pub strict_schema: bool,
    /// Deepest allowed nesting of records, arrays and maps (default: 128).
    pub max_depth: usize,
    /// Most elements allowed in one array or map (default: 16 Mi).
    pub max_collection_len: usize,
    /// Ignore bytes left after the value (default: true).
    pub allow_trailing_bytes: bool,
}

impl Default for DeserializerConfig {
    fn default() -> Self {
        Self {
            track_types: false,
            strict_schema: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
            allow_trailing_bytes: true,
        }
    }
}

impl DeserializerConfig {
    /// Create a new DeserializerConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable named-type tracking.
    pub fn with_track_types(mut self, track: bool) -> Self {
        self.track_types = track;
        self
    }

    /// Enable or disable strict schema validation.
    pub fn with_strict_schema(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Set the nesting depth limit.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the per-collection element limit.
    pub fn with_max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }

    /// Allow or reject bytes left over after the value.
    pub fn with_allow_trailing_bytes(mut self, allow: bool) -> Self {
        self.allow_trailing_bytes = allow;
        self
    }

    /// Decoder limits taken from this configuration.
    pub fn limits(&self) -> DecodeLimits {
        DecodeLimits {
            max_depth: self.max_depth,
            max_collection_len: self.max_collection_len,
        }
    }
}
