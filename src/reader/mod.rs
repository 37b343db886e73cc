//! Binary payload reading
//!
//! This module provides the byte cursor, varint codec, and the two decode
//! paths: direct decoding against one schema and resolved decoding of
//! writer-encoded bytes into a reader schema.

pub mod cursor;
pub mod decode;
pub mod resolved;
pub mod varint;

pub use cursor::BinaryCursor;
pub use decode::{decode_value, DecodeLimits, DEFAULT_MAX_COLLECTION_LEN, DEFAULT_MAX_DEPTH};
pub use resolved::decode_resolved;
// Re-export varint encoding functions for convenience
pub use varint::{encode_varint, encode_zigzag};
