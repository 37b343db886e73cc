//! Shared helpers for building Avro binary payloads in tests.

#![allow(dead_code)]

use avro_deser::reader::varint::encode_zigzag;

/// Minimal Avro binary encoder used to build test payloads.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn long(mut self, value: i64) -> Self {
        self.buf.extend(encode_zigzag(value));
        self
    }

    pub fn int(self, value: i32) -> Self {
        self.long(i64::from(value))
    }

    pub fn boolean(mut self, value: bool) -> Self {
        self.buf.push(u8::from(value));
        self
    }

    pub fn float(mut self, value: f32) -> Self {
        self.buf.extend(value.to_le_bytes());
        self
    }

    pub fn double(mut self, value: f64) -> Self {
        self.buf.extend(value.to_le_bytes());
        self
    }

    pub fn bytes(mut self, value: &[u8]) -> Self {
        self = self.long(value.len() as i64);
        self.buf.extend_from_slice(value);
        self
    }

    pub fn string(self, value: &str) -> Self {
        self.bytes(value.as_bytes())
    }

    pub fn fixed(mut self, value: &[u8]) -> Self {
        self.buf.extend_from_slice(value);
        self
    }

    /// Union branch or enum symbol index.
    pub fn index(self, index: i64) -> Self {
        self.long(index)
    }

    /// Block header with a plain element count.
    pub fn block(self, count: i64) -> Self {
        self.long(count)
    }

    /// Block header with a negated count followed by the body's byte size.
    pub fn sized_block(self, count: i64, byte_size: i64) -> Self {
        self.long(-count).long(byte_size)
    }

    /// Terminating zero-count block.
    pub fn end(self) -> Self {
        self.long(0)
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reader schema `P{a: long, b: string}`.
pub const PERSON_SCHEMA: &str = r#"{
    "type": "record",
    "name": "P",
    "fields": [
        {"name": "a", "type": "long"},
        {"name": "b", "type": "string"}
    ]
}"#;

/// A linked list of longs.
pub const LIST_SCHEMA: &str = r#"{
    "type": "record",
    "name": "LongList",
    "namespace": "test.lists",
    "fields": [
        {"name": "value", "type": "long"},
        {"name": "next", "type": ["null", "LongList"]}
    ]
}"#;

/// `LIST_SCHEMA` as written by a producer that stored `value` as an int.
pub const INT_LIST_SCHEMA: &str = r#"{
    "type": "record",
    "name": "LongList",
    "namespace": "test.lists",
    "fields": [
        {"name": "value", "type": "int"},
        {"name": "next", "type": ["null", "LongList"]}
    ]
}"#;

/// A list of `len` nodes holding `0..len`, readable with either list schema.
pub fn list_payload(len: usize) -> Vec<u8> {
    (0..len)
        .fold(Encoder::new(), |enc, i| {
            enc.long(i as i64).index(i64::from(i + 1 < len))
        })
        .finish()
}
