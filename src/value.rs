//! Generic value tree produced by both decode paths.
//!
//! Values mirror the schema they were decoded against but carry no names:
//! record fields are positional, enums hold a symbol index, unions hold a
//! branch index. Names come from the [`DecodePlan`](crate::schema::DecodePlan)
//! the value is walked with.

/// Represents a decoded Avro value.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Record field values in declared field order
    Record(Vec<AvroValue>),
    /// Enum symbol index
    Enum(usize),
    /// Array of values
    Array(Vec<AvroValue>),
    /// Map entries in wire order
    Map(Vec<(String, AvroValue)>),
    /// Union branch index and value
    Union(usize, Box<AvroValue>),
    /// Fixed-size byte array
    Fixed(Vec<u8>),
}

impl AvroValue {
    /// Short name of the value's variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AvroValue::Null => "null",
            AvroValue::Boolean(_) => "boolean",
            AvroValue::Int(_) => "int",
            AvroValue::Long(_) => "long",
            AvroValue::Float(_) => "float",
            AvroValue::Double(_) => "double",
            AvroValue::Bytes(_) => "bytes",
            AvroValue::String(_) => "string",
            AvroValue::Record(_) => "record",
            AvroValue::Enum(_) => "enum",
            AvroValue::Array(_) => "array",
            AvroValue::Map(_) => "map",
            AvroValue::Union(..) => "union",
            AvroValue::Fixed(_) => "fixed",
        }
    }
}
