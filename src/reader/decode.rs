//! Direct binary decoding against a single schema.
//!
//! Used when no writer schema is supplied, or when the writer schema is the
//! reader schema. Values are read in the schema's declared wire order.
//!
//! Arrays and maps are encoded as a series of blocks. Each block starts with
//! a long count; a negative count is followed by the block's byte size, and a
//! zero count ends the sequence.

use crate::error::{DecodeError, ResourceError};
use crate::reader::cursor::BinaryCursor;
use crate::schema::{DecodePlan, NodeId, PlanStep};
use crate::value::AvroValue;

/// Default maximum value nesting depth.
///
/// Decoding recurses once per nesting level on both the direct and the
/// resolved path; this limit keeps the deepest accepted value well inside a
/// 2 MiB thread stack in unoptimised builds.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default maximum number of elements in one array or map.
pub const DEFAULT_MAX_COLLECTION_LEN: usize = 16 * 1024 * 1024;

/// Resource limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Deepest allowed nesting of records, arrays and maps. A union adds no
    /// level of its own.
    pub max_depth: usize,
    /// Most elements allowed in a single array or map.
    pub max_collection_len: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
        }
    }
}

impl DecodeLimits {
    /// Depth one level below `depth`, or an error past the limit.
    pub(crate) fn descend(&self, depth: usize) -> Result<usize, DecodeError> {
        if depth >= self.max_depth {
            return Err(ResourceError::DepthLimitExceeded {
                limit: self.max_depth,
            }
            .into());
        }
        Ok(depth + 1)
    }

    /// Add a block of `count` elements to a running collection total.
    pub(crate) fn admit(&self, total: &mut u64, count: u64) -> Result<(), DecodeError> {
        *total = total.saturating_add(count);
        if *total > self.max_collection_len as u64 {
            return Err(ResourceError::CollectionTooLarge {
                count: *total,
                limit: self.max_collection_len,
            }
            .into());
        }
        Ok(())
    }
}

/// Header of one array or map block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockHeader {
    /// Number of elements in the block.
    pub count: u64,
    /// Byte size of the block body, when the writer recorded it.
    pub byte_size: Option<usize>,
}

/// Read a block header; `None` marks the end of the collection.
pub(crate) fn read_block_header(
    cursor: &mut BinaryCursor,
) -> Result<Option<BlockHeader>, DecodeError> {
    let position = cursor.position();
    let count = cursor.read_zigzag_long()?;
    if count == 0 {
        return Ok(None);
    }
    if count > 0 {
        return Ok(Some(BlockHeader {
            count: count as u64,
            byte_size: None,
        }));
    }
    if count == i64::MIN {
        return Err(DecodeError::InvalidData(format!(
            "Block count {} at position {} cannot be negated",
            count, position
        )));
    }
    let byte_size = cursor.read_length()?;
    Ok(Some(BlockHeader {
        count: count.unsigned_abs(),
        byte_size: Some(byte_size),
    }))
}

/// Reserve room for a block without trusting the declared count.
///
/// The reservation is capped by the bytes left in the input; items that
/// encode to zero bytes simply grow the vector as they are pushed.
pub(crate) fn reserve_block<T>(
    items: &mut Vec<T>,
    count: u64,
    remaining: usize,
) -> Result<(), DecodeError> {
    let wanted = usize::try_from(count).unwrap_or(usize::MAX).min(remaining);
    items
        .try_reserve(wanted)
        .map_err(|_| ResourceError::AllocationFailed { requested: wanted }.into())
}

/// Read a branch or symbol index and check it against `len`.
pub(crate) fn read_index(
    cursor: &mut BinaryCursor,
    len: usize,
    what: &str,
) -> Result<usize, DecodeError> {
    let position = cursor.position();
    let raw = cursor.read_zigzag_long()?;
    match usize::try_from(raw) {
        Ok(index) if index < len => Ok(index),
        _ => Err(DecodeError::InvalidData(format!(
            "{} index {} at position {} out of range (0..{})",
            what, raw, position, len
        ))),
    }
}

/// Decode one value of the plan's root schema.
///
/// # Example
/// ```
/// use avro_deser::reader::{decode_value, BinaryCursor, DecodeLimits};
/// use avro_deser::schema::DecodePlan;
/// use avro_deser::AvroValue;
///
/// let plan = DecodePlan::from_schema_text(r#"{"type": "array", "items": "int"}"#, false).unwrap();
/// let mut cursor = BinaryCursor::from_slice(&[0x04, 0x02, 0x04, 0x00]);
/// let value = decode_value(&mut cursor, &plan, &DecodeLimits::default()).unwrap();
/// assert_eq!(value, AvroValue::Array(vec![AvroValue::Int(1), AvroValue::Int(2)]));
/// ```
pub fn decode_value(
    cursor: &mut BinaryCursor,
    plan: &DecodePlan,
    limits: &DecodeLimits,
) -> Result<AvroValue, DecodeError> {
    decode_node(cursor, plan, plan.root(), limits, 0)
}

/// Decode one value of node `id`.
pub(crate) fn decode_node(
    cursor: &mut BinaryCursor,
    plan: &DecodePlan,
    id: NodeId,
    limits: &DecodeLimits,
    depth: usize,
) -> Result<AvroValue, DecodeError> {
    match plan.step(id) {
        PlanStep::Null => Ok(AvroValue::Null),
        PlanStep::Boolean => cursor.read_boolean().map(AvroValue::Boolean),
        PlanStep::Int => cursor.read_int().map(AvroValue::Int),
        PlanStep::Long => cursor.read_zigzag_long().map(AvroValue::Long),
        PlanStep::Float => cursor.read_float().map(AvroValue::Float),
        PlanStep::Double => cursor.read_double().map(AvroValue::Double),
        PlanStep::Bytes => cursor.read_bytes().map(AvroValue::Bytes),
        PlanStep::String => cursor.read_string().map(AvroValue::String),
        PlanStep::Fixed(size) => cursor
            .read_fixed(*size)
            .map(|bytes| AvroValue::Fixed(bytes.to_vec())),
        PlanStep::Enum(e) => read_index(cursor, e.symbols.len(), "Enum").map(AvroValue::Enum),
        PlanStep::Record(record) => {
            let depth = limits.descend(depth)?;
            let mut values = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                values.push(decode_node(cursor, plan, field.node, limits, depth)?);
            }
            Ok(AvroValue::Record(values))
        }
        PlanStep::Array(items) => {
            let depth = limits.descend(depth)?;
            decode_array(cursor, plan, *items, limits, depth).map(AvroValue::Array)
        }
        PlanStep::Map(values) => {
            let depth = limits.descend(depth)?;
            decode_map(cursor, plan, *values, limits, depth).map(AvroValue::Map)
        }
        PlanStep::Union(union) => {
            let index = read_index(cursor, union.branches.len(), "Union")?;
            let value = decode_node(cursor, plan, union.branches[index], limits, depth)?;
            Ok(AvroValue::Union(index, Box::new(value)))
        }
    }
}

fn decode_array(
    cursor: &mut BinaryCursor,
    plan: &DecodePlan,
    items: NodeId,
    limits: &DecodeLimits,
    depth: usize,
) -> Result<Vec<AvroValue>, DecodeError> {
    let mut values = Vec::new();
    let mut total = 0u64;

    while let Some(block) = read_block_header(cursor)? {
        limits.admit(&mut total, block.count)?;
        reserve_block(&mut values, block.count, cursor.remaining())?;
        for _ in 0..block.count {
            values.push(decode_node(cursor, plan, items, limits, depth)?);
        }
    }

    Ok(values)
}

fn decode_map(
    cursor: &mut BinaryCursor,
    plan: &DecodePlan,
    values: NodeId,
    limits: &DecodeLimits,
    depth: usize,
) -> Result<Vec<(String, AvroValue)>, DecodeError> {
    let mut entries = Vec::new();
    let mut total = 0u64;

    while let Some(block) = read_block_header(cursor)? {
        limits.admit(&mut total, block.count)?;
        reserve_block(&mut entries, block.count, cursor.remaining())?;
        for _ in 0..block.count {
            let key = cursor.read_string()?;
            let value = decode_node(cursor, plan, values, limits, depth)?;
            entries.push((key, value));
        }
    }

    Ok(entries)
}

/// Advance past one value of node `id` without building it.
///
/// Blocks that carry a byte size are skipped in one step.
pub(crate) fn skip_node(
    cursor: &mut BinaryCursor,
    plan: &DecodePlan,
    id: NodeId,
    limits: &DecodeLimits,
    depth: usize,
) -> Result<(), DecodeError> {
    match plan.step(id) {
        PlanStep::Null => Ok(()),
        PlanStep::Boolean => cursor.skip(1),
        PlanStep::Int | PlanStep::Long => cursor.read_varint().map(|_| ()),
        PlanStep::Float => cursor.skip(4),
        PlanStep::Double => cursor.skip(8),
        PlanStep::Bytes | PlanStep::String => cursor.read_length_prefixed_bytes().map(|_| ()),
        PlanStep::Fixed(size) => cursor.skip(*size),
        PlanStep::Enum(e) => read_index(cursor, e.symbols.len(), "Enum").map(|_| ()),
        PlanStep::Record(record) => {
            let depth = limits.descend(depth)?;
            record
                .fields
                .iter()
                .try_for_each(|field| skip_node(cursor, plan, field.node, limits, depth))
        }
        PlanStep::Array(items) => {
            let depth = limits.descend(depth)?;
            skip_blocks(cursor, limits, |cursor| {
                skip_node(cursor, plan, *items, limits, depth)
            })
        }
        PlanStep::Map(values) => {
            let depth = limits.descend(depth)?;
            skip_blocks(cursor, limits, |cursor| {
                cursor.read_length_prefixed_bytes()?;
                skip_node(cursor, plan, *values, limits, depth)
            })
        }
        PlanStep::Union(union) => {
            let index = read_index(cursor, union.branches.len(), "Union")?;
            skip_node(cursor, plan, union.branches[index], limits, depth)
        }
    }
}

fn skip_blocks<F>(
    cursor: &mut BinaryCursor,
    limits: &DecodeLimits,
    mut skip_item: F,
) -> Result<(), DecodeError>
where
    F: FnMut(&mut BinaryCursor) -> Result<(), DecodeError>,
{
    let mut total = 0u64;
    while let Some(block) = read_block_header(cursor)? {
        if let Some(byte_size) = block.byte_size {
            cursor.skip(byte_size)?;
            continue;
        }
        limits.admit(&mut total, block.count)?;
        for _ in 0..block.count {
            skip_item(cursor)?;
        }
    }
    Ok(())
}
