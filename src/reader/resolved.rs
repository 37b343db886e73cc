//! Execution of a compiled [`Resolution`] over writer-encoded bytes.

use crate::error::DecodeError;
use crate::reader::cursor::BinaryCursor;
use crate::reader::decode::{
    decode_node, read_block_header, read_index, reserve_block, skip_node, DecodeLimits,
};
use crate::schema::{apply_promotion, Resolution, ResolvedStep, StepId, WriterField};
use crate::value::AvroValue;

/// Decode one writer-encoded value into the reader's shape.
pub fn decode_resolved(
    cursor: &mut BinaryCursor,
    resolution: &Resolution,
    limits: &DecodeLimits,
) -> Result<AvroValue, DecodeError> {
    run(cursor, resolution, resolution.root(), limits, 0)
}

fn run(
    cursor: &mut BinaryCursor,
    resolution: &Resolution,
    id: StepId,
    limits: &DecodeLimits,
    depth: usize,
) -> Result<AvroValue, DecodeError> {
    let writer = resolution.writer();

    match resolution.step(id) {
        ResolvedStep::Direct(node) => decode_node(cursor, writer, *node, limits, depth),
        ResolvedStep::Promote {
            writer: node,
            promotion,
        } => apply_promotion(decode_node(cursor, writer, *node, limits, depth)?, *promotion),
        ResolvedStep::Record {
            fields,
            defaults,
            reader_len,
        } => run_record(cursor, resolution, fields, defaults, *reader_len, limits, depth),
        ResolvedStep::Enum { mapping } => {
            let index = read_index(cursor, mapping.len(), "Enum")?;
            match &mapping[index] {
                Ok(reader_index) => Ok(AvroValue::Enum(*reader_index)),
                Err(e) => Err(e.clone().into()),
            }
        }
        ResolvedStep::Array(items) => {
            run_array(cursor, resolution, *items, limits, depth).map(AvroValue::Array)
        }
        ResolvedStep::Map(values) => {
            run_map(cursor, resolution, *values, limits, depth).map(AvroValue::Map)
        }
        // a union wraps exactly one value and does not add a nesting level
        ResolvedStep::WriterUnion(branches) => {
            let index = read_index(cursor, branches.len(), "Union")?;
            run(cursor, resolution, branches[index], limits, depth)
        }
        ResolvedStep::ReaderUnion { branch, step } => {
            let value = run(cursor, resolution, *step, limits, depth)?;
            Ok(AvroValue::Union(*branch, Box::new(value)))
        }
        ResolvedStep::Fail(e) => Err(e.clone().into()),
    }
}

fn run_record(
    cursor: &mut BinaryCursor,
    resolution: &Resolution,
    fields: &[WriterField],
    defaults: &[(usize, AvroValue)],
    reader_len: usize,
    limits: &DecodeLimits,
    depth: usize,
) -> Result<AvroValue, DecodeError> {
    let depth = limits.descend(depth)?;
    let mut slots: Vec<Option<AvroValue>> = vec![None; reader_len];
    for field in fields {
        match field {
            WriterField::Read { reader_pos, step } => {
                slots[*reader_pos] = Some(run(cursor, resolution, *step, limits, depth)?);
            }
            WriterField::Skip(node) => {
                skip_node(cursor, resolution.writer(), *node, limits, depth)?;
            }
        }
    }
    for (pos, value) in defaults {
        slots[*pos] = Some(value.clone());
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(pos, slot)| {
            slot.ok_or_else(|| {
                DecodeError::InvalidData(format!("Reader field {} was never filled", pos))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(AvroValue::Record)
}

fn run_array(
    cursor: &mut BinaryCursor,
    resolution: &Resolution,
    items: StepId,
    limits: &DecodeLimits,
    depth: usize,
) -> Result<Vec<AvroValue>, DecodeError> {
    let depth = limits.descend(depth)?;
    let mut values = Vec::new();
    let mut total = 0u64;
    while let Some(block) = read_block_header(cursor)? {
        limits.admit(&mut total, block.count)?;
        reserve_block(&mut values, block.count, cursor.remaining())?;
        for _ in 0..block.count {
            values.push(run(cursor, resolution, items, limits, depth)?);
        }
    }
    Ok(values)
}

fn run_map(
    cursor: &mut BinaryCursor,
    resolution: &Resolution,
    values: StepId,
    limits: &DecodeLimits,
    depth: usize,
) -> Result<Vec<(String, AvroValue)>, DecodeError> {
    let depth = limits.descend(depth)?;
    let mut entries = Vec::new();
    let mut total = 0u64;
    while let Some(block) = read_block_header(cursor)? {
        limits.admit(&mut total, block.count)?;
        reserve_block(&mut entries, block.count, cursor.remaining())?;
        for _ in 0..block.count {
            let key = cursor.read_string()?;
            entries.push((key, run(cursor, resolution, values, limits, depth)?));
        }
    }
    Ok(entries)
}
