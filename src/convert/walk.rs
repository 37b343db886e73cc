//! Conversion of a value tree into native values.
//!
//! The tree is walked in lockstep with the plan it was decoded against, which
//! supplies field names, enum symbols and union branch names. With a registry
//! present, every named type the walk meets is recorded and union values are
//! tagged with their branch type.

use std::collections::HashMap;

use crate::convert::native::NativeValue;
use crate::convert::registry::{NamedType, TypeRegistry};
use crate::error::DecodeError;
use crate::schema::{DecodePlan, NodeId, PlanStep};
use crate::value::AvroValue;

/// Convert `value`, decoded against `plan`'s root, into a native value.
pub fn to_native(
    value: AvroValue,
    plan: &DecodePlan,
    registry: Option<&mut TypeRegistry>,
) -> Result<NativeValue, DecodeError> {
    let mut converter = Converter { plan, registry };
    converter.convert(value, plan.root())
}

struct Converter<'a> {
    plan: &'a DecodePlan,
    registry: Option<&'a mut TypeRegistry>,
}

impl Converter<'_> {
    fn register(&mut self, id: NodeId) {
        if let Some(registry) = self.registry.as_deref_mut() {
            if let Some(named) = NamedType::from_plan(self.plan, id) {
                registry.register(named);
            }
        }
    }

    fn mismatch(&self, value: &AvroValue, id: NodeId) -> DecodeError {
        DecodeError::InvalidData(format!(
            "{} value does not match schema type {}",
            value.kind(),
            self.plan.graph().describe(id)
        ))
    }

    fn convert(&mut self, value: AvroValue, id: NodeId) -> Result<NativeValue, DecodeError> {
        let plan = self.plan;
        match (plan.step(id), value) {
            (PlanStep::Null, AvroValue::Null) => Ok(NativeValue::Null),
            (PlanStep::Boolean, AvroValue::Boolean(b)) => Ok(NativeValue::Bool(b)),
            (PlanStep::Int, AvroValue::Int(i)) => Ok(NativeValue::Int(i64::from(i))),
            (PlanStep::Long, AvroValue::Long(l)) => Ok(NativeValue::Int(l)),
            (PlanStep::Float, AvroValue::Float(f)) => Ok(NativeValue::Float(f64::from(f))),
            (PlanStep::Double, AvroValue::Double(d)) => Ok(NativeValue::Float(d)),
            (PlanStep::Bytes, AvroValue::Bytes(b)) => Ok(NativeValue::Bytes(b)),
            (PlanStep::String, AvroValue::String(s)) => Ok(NativeValue::Text(s)),
            (PlanStep::Fixed(_), AvroValue::Fixed(b)) => {
                self.register(id);
                Ok(NativeValue::Bytes(b))
            }
            (PlanStep::Enum(e), AvroValue::Enum(index)) => {
                let symbol = e.symbols.get(index).cloned().ok_or_else(|| {
                    DecodeError::InvalidData(format!(
                        "Enum index {} out of range for '{}'",
                        index, e.fullname
                    ))
                })?;
                self.register(id);
                Ok(NativeValue::Text(symbol))
            }
            (PlanStep::Record(record), AvroValue::Record(values)) => {
                if values.len() != record.fields.len() {
                    return Err(DecodeError::InvalidData(format!(
                        "Record '{}' has {} fields, value has {}",
                        record.fullname,
                        record.fields.len(),
                        values.len()
                    )));
                }
                self.register(id);
                let mut fields = Vec::with_capacity(values.len());
                for (field, value) in record.fields.iter().zip(values) {
                    fields.push((field.name.clone(), self.convert(value, field.node)?));
                }
                Ok(NativeValue::Record(fields))
            }
            (PlanStep::Array(items), AvroValue::Array(values)) => values
                .into_iter()
                .map(|v| self.convert(v, *items))
                .collect::<Result<Vec<_>, _>>()
                .map(NativeValue::Array),
            (PlanStep::Map(values), AvroValue::Map(entries)) => {
                let mut map = HashMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.convert(value, *values)?;
                    map.insert(key, value);
                }
                Ok(NativeValue::Map(map))
            }
            (PlanStep::Union(union), AvroValue::Union(index, value)) => {
                let branch = *union.branches.get(index).ok_or_else(|| {
                    DecodeError::InvalidData(format!(
                        "Union branch {} out of range (0..{})",
                        index,
                        union.branches.len()
                    ))
                })?;
                let native = self.convert(*value, branch)?;
                if self.registry.is_some() {
                    Ok(NativeValue::Tagged {
                        type_name: plan.graph().branch_name(branch),
                        value: Box::new(native),
                    })
                } else {
                    Ok(native)
                }
            }
            (_, value) => Err(self.mismatch(&value, id)),
        }
    }
}
