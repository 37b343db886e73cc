//! Avro schema types, parsing, decode plans and resolution.
//!
//! This module defines the schema graph arena, its JSON parser, the decode
//! plans derived from it, canonical-form fingerprints, and the compiled
//! programs that resolve a writer schema against a reader schema.

mod canonical;
mod defaults;
mod parser;
mod plan;
mod resolution;
mod types;

pub use canonical::rabin_fingerprint;
pub use parser::{parse_schema, parse_schema_with_options, SchemaParser};
pub use plan::{DecodePlan, EnumStep, FieldStep, PlanStep, RecordStep, UnionStep};
pub use resolution::{
    apply_promotion, Resolution, ResolvedStep, StepId, TypePromotion, WriterField,
};
pub use types::*;
