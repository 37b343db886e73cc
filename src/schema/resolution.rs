//! Schema resolution for reader/writer schema evolution.
//!
//! A [`Resolution`] is a decode program compiled from a writer plan and a
//! reader plan. It reads bytes laid out by the writer schema and produces
//! values shaped by the reader schema:
//! - record fields are matched by name (reader aliases also match); writer
//!   fields the reader does not know are skipped, and reader fields the
//!   writer does not know take their default
//! - enum symbols are matched by name, falling back to the reader's default
//! - union branches are re-selected against the reader schema
//! - numeric and string/bytes promotions are applied
//!
//! Steps are memoised per (writer record, reader record) pair so recursive
//! schemas compile to a finite program. Failures that depend on the data
//! being read (a writer union branch or an enum symbol the reader cannot
//! accept) are compiled into the program and raised only when reached.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DecodeError, ResolutionError};
use crate::schema::defaults::default_value;
use crate::schema::{DecodePlan, NodeId, PlanStep, SchemaNode};
use crate::value::AvroValue;

/// Index of a step within a [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepId(usize);

/// Type promotions supported by Avro schema resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePromotion {
    /// int → long
    IntToLong,
    /// int → float
    IntToFloat,
    /// int → double
    IntToDouble,
    /// long → float
    LongToFloat,
    /// long → double
    LongToDouble,
    /// float → double
    FloatToDouble,
    /// string → bytes
    StringToBytes,
    /// bytes → string
    BytesToString,
}

impl TypePromotion {
    /// The promotion from a writer primitive to a different reader primitive.
    pub fn between(writer: &SchemaNode, reader: &SchemaNode) -> Option<Self> {
        match (writer, reader) {
            (SchemaNode::Int, SchemaNode::Long) => Some(TypePromotion::IntToLong),
            (SchemaNode::Int, SchemaNode::Float) => Some(TypePromotion::IntToFloat),
            (SchemaNode::Int, SchemaNode::Double) => Some(TypePromotion::IntToDouble),
            (SchemaNode::Long, SchemaNode::Float) => Some(TypePromotion::LongToFloat),
            (SchemaNode::Long, SchemaNode::Double) => Some(TypePromotion::LongToDouble),
            (SchemaNode::Float, SchemaNode::Double) => Some(TypePromotion::FloatToDouble),
            (SchemaNode::String, SchemaNode::Bytes) => Some(TypePromotion::StringToBytes),
            (SchemaNode::Bytes, SchemaNode::String) => Some(TypePromotion::BytesToString),
            _ => None,
        }
    }
}

/// Apply a type promotion to a decoded writer value.
pub fn apply_promotion(
    value: AvroValue,
    promotion: TypePromotion,
) -> Result<AvroValue, DecodeError> {
    match (value, promotion) {
        (AvroValue::Int(v), TypePromotion::IntToLong) => Ok(AvroValue::Long(i64::from(v))),
        (AvroValue::Int(v), TypePromotion::IntToFloat) => Ok(AvroValue::Float(v as f32)),
        (AvroValue::Int(v), TypePromotion::IntToDouble) => Ok(AvroValue::Double(f64::from(v))),
        (AvroValue::Long(v), TypePromotion::LongToFloat) => Ok(AvroValue::Float(v as f32)),
        (AvroValue::Long(v), TypePromotion::LongToDouble) => Ok(AvroValue::Double(v as f64)),
        (AvroValue::Float(v), TypePromotion::FloatToDouble) => {
            Ok(AvroValue::Double(f64::from(v)))
        }
        (AvroValue::String(s), TypePromotion::StringToBytes) => {
            Ok(AvroValue::Bytes(s.into_bytes()))
        }
        (AvroValue::Bytes(b), TypePromotion::BytesToString) => {
            let s = String::from_utf8(b).map_err(|e| {
                DecodeError::InvalidData(format!("Cannot convert bytes to string: {}", e))
            })?;
            Ok(AvroValue::String(s))
        }
        (value, promotion) => Err(DecodeError::InvalidData(format!(
            "Cannot apply {:?} promotion to {} value",
            promotion,
            value.kind()
        ))),
    }
}

/// What to do with one writer field, in writer order.
#[derive(Debug, Clone)]
pub enum WriterField {
    /// Decode the field into reader position `reader_pos`.
    Read { reader_pos: usize, step: StepId },
    /// Decode and discard a field the reader does not declare.
    Skip(NodeId),
}

/// One step of a resolved decode program.
#[derive(Debug, Clone)]
pub enum ResolvedStep {
    /// Writer and reader agree; decode the writer node as is.
    Direct(NodeId),
    /// Decode the writer node, then promote it to the reader type.
    Promote {
        writer: NodeId,
        promotion: TypePromotion,
    },
    /// Record with fields in writer order and defaults for the rest.
    Record {
        fields: Vec<WriterField>,
        defaults: Vec<(usize, AvroValue)>,
        reader_len: usize,
    },
    /// Writer symbol index to reader symbol index.
    Enum {
        mapping: Vec<Result<usize, ResolutionError>>,
    },
    Array(StepId),
    Map(StepId),
    /// Writer union; one step per writer branch.
    WriterUnion(Vec<StepId>),
    /// Writer non-union read into the given reader union branch.
    ReaderUnion { branch: usize, step: StepId },
    /// Deferred failure, raised when the step is reached.
    Fail(ResolutionError),
}

/// A compiled writer-to-reader decode program.
#[derive(Debug, Clone)]
pub struct Resolution {
    writer: Arc<DecodePlan>,
    reader: Arc<DecodePlan>,
    steps: Vec<ResolvedStep>,
    root: StepId,
}

impl Resolution {
    /// Compile the program resolving `writer` against `reader`.
    ///
    /// # Errors
    /// Structural mismatches fail here: incompatible types, record name
    /// mismatches, and reader fields with neither a writer counterpart nor a
    /// default.
    pub fn new(writer: Arc<DecodePlan>, reader: Arc<DecodePlan>) -> Result<Self, ResolutionError> {
        let mut builder = Builder {
            writer: &writer,
            reader: &reader,
            steps: Vec::new(),
            records: HashMap::new(),
        };
        let root = builder.resolve(writer.root(), reader.root())?;
        let steps = builder.steps;

        Ok(Self {
            writer,
            reader,
            steps,
            root,
        })
    }

    /// The writer plan the program reads bytes with.
    pub fn writer(&self) -> &DecodePlan {
        &self.writer
    }

    /// The reader plan whose shape the program produces.
    pub fn reader(&self) -> &DecodePlan {
        &self.reader
    }

    /// The entry step.
    pub fn root(&self) -> StepId {
        self.root
    }

    /// Look up a step.
    pub fn step(&self, id: StepId) -> &ResolvedStep {
        &self.steps[id.0]
    }

    /// Number of compiled steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the program has no steps (never true once built).
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

struct Builder<'a> {
    writer: &'a DecodePlan,
    reader: &'a DecodePlan,
    steps: Vec<ResolvedStep>,
    records: HashMap<(NodeId, NodeId), StepId>,
}

impl<'a> Builder<'a> {
    fn push(&mut self, step: ResolvedStep) -> StepId {
        self.steps.push(step);
        StepId(self.steps.len() - 1)
    }

    fn writer_node(&self, id: NodeId) -> &'a SchemaNode {
        let writer: &'a DecodePlan = self.writer;
        writer.graph().node(id)
    }

    fn reader_node(&self, id: NodeId) -> &'a SchemaNode {
        let reader: &'a DecodePlan = self.reader;
        reader.graph().node(id)
    }

    fn mismatch(&self, w: NodeId, r: NodeId) -> ResolutionError {
        ResolutionError::TypeMismatch {
            writer: self.writer.graph().describe(w),
            reader: self.reader.graph().describe(r),
        }
    }

    fn resolve(&mut self, w: NodeId, r: NodeId) -> Result<StepId, ResolutionError> {
        let writer_node = self.writer_node(w);
        let reader_node = self.reader_node(r);

        match (writer_node, reader_node) {
            (SchemaNode::Union(branches), _) => {
                let branches = branches.clone();
                let steps = branches
                    .into_iter()
                    .map(|b| match self.resolve(b, r) {
                        Ok(step) => step,
                        Err(e) => self.push(ResolvedStep::Fail(e)),
                    })
                    .collect();
                Ok(self.push(ResolvedStep::WriterUnion(steps)))
            }
            (_, SchemaNode::Union(branches)) => {
                let branches = branches.clone();
                let branch = self.select_branch(w, &branches).ok_or_else(|| {
                    ResolutionError::UnresolvableUnion {
                        writer: self.writer.graph().describe(w),
                        reader: self.reader.graph().describe(r),
                    }
                })?;
                let step = self.resolve(w, branches[branch])?;
                Ok(self.push(ResolvedStep::ReaderUnion { branch, step }))
            }
            (SchemaNode::Record(_), SchemaNode::Record(_)) => {
                if !self.names_match(w, r) {
                    return Err(self.mismatch(w, r));
                }
                self.resolve_record(w, r)
            }
            (SchemaNode::Enum(_), SchemaNode::Enum(_)) => {
                if !self.names_match(w, r) {
                    return Err(self.mismatch(w, r));
                }
                Ok(self.resolve_enum(w, r))
            }
            (SchemaNode::Fixed(wf), SchemaNode::Fixed(rf)) => {
                if wf.size != rf.size || !self.names_match(w, r) {
                    return Err(self.mismatch(w, r));
                }
                Ok(self.push(ResolvedStep::Direct(w)))
            }
            (SchemaNode::Array(wi), SchemaNode::Array(ri)) => {
                let (wi, ri) = (*wi, *ri);
                let items = self.resolve(wi, ri)?;
                Ok(self.push(ResolvedStep::Array(items)))
            }
            (SchemaNode::Map(wv), SchemaNode::Map(rv)) => {
                let (wv, rv) = (*wv, *rv);
                let values = self.resolve(wv, rv)?;
                Ok(self.push(ResolvedStep::Map(values)))
            }
            (wn, rn) if wn.is_primitive() && wn == rn => Ok(self.push(ResolvedStep::Direct(w))),
            (wn, rn) => match TypePromotion::between(wn, rn) {
                Some(promotion) => Ok(self.push(ResolvedStep::Promote {
                    writer: w,
                    promotion,
                })),
                None => Err(self.mismatch(w, r)),
            },
        }
    }

    /// First reader branch matching the writer type exactly, else the first
    /// one it promotes to.
    fn select_branch(&self, w: NodeId, branches: &[NodeId]) -> Option<usize> {
        let writer_node = self.writer_node(w);
        let exact = branches.iter().position(|&b| {
            let reader_node = self.reader_node(b);
            match (writer_node, reader_node) {
                (SchemaNode::Record(_), SchemaNode::Record(_))
                | (SchemaNode::Enum(_), SchemaNode::Enum(_))
                | (SchemaNode::Fixed(_), SchemaNode::Fixed(_)) => self.names_match(w, b),
                (SchemaNode::Array(_), SchemaNode::Array(_))
                | (SchemaNode::Map(_), SchemaNode::Map(_)) => true,
                (wn, rn) => wn.is_primitive() && wn == rn,
            }
        });
        exact.or_else(|| {
            branches
                .iter()
                .position(|&b| TypePromotion::between(writer_node, self.reader_node(b)).is_some())
        })
    }

    /// Named types match by full name, unqualified name, or reader alias.
    fn names_match(&self, w: NodeId, r: NodeId) -> bool {
        let (Some(wname), Some(rname)) = (self.writer_node(w).name(), self.reader_node(r).name())
        else {
            return false;
        };
        let writer_full = wname.fullname();
        writer_full == rname.fullname()
            || wname.name == rname.name
            || self
                .reader_node(r)
                .aliases()
                .iter()
                .any(|alias| *alias == writer_full || *alias == wname.name)
    }

    fn resolve_record(&mut self, w: NodeId, r: NodeId) -> Result<StepId, ResolutionError> {
        if let Some(&slot) = self.records.get(&(w, r)) {
            if let ResolvedStep::Fail(e) = &self.steps[slot.0] {
                return Err(e.clone());
            }
            return Ok(slot);
        }

        // reserved before the fields so recursive references find the slot
        let slot = self.push(ResolvedStep::Record {
            fields: Vec::new(),
            defaults: Vec::new(),
            reader_len: 0,
        });
        self.records.insert((w, r), slot);

        match self.record_step(w, r) {
            Ok(step) => {
                self.steps[slot.0] = step;
                Ok(slot)
            }
            Err(e) => {
                self.steps[slot.0] = ResolvedStep::Fail(e.clone());
                Err(e)
            }
        }
    }

    fn record_step(&mut self, w: NodeId, r: NodeId) -> Result<ResolvedStep, ResolutionError> {
        let (writer, reader) = (self.writer, self.reader);
        let (PlanStep::Record(writer_record), PlanStep::Record(reader_record)) =
            (writer.step(w), reader.step(r))
        else {
            return Err(self.mismatch(w, r));
        };

        let reader_len = reader_record.fields.len();
        let mut matched = vec![false; reader_len];
        let mut fields = Vec::with_capacity(writer_record.fields.len());

        for writer_field in &writer_record.fields {
            match reader_record.field_position(&writer_field.name) {
                Some(pos) if !matched[pos] => {
                    matched[pos] = true;
                    let step = self.resolve(writer_field.node, reader_record.fields[pos].node)?;
                    fields.push(WriterField::Read {
                        reader_pos: pos,
                        step,
                    });
                }
                _ => fields.push(WriterField::Skip(writer_field.node)),
            }
        }

        let SchemaNode::Record(reader_node) = self.reader_node(r) else {
            return Err(self.mismatch(w, r));
        };
        let mut defaults = Vec::new();
        for (pos, field) in reader_node.fields.iter().enumerate() {
            if matched[pos] {
                continue;
            }
            let missing = || ResolutionError::MissingDefault {
                record: reader_record.fullname.clone(),
                field: field.name.clone(),
            };
            let value = match &field.default {
                Some(json) => default_value(&reader.graph().nodes, field.schema, json, false)
                    .map_err(|_| missing())?,
                None => match reader.step(field.schema) {
                    PlanStep::Union(union) => match union.null_branch {
                        Some(null) => AvroValue::Union(null, Box::new(AvroValue::Null)),
                        None => return Err(missing()),
                    },
                    _ => return Err(missing()),
                },
            };
            defaults.push((pos, value));
        }

        Ok(ResolvedStep::Record {
            fields,
            defaults,
            reader_len,
        })
    }

    fn resolve_enum(&mut self, w: NodeId, r: NodeId) -> StepId {
        let step = match (self.writer.step(w), self.reader.step(r)) {
            (PlanStep::Enum(writer_enum), PlanStep::Enum(reader_enum)) => ResolvedStep::Enum {
                mapping: writer_enum
                    .symbols
                    .iter()
                    .map(|symbol| {
                        reader_enum
                            .symbol_index(symbol)
                            .or(reader_enum.default)
                            .ok_or_else(|| ResolutionError::UnknownEnumSymbol {
                                enum_name: reader_enum.fullname.clone(),
                                symbol: symbol.clone(),
                            })
                    })
                    .collect(),
            },
            _ => ResolvedStep::Fail(self.mismatch(w, r)),
        };
        self.push(step)
    }
}
