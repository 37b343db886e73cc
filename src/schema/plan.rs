//! Decode plans derived from schema graphs.
//!
//! A [`DecodePlan`] is built once per schema and reused for every decode
//! against it. It mirrors the graph node for node, adding the lookup tables
//! the decoders and the resolution engine need (field and symbol indexes,
//! the null branch of each union). The plan owns an `Arc` to its graph, so the
//! two always live together and both can be shared across sessions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::schema::{parse_schema_with_options, NodeId, SchemaGraph, SchemaNode};

/// A record field as seen by the decoder.
#[derive(Debug, Clone)]
pub struct FieldStep {
    /// Field name.
    pub name: String,
    /// Node of the field's value.
    pub node: NodeId,
}

/// Record decoding step.
#[derive(Debug, Clone)]
pub struct RecordStep {
    /// Fully qualified record name.
    pub fullname: String,
    /// Fields in declared (wire) order.
    pub fields: Vec<FieldStep>,
    /// Field position by name and by alias.
    lookup: HashMap<String, usize>,
}

impl RecordStep {
    /// Position of the field called `name`, matching aliases too.
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }
}

/// Enum decoding step.
#[derive(Debug, Clone)]
pub struct EnumStep {
    /// Fully qualified enum name.
    pub fullname: String,
    /// Symbols in declared order.
    pub symbols: Vec<String>,
    /// Index of the default symbol, if declared.
    pub default: Option<usize>,
    lookup: HashMap<String, usize>,
}

impl EnumStep {
    /// Index of `symbol`, if the enum declares it.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.lookup.get(symbol).copied()
    }
}

/// Union decoding step.
#[derive(Debug, Clone)]
pub struct UnionStep {
    /// Branch nodes in declared order.
    pub branches: Vec<NodeId>,
    /// Position of the `null` branch, if any.
    pub null_branch: Option<usize>,
}

/// How to decode one node.
#[derive(Debug, Clone)]
pub enum PlanStep {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record(RecordStep),
    Enum(EnumStep),
    Array(NodeId),
    Map(NodeId),
    Union(UnionStep),
    Fixed(usize),
}

/// Reusable, immutable decode plan for one schema.
#[derive(Debug, Clone)]
pub struct DecodePlan {
    graph: Arc<SchemaGraph>,
    steps: Vec<PlanStep>,
    fingerprint: u64,
}

impl DecodePlan {
    /// Derive a plan from a parsed graph.
    pub fn new(graph: Arc<SchemaGraph>) -> Self {
        let steps = (0..graph.len())
            .map(|i| derive_step(&graph, NodeId(i)))
            .collect();
        let fingerprint = graph.fingerprint();
        Self {
            graph,
            steps,
            fingerprint,
        }
    }

    /// Parse schema text and derive its plan.
    pub fn from_schema_text(text: &str, strict: bool) -> Result<Self, SchemaError> {
        let graph = parse_schema_with_options(text, strict)?;
        Ok(Self::new(Arc::new(graph)))
    }

    /// The graph this plan walks.
    pub fn graph(&self) -> &Arc<SchemaGraph> {
        &self.graph
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.graph.root()
    }

    /// Decoding step for a node.
    pub fn step(&self, id: NodeId) -> &PlanStep {
        &self.steps[id.0]
    }

    /// Parsing Canonical Form fingerprint of the schema.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Schema text the plan was built from.
    pub fn source(&self) -> &str {
        self.graph.source()
    }
}

fn derive_step(graph: &SchemaGraph, id: NodeId) -> PlanStep {
    match graph.node(id) {
        SchemaNode::Null => PlanStep::Null,
        SchemaNode::Boolean => PlanStep::Boolean,
        SchemaNode::Int => PlanStep::Int,
        SchemaNode::Long => PlanStep::Long,
        SchemaNode::Float => PlanStep::Float,
        SchemaNode::Double => PlanStep::Double,
        SchemaNode::Bytes => PlanStep::Bytes,
        SchemaNode::String => PlanStep::String,
        SchemaNode::Record(record) => {
            let fields: Vec<FieldStep> = record
                .fields
                .iter()
                .map(|f| FieldStep {
                    name: f.name.clone(),
                    node: f.schema,
                })
                .collect();

            let mut lookup = HashMap::with_capacity(fields.len());
            for (pos, field) in record.fields.iter().enumerate() {
                lookup.insert(field.name.clone(), pos);
            }
            // aliases never shadow real field names
            for (pos, field) in record.fields.iter().enumerate() {
                for alias in &field.aliases {
                    lookup.entry(alias.clone()).or_insert(pos);
                }
            }

            PlanStep::Record(RecordStep {
                fullname: record.name.fullname(),
                fields,
                lookup,
            })
        }
        SchemaNode::Enum(e) => {
            let lookup: HashMap<String, usize> = e
                .symbols
                .iter()
                .enumerate()
                .map(|(i, s)| (s.clone(), i))
                .collect();
            let default = e.default.as_deref().and_then(|s| lookup.get(s).copied());
            PlanStep::Enum(EnumStep {
                fullname: e.name.fullname(),
                symbols: e.symbols.clone(),
                default,
                lookup,
            })
        }
        SchemaNode::Array(items) => PlanStep::Array(*items),
        SchemaNode::Map(values) => PlanStep::Map(*values),
        SchemaNode::Union(branches) => PlanStep::Union(UnionStep {
            null_branch: branches
                .iter()
                .position(|b| matches!(graph.node(*b), SchemaNode::Null)),
            branches: branches.clone(),
        }),
        SchemaNode::Fixed(f) => PlanStep::Fixed(f.size),
    }
}
