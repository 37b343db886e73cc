//! Avro schema graph types.
//!
//! A parsed schema is an arena of [`SchemaNode`]s addressed by [`NodeId`].
//! Named types (record, enum, fixed) occupy exactly one slot; every reference
//! to a named type, including a record's reference to itself, is the `NodeId`
//! of that slot. This keeps recursive schemas finite.

use std::collections::HashMap;

use serde_json::Value;

/// Index of a node within a [`SchemaGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Namespace-qualified name of a record, enum or fixed type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    /// Unqualified name.
    pub name: String,
    /// Optional namespace.
    pub namespace: Option<String>,
}

impl Name {
    /// Create an unqualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Split a possibly dotted name, falling back to `enclosing` for the namespace.
    pub fn parse(raw: &str, namespace: Option<&str>, enclosing: Option<&str>) -> Self {
        match raw.rsplit_once('.') {
            Some((ns, name)) => Self {
                name: name.to_string(),
                namespace: Some(ns.to_string()),
            },
            None => Self {
                name: raw.to_string(),
                namespace: namespace
                    .or(enclosing)
                    .filter(|ns| !ns.is_empty())
                    .map(String::from),
            },
        }
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

/// Field ordering for record comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrder {
    #[default]
    Ascending,
    Descending,
    Ignore,
}

/// A field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// The name of the field.
    pub name: String,
    /// The node describing the field's value.
    pub schema: NodeId,
    /// Optional default value, as written in the schema JSON.
    pub default: Option<Value>,
    /// Aliases for this field.
    pub aliases: Vec<String>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Field ordering.
    pub order: FieldOrder,
}

/// Record type with named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordNode {
    pub name: Name,
    pub aliases: Vec<String>,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
}

/// Enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumNode {
    pub name: Name,
    pub aliases: Vec<String>,
    pub doc: Option<String>,
    pub symbols: Vec<String>,
    /// Default symbol used when resolving unknown writer symbols.
    pub default: Option<String>,
}

impl EnumNode {
    /// Get the index of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Fixed-size byte array type.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedNode {
    pub name: Name,
    pub aliases: Vec<String>,
    pub size: usize,
}

/// One node of a schema graph.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    // Primitive types
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,

    // Complex types
    /// Record type with named fields.
    Record(RecordNode),
    /// Enumeration type.
    Enum(EnumNode),
    /// Array of items.
    Array(NodeId),
    /// Map with string keys.
    Map(NodeId),
    /// Union of branches.
    Union(Vec<NodeId>),
    /// Fixed-size byte array.
    Fixed(FixedNode),
}

impl SchemaNode {
    /// Check if this node is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            SchemaNode::Null
                | SchemaNode::Boolean
                | SchemaNode::Int
                | SchemaNode::Long
                | SchemaNode::Float
                | SchemaNode::Double
                | SchemaNode::Bytes
                | SchemaNode::String
        )
    }

    /// The qualified name of a named node.
    pub fn name(&self) -> Option<&Name> {
        match self {
            SchemaNode::Record(r) => Some(&r.name),
            SchemaNode::Enum(e) => Some(&e.name),
            SchemaNode::Fixed(f) => Some(&f.name),
            _ => None,
        }
    }

    /// Aliases of a named node (empty otherwise).
    pub fn aliases(&self) -> &[String] {
        match self {
            SchemaNode::Record(r) => &r.aliases,
            SchemaNode::Enum(e) => &e.aliases,
            SchemaNode::Fixed(f) => &f.aliases,
            _ => &[],
        }
    }

    /// Avro type keyword for this node.
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaNode::Null => "null",
            SchemaNode::Boolean => "boolean",
            SchemaNode::Int => "int",
            SchemaNode::Long => "long",
            SchemaNode::Float => "float",
            SchemaNode::Double => "double",
            SchemaNode::Bytes => "bytes",
            SchemaNode::String => "string",
            SchemaNode::Record(_) => "record",
            SchemaNode::Enum(_) => "enum",
            SchemaNode::Array(_) => "array",
            SchemaNode::Map(_) => "map",
            SchemaNode::Union(_) => "union",
            SchemaNode::Fixed(_) => "fixed",
        }
    }
}

/// An immutable parsed Avro schema.
///
/// Holds the node arena, the index of named types, and the schema text it was
/// parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaGraph {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) root: NodeId,
    pub(crate) names: HashMap<String, NodeId>,
    pub(crate) source: String,
}

impl SchemaGraph {
    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node. Ids are only ever produced by this graph.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (never true for a parsed graph).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a named type by its fully qualified name.
    pub fn lookup(&self, fullname: &str) -> Option<NodeId> {
        self.names.get(fullname).copied()
    }

    /// All named types, keyed by fully qualified name.
    pub fn named_types(&self) -> &HashMap<String, NodeId> {
        &self.names
    }

    /// The schema text this graph was parsed from, verbatim.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Human-readable description of a node, used in error messages.
    pub fn describe(&self, id: NodeId) -> String {
        let node = self.node(id);
        match node {
            SchemaNode::Record(_) | SchemaNode::Enum(_) | SchemaNode::Fixed(_) => node
                .name()
                .map(Name::fullname)
                .unwrap_or_else(|| node.type_name().to_string()),
            SchemaNode::Array(items) => format!("array<{}>", self.describe(*items)),
            SchemaNode::Map(values) => format!("map<{}>", self.describe(*values)),
            SchemaNode::Union(branches) => {
                let parts: Vec<String> = branches.iter().map(|b| self.describe(*b)).collect();
                format!("[{}]", parts.join(", "))
            }
            _ => node.type_name().to_string(),
        }
    }

    /// Name shown for the branch of a union: full name, or the type keyword.
    pub fn branch_name(&self, id: NodeId) -> String {
        let node = self.node(id);
        node.name()
            .map(Name::fullname)
            .unwrap_or_else(|| node.type_name().to_string())
    }
}
