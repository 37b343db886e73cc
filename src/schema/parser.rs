//! JSON schema parser for Avro schemas.
//!
//! Parses Avro schema JSON into a [`SchemaGraph`] arena.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::SchemaError;
use crate::schema::defaults::default_value;
use crate::schema::{
    EnumNode, Field, FieldOrder, FixedNode, Name, NodeId, RecordNode, SchemaGraph, SchemaNode,
};

/// Parse an Avro schema from a JSON string.
///
/// # Example
/// ```
/// use avro_deser::schema::{parse_schema, SchemaNode};
///
/// let graph = parse_schema(r#""string""#).unwrap();
/// assert_eq!(graph.node(graph.root()), &SchemaNode::String);
/// ```
pub fn parse_schema(json: &str) -> Result<SchemaGraph, SchemaError> {
    parse_schema_with_options(json, false)
}

/// Parse an Avro schema from a JSON string with validation options.
///
/// In strict mode:
/// - Union types cannot contain duplicate types
/// - Union types cannot contain nested unions
/// - Names must follow Avro naming rules (start with letter/underscore, contain only alphanumeric/underscore)
/// - A union field default must match the union's first branch
///
/// In permissive mode (default), these violations are logged as warnings.
///
/// # Example
/// ```
/// use avro_deser::schema::parse_schema_with_options;
///
/// assert!(parse_schema_with_options(r#"["int", "int"]"#, false).is_ok());
/// assert!(parse_schema_with_options(r#"["int", "int"]"#, true).is_err());
/// ```
pub fn parse_schema_with_options(json: &str, strict: bool) -> Result<SchemaGraph, SchemaError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SchemaError::ParseError(format!("Invalid JSON: {}", e)))?;

    let mut parser = SchemaParser::new().with_strict(strict);
    let root = parser.parse(&value, None)?;
    parser.finish(root, json)
}

/// Schema parser that builds the node arena.
///
/// Named types are registered under their fully qualified name before their
/// body is parsed, so a record may refer to itself.
#[derive(Debug, Default)]
pub struct SchemaParser {
    nodes: Vec<SchemaNode>,
    names: HashMap<String, NodeId>,
    strict_schema: bool,
}

impl SchemaParser {
    /// Create a new SchemaParser with default settings (permissive mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to use strict schema validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Parse a JSON value into a node, returning its id.
    pub fn parse(&mut self, value: &Value, namespace: Option<&str>) -> Result<NodeId, SchemaError> {
        match value {
            Value::String(s) => self.parse_string_schema(s, namespace),
            Value::Object(obj) => self.parse_object_schema(obj, namespace),
            Value::Array(arr) => self.parse_union_schema(arr, namespace),
            _ => Err(SchemaError::InvalidSchema(format!(
                "Expected string, object, or array, found: {}",
                value
            ))),
        }
    }

    /// Validate field defaults and seal the arena into a graph.
    pub fn finish(self, root: NodeId, source: &str) -> Result<SchemaGraph, SchemaError> {
        for node in &self.nodes {
            let SchemaNode::Record(record) = node else {
                continue;
            };
            for field in &record.fields {
                if let Some(default) = &field.default {
                    default_value(&self.nodes, field.schema, default, self.strict_schema).map_err(
                        |reason| SchemaError::InvalidDefault {
                            field: format!("{}.{}", record.name.fullname(), field.name),
                            reason,
                        },
                    )?;
                }
            }
        }

        Ok(SchemaGraph {
            nodes: self.nodes,
            root,
            names: self.names,
            source: source.to_string(),
        })
    }

    fn push(&mut self, node: SchemaNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn primitive(name: &str) -> Option<SchemaNode> {
        match name {
            "null" => Some(SchemaNode::Null),
            "boolean" => Some(SchemaNode::Boolean),
            "int" => Some(SchemaNode::Int),
            "long" => Some(SchemaNode::Long),
            "float" => Some(SchemaNode::Float),
            "double" => Some(SchemaNode::Double),
            "bytes" => Some(SchemaNode::Bytes),
            "string" => Some(SchemaNode::String),
            _ => None,
        }
    }

    /// Parse a primitive type or named type reference from a string.
    fn parse_string_schema(
        &mut self,
        s: &str,
        namespace: Option<&str>,
    ) -> Result<NodeId, SchemaError> {
        match Self::primitive(s) {
            Some(node) => Ok(self.push(node)),
            None => self
                .resolve_reference(s, namespace)
                .ok_or_else(|| SchemaError::UnknownType(s.to_string())),
        }
    }

    /// Resolve a named type reference against the enclosing namespace, then
    /// the null namespace.
    fn resolve_reference(&self, name: &str, namespace: Option<&str>) -> Option<NodeId> {
        if !name.contains('.') {
            if let Some(ns) = namespace {
                if let Some(id) = self.names.get(&format!("{}.{}", ns, name)) {
                    return Some(*id);
                }
            }
        }
        self.names.get(name).copied()
    }

    /// Parse a complex type from a JSON object.
    fn parse_object_schema(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> Result<NodeId, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::InvalidSchema("Missing 'type' field".to_string()))?;

        let type_str = match type_value {
            Value::String(s) => s.as_str(),
            // {"type": {...}} and {"type": [...]} wrap another schema
            other => return self.parse(other, namespace),
        };

        // logicalType annotations decode as their base type
        if let Some(node) = Self::primitive(type_str) {
            return Ok(self.push(node));
        }

        match type_str {
            "record" | "error" => self.parse_record_schema(obj, namespace),
            "enum" => self.parse_enum_schema(obj, namespace),
            "array" => {
                let items = obj.get("items").ok_or_else(|| {
                    SchemaError::InvalidSchema("Array missing 'items' field".to_string())
                })?;
                let items = self.parse(items, namespace)?;
                Ok(self.push(SchemaNode::Array(items)))
            }
            "map" => {
                let values = obj.get("values").ok_or_else(|| {
                    SchemaError::InvalidSchema("Map missing 'values' field".to_string())
                })?;
                let values = self.parse(values, namespace)?;
                Ok(self.push(SchemaNode::Map(values)))
            }
            "fixed" => self.parse_fixed_schema(obj, namespace),
            other => self
                .resolve_reference(other, namespace)
                .ok_or_else(|| SchemaError::UnknownType(other.to_string())),
        }
    }

    /// Parse a union schema from a JSON array.
    fn parse_union_schema(
        &mut self,
        arr: &[Value],
        namespace: Option<&str>,
    ) -> Result<NodeId, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Union schema cannot be empty".to_string(),
            ));
        }

        let branches = arr
            .iter()
            .map(|v| self.parse(v, namespace))
            .collect::<Result<Vec<_>, _>>()?;

        self.validate_union(&branches)?;

        Ok(self.push(SchemaNode::Union(branches)))
    }

    /// Read the name of a named type and reserve its arena slot.
    fn declare_name(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
        context: &str,
    ) -> Result<(Name, NodeId), SchemaError> {
        let raw = obj.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!("{} missing 'name' field", context))
        })?;
        let own_namespace = obj.get("namespace").and_then(|v| v.as_str());
        let name = Name::parse(raw, own_namespace, namespace);

        self.validate_name(&name.name, context)?;

        if Self::primitive(&name.name).is_some() && name.namespace.is_none() {
            return Err(SchemaError::InvalidSchema(format!(
                "{} name '{}' redefines a primitive type",
                context, name.name
            )));
        }

        let fullname = name.fullname();
        if self.names.contains_key(&fullname) {
            return Err(SchemaError::DuplicateName(fullname));
        }

        let id = self.push(SchemaNode::Null);
        self.names.insert(fullname, id);
        Ok((name, id))
    }

    /// Parse a record schema.
    fn parse_record_schema(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> Result<NodeId, SchemaError> {
        let (name, id) = self.declare_name(obj, namespace, "Record")?;

        let fields_value = obj
            .get("fields")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::InvalidSchema("Record missing 'fields' array".to_string())
            })?;

        let inner_namespace = name.namespace.clone();
        let mut fields = Vec::with_capacity(fields_value.len());
        let mut seen = HashSet::new();
        for field_value in fields_value {
            let field = self.parse_field_schema(field_value, inner_namespace.as_deref())?;
            if !seen.insert(field.name.clone()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Record '{}' has duplicate field '{}'",
                    name.fullname(),
                    field.name
                )));
            }
            fields.push(field);
        }

        self.nodes[id.0] = SchemaNode::Record(RecordNode {
            aliases: string_list(obj, "aliases"),
            doc: obj.get("doc").and_then(|v| v.as_str()).map(String::from),
            name,
            fields,
        });

        Ok(id)
    }

    /// Parse a field schema within a record.
    fn parse_field_schema(
        &mut self,
        value: &Value,
        namespace: Option<&str>,
    ) -> Result<Field, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::InvalidSchema("Field must be an object".to_string()))?;

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Field missing 'name'".to_string()))?
            .to_string();

        self.validate_name(&name, "Field")?;

        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::InvalidSchema("Field missing 'type'".to_string()))?;

        let schema = self.parse(type_value, namespace)?;

        let order = match obj.get("order").and_then(|v| v.as_str()) {
            Some("descending") => FieldOrder::Descending,
            Some("ignore") => FieldOrder::Ignore,
            _ => FieldOrder::Ascending,
        };

        Ok(Field {
            name,
            schema,
            default: obj.get("default").cloned(),
            aliases: string_list(obj, "aliases"),
            doc: obj.get("doc").and_then(|v| v.as_str()).map(String::from),
            order,
        })
    }

    /// Parse an enum schema.
    fn parse_enum_schema(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> Result<NodeId, SchemaError> {
        let (name, id) = self.declare_name(obj, namespace, "Enum")?;

        let raw_symbols = obj
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SchemaError::InvalidSchema("Enum missing 'symbols' array".to_string()))?;

        let mut symbols = Vec::with_capacity(raw_symbols.len());
        for raw in raw_symbols {
            let symbol = raw.as_str().ok_or_else(|| {
                SchemaError::InvalidSchema(format!(
                    "Enum '{}' has non-string symbol {}",
                    name.fullname(),
                    raw
                ))
            })?;
            self.validate_name(symbol, "Enum symbol")?;
            if symbols.iter().any(|s| s == symbol) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Enum '{}' has duplicate symbol '{}'",
                    name.fullname(),
                    symbol
                )));
            }
            symbols.push(symbol.to_string());
        }

        if symbols.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Enum must have at least one symbol".to_string(),
            ));
        }

        let default = obj
            .get("default")
            .and_then(|v| v.as_str())
            .map(String::from);
        if let Some(symbol) = &default {
            if !symbols.contains(symbol) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Enum '{}' default '{}' is not one of its symbols",
                    name.fullname(),
                    symbol
                )));
            }
        }

        self.nodes[id.0] = SchemaNode::Enum(EnumNode {
            aliases: string_list(obj, "aliases"),
            doc: obj.get("doc").and_then(|v| v.as_str()).map(String::from),
            name,
            symbols,
            default,
        });

        Ok(id)
    }

    /// Parse a fixed schema.
    fn parse_fixed_schema(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> Result<NodeId, SchemaError> {
        let (name, id) = self.declare_name(obj, namespace, "Fixed")?;

        let size = obj
            .get("size")
            .and_then(|v| v.as_u64())
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| SchemaError::InvalidSchema("Fixed missing 'size' field".to_string()))?;

        self.nodes[id.0] = SchemaNode::Fixed(FixedNode {
            aliases: string_list(obj, "aliases"),
            name,
            size,
        });

        Ok(id)
    }

    /// Report a schema rule violation: an error in strict mode, a warning otherwise.
    fn violation(&self, msg: String) -> Result<(), SchemaError> {
        if self.strict_schema {
            Err(SchemaError::InvalidSchema(msg))
        } else {
            warn!("{}", msg);
            Ok(())
        }
    }

    /// Validate that a name follows Avro naming rules.
    ///
    /// Avro names must:
    /// - Start with [A-Za-z_]
    /// - Contain only [A-Za-z0-9_]
    fn validate_name(&self, name: &str, context: &str) -> Result<(), SchemaError> {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return self.violation(format!("{} name cannot be empty", context));
        };

        if !first.is_ascii_alphabetic() && first != '_' {
            return self.violation(format!(
                "{} name '{}' must start with a letter or underscore",
                context, name
            ));
        }

        if let Some(ch) = chars.find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
            return self.violation(format!(
                "{} name '{}' contains invalid character '{}' (only alphanumeric and underscore allowed)",
                context, name, ch
            ));
        }

        Ok(())
    }

    /// Validate union schema rules.
    ///
    /// Avro unions must:
    /// - Not contain duplicate types
    /// - Not contain nested unions
    fn validate_union(&self, branches: &[NodeId]) -> Result<(), SchemaError> {
        let mut seen_types = HashSet::new();
        for (i, branch) in branches.iter().enumerate() {
            let node = &self.nodes[branch.0];
            if matches!(node, SchemaNode::Union(_)) {
                self.violation(format!(
                    "Union contains nested union at position {} (unions cannot be nested)",
                    i
                ))?;
            }

            // a named type still being parsed occupies a placeholder slot
            let declared = self
                .names
                .iter()
                .find(|(_, id)| *id == branch)
                .map(|(fullname, _)| fullname.clone());
            let type_key = match (node.name(), declared) {
                (Some(name), _) => name.fullname(),
                (None, Some(fullname)) => fullname,
                (None, None) => node.type_name().to_string(),
            };
            if !seen_types.insert(type_key.clone()) {
                self.violation(format!(
                    "Union contains duplicate type '{}' at position {}",
                    type_key, i
                ))?;
            }
        }
        Ok(())
    }
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        for (text, expected) in [
            (r#""null""#, SchemaNode::Null),
            (r#""boolean""#, SchemaNode::Boolean),
            (r#"{"type": "long"}"#, SchemaNode::Long),
            (r#"{"type": "int", "logicalType": "date"}"#, SchemaNode::Int),
        ] {
            let graph = parse_schema(text).unwrap();
            assert_eq!(graph.node(graph.root()), &expected);
        }
    }

    #[test]
    fn test_recursive_record_is_a_back_reference() {
        let graph = parse_schema(
            r#"{
                "type": "record",
                "name": "Node",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "next", "type": ["null", "Node"]}
                ]
            }"#,
        )
        .unwrap();

        let root = graph.root();
        let SchemaNode::Record(record) = graph.node(root) else {
            panic!("expected record");
        };
        let SchemaNode::Union(branches) = graph.node(record.fields[1].schema) else {
            panic!("expected union");
        };
        assert_eq!(branches[1], root);
        assert_eq!(graph.lookup("Node"), Some(root));
    }

    #[test]
    fn test_self_reference_in_union_is_not_a_duplicate() {
        let text = r#"{"type": "record", "name": "L", "fields": [
            {"name": "next", "type": ["null", "L"]}
        ]}"#;
        assert!(parse_schema_with_options(text, true).is_ok());
        assert!(parse_schema_with_options(r#"["null", "null"]"#, true).is_err());
    }

    #[test]
    fn test_namespace_inheritance() {
        let graph = parse_schema(
            r#"{
                "type": "record",
                "name": "Outer",
                "namespace": "com.example",
                "fields": [
                    {"name": "inner", "type": {"type": "fixed", "name": "Hash", "size": 4}},
                    {"name": "again", "type": "Hash"},
                    {"name": "qualified", "type": "com.example.Hash"}
                ]
            }"#,
        )
        .unwrap();

        let hash = graph.lookup("com.example.Hash").unwrap();
        let SchemaNode::Record(record) = graph.node(graph.root()) else {
            panic!("expected record");
        };
        assert_eq!(record.fields[0].schema, hash);
        assert_eq!(record.fields[1].schema, hash);
        assert_eq!(record.fields[2].schema, hash);
    }

    #[test]
    fn test_unknown_reference_fails() {
        let err = parse_schema(
            r#"{"type": "record", "name": "R", "fields": [{"name": "x", "type": "Missing"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::UnknownType("Missing".to_string()));
    }

    #[test]
    fn test_duplicate_named_type_fails() {
        let err = parse_schema(
            r#"{"type": "record", "name": "R", "fields": [
                {"name": "a", "type": {"type": "enum", "name": "E", "symbols": ["X"]}},
                {"name": "b", "type": {"type": "enum", "name": "E", "symbols": ["Y"]}}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateName(name) if name == "E"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_schema("{not json"),
            Err(SchemaError::ParseError(_))
        ));
    }

    #[test]
    fn test_illegal_default_fails() {
        let err = parse_schema(
            r#"{"type": "record", "name": "R", "fields": [{"name": "x", "type": "int", "default": "nope"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { field, .. } if field == "R.x"));
    }

    #[test]
    fn test_self_referential_record_default_fails() {
        let err = parse_schema(
            r#"{"type": "record", "name": "L", "fields": [{"name": "next", "type": "L", "default": {}}]}"#,
        )
        .unwrap_err();
        match err {
            SchemaError::InvalidDefault { field, reason } => {
                assert_eq!(field, "L.next");
                assert!(reason.contains("recursive default for record 'L'"), "{}", reason);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // mutual recursion through two records' defaults
        let err = parse_schema(
            r#"{"type": "record", "name": "A", "fields": [
                {"name": "b", "type": {"type": "record", "name": "B", "fields": [
                    {"name": "a", "type": "A", "default": {}}
                ]}, "default": {}}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { .. }));
    }

    #[test]
    fn test_enum_default_must_be_symbol() {
        let err = parse_schema(
            r#"{"type": "enum", "name": "E", "symbols": ["A", "B"], "default": "C"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema(_)));
    }

    #[test]
    fn test_strict_rejects_bad_names() {
        let text = r#"{"type": "record", "name": "bad-name", "fields": []}"#;
        assert!(parse_schema_with_options(text, false).is_ok());
        assert!(parse_schema_with_options(text, true).is_err());
    }
}
