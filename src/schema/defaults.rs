//! Conversion of JSON field defaults into values.
//!
//! The same walk validates defaults at parse time and materialises them when
//! a reader field is missing from the writer.

use serde_json::Value;
use tracing::warn;

use crate::schema::{NodeId, SchemaNode};
use crate::value::AvroValue;

/// Convert a JSON default to a value of node `id`.
///
/// Bytes and fixed defaults are strings whose code points are byte values
/// (ISO-8859-1). A union default must match the first branch; outside strict
/// mode any matching branch is accepted with a warning.
///
/// A record default may omit fields that have their own default. Reaching
/// the same field's default again while expanding it is an error.
pub(crate) fn default_value(
    nodes: &[SchemaNode],
    id: NodeId,
    json: &Value,
    strict: bool,
) -> Result<AvroValue, String> {
    DefaultWalk {
        nodes,
        strict,
        fallbacks: Vec::new(),
    }
    .value(id, json)
}

struct DefaultWalk<'a> {
    nodes: &'a [SchemaNode],
    strict: bool,
    /// Record fields whose own default is being expanded, outermost first.
    fallbacks: Vec<(NodeId, usize)>,
}

impl DefaultWalk<'_> {
    fn value(&mut self, id: NodeId, json: &Value) -> Result<AvroValue, String> {
        let nodes = self.nodes;
        match (&nodes[id.0], json) {
            (SchemaNode::Null, Value::Null) => Ok(AvroValue::Null),
            (SchemaNode::Boolean, Value::Bool(b)) => Ok(AvroValue::Boolean(*b)),
            (SchemaNode::Int, Value::Number(n)) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(AvroValue::Int)
                .ok_or_else(|| format!("{} is not a 32-bit integer", n)),
            (SchemaNode::Long, Value::Number(n)) => n
                .as_i64()
                .map(AvroValue::Long)
                .ok_or_else(|| format!("{} is not a 64-bit integer", n)),
            (SchemaNode::Float, Value::Number(n)) => n
                .as_f64()
                .map(|v| AvroValue::Float(v as f32))
                .ok_or_else(|| format!("{} is not a number", n)),
            (SchemaNode::Double, Value::Number(n)) => n
                .as_f64()
                .map(AvroValue::Double)
                .ok_or_else(|| format!("{} is not a number", n)),
            (SchemaNode::String, Value::String(s)) => Ok(AvroValue::String(s.clone())),
            (SchemaNode::Bytes, Value::String(s)) => latin1_bytes(s).map(AvroValue::Bytes),
            (SchemaNode::Fixed(fixed), Value::String(s)) => {
                let bytes = latin1_bytes(s)?;
                if bytes.len() != fixed.size {
                    return Err(format!(
                        "fixed default has {} bytes, expected {}",
                        bytes.len(),
                        fixed.size
                    ));
                }
                Ok(AvroValue::Fixed(bytes))
            }
            (SchemaNode::Enum(e), Value::String(s)) => e
                .symbol_index(s)
                .map(AvroValue::Enum)
                .ok_or_else(|| format!("'{}' is not a symbol of enum '{}'", s, e.name.fullname())),
            (SchemaNode::Array(items), Value::Array(arr)) => arr
                .iter()
                .map(|item| self.value(*items, item))
                .collect::<Result<Vec<_>, _>>()
                .map(AvroValue::Array),
            (SchemaNode::Map(values), Value::Object(obj)) => obj
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.value(*values, v)?)))
                .collect::<Result<Vec<_>, String>>()
                .map(AvroValue::Map),
            (SchemaNode::Record(record), Value::Object(obj)) => {
                let mut values = Vec::with_capacity(record.fields.len());
                for (index, field) in record.fields.iter().enumerate() {
                    let value = match (obj.get(&field.name), &field.default) {
                        (Some(v), _) => self.value(field.schema, v)?,
                        (None, Some(v)) => {
                            if self.fallbacks.contains(&(id, index)) {
                                return Err(format!(
                                    "recursive default for record '{}' through field '{}'",
                                    record.name.fullname(),
                                    field.name
                                ));
                            }
                            self.fallbacks.push((id, index));
                            let value = self.value(field.schema, v);
                            self.fallbacks.pop();
                            value?
                        }
                        (None, None) => {
                            return Err(format!("record default is missing field '{}'", field.name))
                        }
                    };
                    values.push(value);
                }
                Ok(AvroValue::Record(values))
            }
            (SchemaNode::Union(branches), json) => {
                let first = branches
                    .first()
                    .ok_or_else(|| "union has no branches".to_string())?;
                match self.value(*first, json) {
                    Ok(v) => Ok(AvroValue::Union(0, Box::new(v))),
                    Err(first_err) if self.strict => Err(first_err),
                    Err(first_err) => {
                        for (index, branch) in branches.iter().enumerate().skip(1) {
                            if let Ok(v) = self.value(*branch, json) {
                                warn!(
                                    "Union default {} matches branch {} instead of the first branch",
                                    json, index
                                );
                                return Ok(AvroValue::Union(index, Box::new(v)));
                            }
                        }
                        Err(first_err)
                    }
                }
            }
            (node, json) => Err(format!(
                "{} does not match type '{}'",
                json,
                node.type_name()
            )),
        }
    }
}

fn latin1_bytes(s: &str) -> Result<Vec<u8>, String> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| format!("character {:?} is not a byte", c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;
    use serde_json::json;

    fn default_for(schema: &str, json: Value, strict: bool) -> Result<AvroValue, String> {
        let graph = parse_schema(schema).unwrap();
        default_value(&graph.nodes, graph.root(), &json, strict)
    }

    #[test]
    fn test_primitive_defaults() {
        assert_eq!(default_for(r#""int""#, json!(7), true), Ok(AvroValue::Int(7)));
        assert_eq!(
            default_for(r#""double""#, json!(1.5), true),
            Ok(AvroValue::Double(1.5))
        );
        assert_eq!(
            default_for(r#""bytes""#, json!("\u{00ff}a"), true),
            Ok(AvroValue::Bytes(vec![0xFF, b'a']))
        );
        assert!(default_for(r#""int""#, json!(1u64 << 40), true).is_err());
        assert!(default_for(r#""bytes""#, json!("\u{0100}"), true).is_err());
    }

    #[test]
    fn test_union_default_branch_selection() {
        assert_eq!(
            default_for(r#"["null", "string"]"#, json!(null), true),
            Ok(AvroValue::Union(0, Box::new(AvroValue::Null)))
        );
        assert!(default_for(r#"["string", "null"]"#, json!(null), true).is_err());
        assert_eq!(
            default_for(r#"["string", "null"]"#, json!(null), false),
            Ok(AvroValue::Union(1, Box::new(AvroValue::Null)))
        );
    }

    #[test]
    fn test_record_default_uses_nested_defaults() {
        let schema = r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "long"},
            {"name": "b", "type": "string", "default": "x"}
        ]}"#;
        assert_eq!(
            default_for(schema, json!({"a": 3}), true),
            Ok(AvroValue::Record(vec![
                AvroValue::Long(3),
                AvroValue::String("x".to_string())
            ]))
        );
        assert!(default_for(schema, json!({"b": "y"}), true).is_err());
    }

    #[test]
    fn test_field_default_reused_below_explicit_record() {
        let schema = r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "long", "default": 1},
            {"name": "next", "type": ["null", "R"], "default": null}
        ]}"#;
        // `a` falls back to its default at both levels
        assert_eq!(
            default_for(schema, json!({"next": {"next": null}}), false),
            Ok(AvroValue::Record(vec![
                AvroValue::Long(1),
                AvroValue::Union(
                    1,
                    Box::new(AvroValue::Record(vec![
                        AvroValue::Long(1),
                        AvroValue::Union(0, Box::new(AvroValue::Null)),
                    ]))
                ),
            ]))
        );
    }

    #[test]
    fn test_self_referential_default_is_rejected() {
        // an empty default for `L` needs `next`, whose default is again an empty `L`
        let err = parse_schema(
            r#"{"type": "record", "name": "L", "fields": [
                {"name": "v", "type": "int", "default": 0},
                {"name": "next", "type": "L", "default": {}}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("recursive default"), "{}", err);
    }
}
