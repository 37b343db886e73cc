//! Parsing Canonical Form and 64-bit Rabin fingerprints.
//!
//! Two schema texts that differ only in whitespace, attribute order, docs,
//! aliases, defaults or namespace spelling share a canonical form, and so a
//! fingerprint.

use std::collections::HashSet;

use crate::schema::{NodeId, SchemaGraph, SchemaNode};

/// Empty-input value of the CRC-64-AVRO fingerprint.
const EMPTY: u64 = 0xc15d_213a_a4d7_a795;

fn rabin_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut fp = i as u64;
        for _ in 0..8 {
            fp = (fp >> 1) ^ (EMPTY & 0u64.wrapping_sub(fp & 1));
        }
        *slot = fp;
    }
    table
}

/// CRC-64-AVRO fingerprint of arbitrary bytes.
pub fn rabin_fingerprint(data: &[u8]) -> u64 {
    let table = rabin_table();
    data.iter().fold(EMPTY, |fp, &byte| {
        (fp >> 8) ^ table[((fp ^ u64::from(byte)) & 0xff) as usize]
    })
}

impl SchemaGraph {
    /// Render the schema in Parsing Canonical Form.
    pub fn canonical_form(&self) -> String {
        let mut out = String::new();
        let mut seen = HashSet::new();
        self.write_canonical(self.root, &mut out, &mut seen);
        out
    }

    /// Fingerprint of the Parsing Canonical Form.
    pub fn fingerprint(&self) -> u64 {
        rabin_fingerprint(self.canonical_form().as_bytes())
    }

    fn write_canonical(&self, id: NodeId, out: &mut String, seen: &mut HashSet<NodeId>) {
        let node = self.node(id);
        if let Some(name) = node.name() {
            if !seen.insert(id) {
                push_json_str(out, &name.fullname());
                return;
            }
        }

        match node {
            SchemaNode::Record(record) => {
                out.push_str("{\"name\":");
                push_json_str(out, &record.name.fullname());
                out.push_str(",\"type\":\"record\",\"fields\":[");
                for (i, field) in record.fields.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str("{\"name\":");
                    push_json_str(out, &field.name);
                    out.push_str(",\"type\":");
                    self.write_canonical(field.schema, out, seen);
                    out.push('}');
                }
                out.push_str("]}");
            }
            SchemaNode::Enum(e) => {
                out.push_str("{\"name\":");
                push_json_str(out, &e.name.fullname());
                out.push_str(",\"type\":\"enum\",\"symbols\":[");
                for (i, symbol) in e.symbols.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    push_json_str(out, symbol);
                }
                out.push_str("]}");
            }
            SchemaNode::Fixed(f) => {
                out.push_str("{\"name\":");
                push_json_str(out, &f.name.fullname());
                out.push_str(&format!(",\"type\":\"fixed\",\"size\":{}}}", f.size));
            }
            SchemaNode::Array(items) => {
                out.push_str("{\"type\":\"array\",\"items\":");
                self.write_canonical(*items, out, seen);
                out.push('}');
            }
            SchemaNode::Map(values) => {
                out.push_str("{\"type\":\"map\",\"values\":");
                self.write_canonical(*values, out, seen);
                out.push('}');
            }
            SchemaNode::Union(branches) => {
                out.push('[');
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_canonical(*branch, out, seen);
                }
                out.push(']');
            }
            primitive => push_json_str(out, primitive.type_name()),
        }
    }
}

fn push_json_str(out: &mut String, s: &str) {
    // serializing a &str cannot fail
    out.push_str(&serde_json::Value::from(s).to_string());
}
