//! Registry of named types met during conversion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{DecodePlan, NodeId, PlanStep};

/// Kind of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedKind {
    Record,
    Enum,
    Fixed,
}

/// Description of one record, enum or fixed type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedType {
    /// Fully qualified name.
    pub fullname: String,
    pub kind: NamedKind,
    /// Field names of a record, in declared order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Symbols of an enum.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    /// Size of a fixed type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

impl NamedType {
    /// Describe node `id` of `plan`, if it is a named type.
    pub fn from_plan(plan: &DecodePlan, id: NodeId) -> Option<Self> {
        match plan.step(id) {
            PlanStep::Record(record) => Some(Self {
                fullname: record.fullname.clone(),
                kind: NamedKind::Record,
                fields: record.fields.iter().map(|f| f.name.clone()).collect(),
                symbols: Vec::new(),
                size: None,
            }),
            PlanStep::Enum(e) => Some(Self {
                fullname: e.fullname.clone(),
                kind: NamedKind::Enum,
                fields: Vec::new(),
                symbols: e.symbols.clone(),
                size: None,
            }),
            PlanStep::Fixed(size) => Some(Self {
                fullname: plan.graph().branch_name(id),
                kind: NamedKind::Fixed,
                fields: Vec::new(),
                symbols: Vec::new(),
                size: Some(*size),
            }),
            _ => None,
        }
    }
}

/// Named types keyed by full name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: BTreeMap<String, NamedType>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a named type. Returns `false` if the name was already present,
    /// in which case the registry is unchanged.
    pub fn register(&mut self, named: NamedType) -> bool {
        if self.types.contains_key(&named.fullname) {
            return false;
        }
        self.types.insert(named.fullname.clone(), named);
        true
    }

    /// Look up a type by full name.
    pub fn get(&self, fullname: &str) -> Option<&NamedType> {
        self.types.get(fullname)
    }

    /// Whether a type with this full name has been recorded.
    pub fn contains(&self, fullname: &str) -> bool {
        self.types.contains_key(fullname)
    }

    /// Number of recorded types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Recorded types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &NamedType> {
        self.types.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let plan = DecodePlan::from_schema_text(
            r#"{"type": "record", "name": "ns.R", "fields": [{"name": "a", "type": "int"}]}"#,
            false,
        )
        .unwrap();
        let named = NamedType::from_plan(&plan, plan.root()).unwrap();
        assert_eq!(named.fields, vec!["a".to_string()]);

        let mut registry = TypeRegistry::new();
        assert!(registry.register(named.clone()));
        assert!(!registry.register(named));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["ns.R"]);
    }

    #[test]
    fn test_registry_serde() {
        let plan =
            DecodePlan::from_schema_text(r#"{"type": "fixed", "name": "Md5", "size": 16}"#, false)
                .unwrap();
        let mut registry = TypeRegistry::new();
        registry.register(NamedType::from_plan(&plan, plan.root()).unwrap());

        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(
            json,
            r#"{"types":{"Md5":{"fullname":"Md5","kind":"fixed","size":16}}}"#
        );
        let back: TypeRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, registry);
    }
}
