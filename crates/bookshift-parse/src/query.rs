//! Equality queries compiled to Parse `where` clauses.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::OBJECT_ID_FIELD;

/// A conjunction of equality constraints over one class.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    class_name: String,
    constraints: BTreeMap<String, Value>,
}

impl Query {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            constraints: BTreeMap::new(),
        }
    }

    /// Add an equality constraint. A later constraint on the same field
    /// replaces the earlier one.
    pub fn equal_to(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints.insert(field.into(), value.into());
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn constraints(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build the `where` clause, restricted to ids strictly greater than
    /// `after` when given.
    pub fn where_clause(&self, after: Option<&str>) -> Value {
        let mut clause: Map<String, Value> = self
            .constraints
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(after) = after {
            clause.insert(OBJECT_ID_FIELD.to_string(), json!({ "$gt": after }));
        }
        Value::Object(clause)
    }

    /// Whether a serialized object satisfies every constraint.
    pub fn matches(&self, object: &Value) -> bool {
        self.constraints
            .iter()
            .all(|(field, expected)| object.get(field) == Some(expected))
    }
}
