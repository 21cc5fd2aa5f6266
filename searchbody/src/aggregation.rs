//! Aggregation tree
//!
//! Aggregation kinds are plain strings; nothing here knows what `terms` or
//! `geo_distance` mean. Nodes serialize as
//! `{ <name>: { <kind>: <params>, "aggs": { ... } } }`.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Keys a params object may carry the aggregation's name under, by priority.
const NAME_KEYS: [&str; 2] = ["field", "path"];

/// Shape of the target argument of an `aggs` call.
#[derive(Debug, Clone, PartialEq)]
pub enum AggTarget {
    /// Bare field name, params become `{ "field": <name> }`
    Field(String),
    /// Field name plus extra params merged next to `field`
    FieldWithParams(String, Value),
    /// Params object used verbatim; the name comes from `field`, `path` or
    /// its only string-valued key
    Params(Value),
}

impl From<&str> for AggTarget {
    fn from(field: &str) -> Self {
        AggTarget::Field(field.to_string())
    }
}

impl From<String> for AggTarget {
    fn from(field: String) -> Self {
        AggTarget::Field(field)
    }
}

impl From<&String> for AggTarget {
    fn from(field: &String) -> Self {
        AggTarget::Field(field.clone())
    }
}

impl From<Value> for AggTarget {
    fn from(value: Value) -> Self {
        match value {
            Value::String(field) => AggTarget::Field(field),
            other => AggTarget::Params(other),
        }
    }
}

impl<S: Into<String>> From<(S, Value)> for AggTarget {
    fn from((field, extra): (S, Value)) -> Self {
        AggTarget::FieldWithParams(field.into(), extra)
    }
}

impl AggTarget {
    /// Resolve into the node name and its params.
    pub fn resolve(self) -> Result<(String, Map<String, Value>)> {
        match self {
            AggTarget::Field(field) => {
                let field = non_empty(field)?;
                let mut params = Map::new();
                params.insert("field".to_string(), Value::String(field.clone()));
                Ok((field, params))
            }
            AggTarget::FieldWithParams(field, extra) => {
                let field = non_empty(field)?;
                let mut params = Map::new();
                params.insert("field".to_string(), Value::String(field.clone()));
                match extra {
                    Value::Object(extra) => params.extend(extra),
                    Value::Null => {}
                    other => {
                        return Err(Error::invalid(format!(
                            "extra params for '{}' must be an object, got {}",
                            field, other
                        )))
                    }
                }
                Ok((field, params))
            }
            AggTarget::Params(Value::Object(params)) => {
                let name = derive_name(&params).ok_or_else(|| {
                    Error::invalid(format!(
                        "cannot derive an aggregation name from params {}",
                        Value::Object(params.clone())
                    ))
                })?;
                Ok((name, params))
            }
            AggTarget::Params(other) => Err(Error::invalid(format!(
                "aggregation params must be an object, got {}",
                other
            ))),
        }
    }
}

fn non_empty(field: String) -> Result<String> {
    if field.is_empty() {
        return Err(Error::invalid("aggregation field must not be empty"));
    }
    Ok(field)
}

fn derive_name(params: &Map<String, Value>) -> Option<String> {
    let named = NAME_KEYS
        .iter()
        .find_map(|key| params.get(*key).and_then(Value::as_str));
    if let Some(name) = named {
        return Some(name.to_string()).filter(|n| !n.is_empty());
    }

    let mut strings = params.values().filter_map(Value::as_str);
    match (strings.next(), strings.next()) {
        (Some(only), None) if !only.is_empty() => Some(only.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationNode {
    pub name: String,
    pub kind: String,
    pub params: Map<String, Value>,
    pub children: AggregationTree,
}

impl AggregationNode {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            params,
            children: AggregationTree::new(),
        }
    }

    pub fn with_children(mut self, children: AggregationTree) -> Self {
        self.children = children;
        self
    }

    pub fn with_child(mut self, child: AggregationNode) -> Self {
        self.children.insert(child);
        self
    }

    /// Body of this node, without its name.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert(self.kind.clone(), Value::Object(self.params.clone()));
        if !self.children.is_empty() {
            body.insert("aggs".to_string(), self.children.to_json());
        }
        Value::Object(body)
    }
}

/// Aggregations keyed by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationTree {
    nodes: Vec<AggregationNode>,
}

impl AggregationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. A node with the same name is replaced in place and
    /// returned.
    pub fn insert(&mut self, node: AggregationNode) -> Option<AggregationNode> {
        match self.nodes.iter_mut().find(|n| n.name == node.name) {
            Some(slot) => Some(std::mem::replace(slot, node)),
            None => {
                self.nodes.push(node);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&AggregationNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregationNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .nodes
            .iter()
            .map(|node| (node.name.clone(), node.to_json()))
            .collect();
        Value::Object(map)
    }
}
