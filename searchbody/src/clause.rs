//! Boolean clause storage
//!
//! Clauses are kept per [`BoolRole`] in insertion order. A role holding one
//! clause serializes as a bare object, two or more as an array.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Role of a clause inside a `bool` query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolRole {
    Must,
    Should,
    MustNot,
}

impl BoolRole {
    /// Emission order inside a `bool` body
    pub const ALL: [BoolRole; 3] = [BoolRole::Must, BoolRole::Should, BoolRole::MustNot];

    pub fn as_str(&self) -> &'static str {
        match self {
            BoolRole::Must => "must",
            BoolRole::Should => "should",
            BoolRole::MustNot => "must_not",
        }
    }
}

impl FromStr for BoolRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "must" => Ok(BoolRole::Must),
            "should" => Ok(BoolRole::Should),
            "must_not" => Ok(BoolRole::MustNot),
            other => Err(Error::invalid(format!("unknown bool role '{}'", other))),
        }
    }
}

impl fmt::Display for BoolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single leaf condition, e.g. `{ "match": { "school": "South Park" } }`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Clause {
    /// Clause kind (`match`, `term`, `range`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub field: String,
    pub value: Value,
}

impl Clause {
    pub fn new(kind: impl Into<String>, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ &self.kind: { &self.field: self.value } })
    }
}

/// One or many serialized clauses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClauseList {
    Single(Value),
    Multiple(Vec<Value>),
}

impl ClauseList {
    /// Collapse clauses into a list; `None` when there are none.
    pub fn from_clauses<'a, I>(clauses: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Clause>,
    {
        let mut values: Vec<Value> = clauses.into_iter().map(Clause::to_json).collect();
        match values.len() {
            0 => None,
            1 => values.pop().map(ClauseList::Single),
            _ => Some(ClauseList::Multiple(values)),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ClauseList::Single(v) => v,
            ClauseList::Multiple(v) => Value::Array(v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseStore {
    must: Vec<Clause>,
    should: Vec<Clause>,
    must_not: Vec<Clause>,
}

impl ClauseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, role: BoolRole, clause: Clause) {
        self.role_mut(role).push(clause);
    }

    pub fn role(&self, role: BoolRole) -> &[Clause] {
        match role {
            BoolRole::Must => &self.must,
            BoolRole::Should => &self.should,
            BoolRole::MustNot => &self.must_not,
        }
    }

    fn role_mut(&mut self, role: BoolRole) -> &mut Vec<Clause> {
        match role {
            BoolRole::Must => &mut self.must,
            BoolRole::Should => &mut self.should,
            BoolRole::MustNot => &mut self.must_not,
        }
    }

    pub fn len(&self) -> usize {
        self.must.len() + self.should.len() + self.must_not.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Body of a `bool` query built from the clauses accepted by `keep`.
    ///
    /// Roles left without clauses are omitted.
    pub fn bool_body<F>(&self, keep: F) -> Map<String, Value>
    where
        F: Fn(&Clause) -> bool,
    {
        let mut body = Map::new();
        for role in BoolRole::ALL {
            let list = ClauseList::from_clauses(self.role(role).iter().filter(|c| keep(c)));
            if let Some(list) = list {
                body.insert(role.as_str().to_string(), list.into_value());
            }
        }
        body
    }

    /// Serialize the stored clauses as a query.
    ///
    /// Returns `None` when empty. A lone `must` or `should` clause is returned
    /// unwrapped; anything else is wrapped in `bool`. A lone `must_not` clause
    /// keeps its `bool` wrapper since unwrapping it would invert its meaning.
    pub fn to_query(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }

        if self.len() == 1 && self.must_not.is_empty() {
            return self.must.iter().chain(&self.should).next().map(Clause::to_json);
        }

        Some(json!({ "bool": self.bool_body(|_| true) }))
    }
}
