//! Filtered aggregations
//!
//! A filtered aggregation buckets on one field inside a `global` scope, so the
//! buckets ignore the top-level query, and re-applies the query's clauses
//! through a `filter` sibling. Clauses on the bucketed field itself are left
//! out of that filter, so a facet is never narrowed by its own selection.
//!
//! ```text
//! <global_name>: {
//!   global: {},
//!   aggs: {
//!     <field>: {
//!       filter: { bool: { must: ..., should: ..., must_not: ... } },
//!       aggs: { <field>: { <kind>: { field, ...params } } }
//!     }
//!   }
//! }
//! ```

use crate::aggregation::AggregationNode;
use crate::clause::ClauseStore;
use crate::config::BuilderConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::trace;

/// Request for a filtered aggregation: `{ "field": ..., ...params }`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FilteredAggregation {
    pub field: String,
    /// Extra bucket params (`size`, `order`, ...) passed through verbatim
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl FilteredAggregation {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Build the `global` node for the clauses currently in `clauses`.
    pub fn partition(&self, clauses: &ClauseStore, config: &BuilderConfig) -> AggregationNode {
        let mut bucket_params = Map::new();
        bucket_params.insert("field".to_string(), Value::String(self.field.clone()));
        bucket_params.extend(self.params.clone());
        let bucket = AggregationNode::new(&self.field, &config.filtered_kind, bucket_params);

        let bool_body = clauses.bool_body(|c| c.field != self.field);
        trace!(
            field = %self.field,
            roles = bool_body.len(),
            "partitioned clauses for filtered aggregation"
        );

        let filter = if bool_body.is_empty() {
            into_map(json!({ "match_all": {} }))
        } else {
            into_map(json!({ "bool": bool_body }))
        };

        let scoped = AggregationNode::new(&self.field, "filter", filter).with_child(bucket);
        AggregationNode::new(&config.global_name, "global", Map::new()).with_child(scoped)
    }
}

impl TryFrom<Value> for FilteredAggregation {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::invalid(format!(
                    "filtered aggregation must be an object, got {}",
                    other
                )))
            }
        };

        let field = match map.remove("field") {
            Some(Value::String(field)) if !field.is_empty() => field,
            _ => {
                return Err(Error::invalid(
                    "filtered aggregation requires a non-empty string 'field'",
                ))
            }
        };

        Ok(Self { field, params: map })
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
