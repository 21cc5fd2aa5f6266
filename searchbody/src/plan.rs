//! Declarative build plans
//!
//! A plan describes a builder session as data so it can live in a JSON or
//! YAML file:
//!
//! ```yaml
//! raw:
//!   explain: true
//! must:
//!   - { type: match, field: school, value: South Park Elementary }
//! should:
//!   - { type: match, field: gender, value: female }
//! aggs:
//!   - type: nested
//!     target: { path: locations }
//!     aggs:
//!       - { type: terms, target: locations.city }
//! filtered: { field: grade, size: 12 }
//! ```

use crate::aggregation::AggTarget;
use crate::builder::QueryBuilder;
use crate::clause::{BoolRole, Clause};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildPlan {
    #[serde(default)]
    pub raw: Map<String, Value>,
    #[serde(default)]
    pub must: Vec<Clause>,
    #[serde(default)]
    pub should: Vec<Clause>,
    #[serde(default)]
    pub must_not: Vec<Clause>,
    #[serde(default)]
    pub aggs: Vec<AggStep>,
    /// Filtered aggregation request, `{ field, ...params }`
    #[serde(default)]
    pub filtered: Option<Value>,
}

/// One `aggs` call
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AggStep {
    #[serde(rename = "type")]
    pub kind: String,
    /// Field name or params object
    pub target: Value,
    /// Extra params; only valid with a field name target
    #[serde(default)]
    pub params: Option<Value>,
    /// Sub-aggregations built on a child builder
    #[serde(default)]
    pub aggs: Vec<AggStep>,
}

impl AggStep {
    fn target(&self) -> Result<AggTarget> {
        match (&self.target, &self.params) {
            (Value::String(field), Some(params)) => {
                Ok(AggTarget::FieldWithParams(field.clone(), params.clone()))
            }
            (Value::String(field), None) => Ok(AggTarget::Field(field.clone())),
            (target, None) => Ok(AggTarget::Params(target.clone())),
            (target, Some(_)) => Err(Error::invalid(format!(
                "'{}' aggregation: extra params require a field name target, got {}",
                self.kind, target
            ))),
        }
    }

    fn apply(&self, builder: &mut QueryBuilder) -> Result<()> {
        let target = self.target()?;
        if self.aggs.is_empty() {
            builder.aggs(&self.kind, target)?;
        } else {
            builder.aggs_nested(&self.kind, target, |child| {
                for step in &self.aggs {
                    step.apply(child)?;
                }
                Ok(child)
            })?;
        }
        Ok(())
    }
}

impl BuildPlan {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Load a plan file; `.yaml`/`.yml` are read as YAML, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        debug!(path = %path.display(), is_yaml, "loading build plan");

        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Replay the plan onto `builder`.
    pub fn apply(&self, builder: &mut QueryBuilder) -> Result<()> {
        for (key, value) in &self.raw {
            builder.raw(key.clone(), value.clone());
        }

        let roles = [
            (BoolRole::Must, &self.must),
            (BoolRole::Should, &self.should),
            (BoolRole::MustNot, &self.must_not),
        ];
        for (role, clauses) in roles {
            for clause in clauses {
                builder.clause(
                    role.as_str(),
                    clause.kind.clone(),
                    clause.field.clone(),
                    clause.value.clone(),
                )?;
            }
        }

        for step in &self.aggs {
            step.apply(builder)?;
        }

        if let Some(filtered) = &self.filtered {
            builder.filtered_aggs(filtered.clone())?;
        }
        Ok(())
    }

    /// Build a fresh builder from this plan.
    pub fn to_builder(&self) -> Result<QueryBuilder> {
        let mut builder = QueryBuilder::new();
        self.apply(&mut builder)?;
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_plan() {
        let plan = BuildPlan::from_json_str(
            r#"{
                "must": [{ "type": "match", "field": "school", "value": "SPE" }],
                "aggs": [{ "type": "avg", "target": "count" }]
            }"#,
        )
        .unwrap();

        assert_eq!(plan.must, vec![Clause::new("match", "school", "SPE")]);
        assert_eq!(plan.aggs.len(), 1);
        assert!(plan.filtered.is_none());
    }

    #[test]
    fn test_unknown_plan_key_rejected() {
        let err = BuildPlan::from_json_str(r#"{ "must_sometimes": [] }"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_params_with_object_target_rejected() {
        let plan = BuildPlan {
            aggs: vec![AggStep {
                kind: "terms".to_string(),
                target: json!({ "field": "games" }),
                params: Some(json!({ "size": 3 })),
                aggs: vec![],
            }],
            ..BuildPlan::default()
        };
        let err = plan.to_builder().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_yaml_plan_with_nested_aggs() {
        let plan = BuildPlan::from_yaml_str(
            r#"
aggs:
  - type: nested
    target: { path: locations }
    aggs:
      - type: terms
        target: locations.city
        params: { size: 5 }
"#,
        )
        .unwrap();

        let doc = plan.to_builder().unwrap().build_aggregation();
        assert_eq!(
            doc["aggs"],
            json!({
                "locations": {
                    "nested": { "path": "locations" },
                    "aggs": {
                        "locations.city": { "terms": { "field": "locations.city", "size": 5 } }
                    }
                }
            })
        );
    }

    #[test]
    fn test_filtered_filter_uses_plan_clauses() {
        let plan = BuildPlan {
            must: vec![
                Clause::new("match", "school", "SPE"),
                Clause::new("match", "grade", "4th"),
            ],
            filtered: Some(json!({ "field": "grade" })),
            ..BuildPlan::default()
        };

        let doc = plan.to_builder().unwrap().build();
        assert_eq!(
            doc["aggs"]["all"]["aggs"]["grade"]["filter"],
            json!({ "bool": { "must": { "match": { "school": "SPE" } } } })
        );
    }
}
