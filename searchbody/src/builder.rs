//! Fluent request-body builder
//!
//! Every call mutates the builder in place and hands back `&mut Self`, so
//! calls chain. Fallible calls return `Result<&mut Self>` and leave the
//! builder untouched on error.

use crate::aggregation::{AggTarget, AggregationNode, AggregationTree};
use crate::clause::{BoolRole, Clause, ClauseStore};
use crate::config::BuilderConfig;
use crate::error::{Error, Result};
use crate::filtered::FilteredAggregation;
use serde_json::{json, Map, Value};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    config: BuilderConfig,
    clauses: ClauseStore,
    aggregations: AggregationTree,
    raw: Map<String, Value>,
    filtered: Option<FilteredAggregation>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn clauses(&self) -> &ClauseStore {
        &self.clauses
    }

    /// Aggregations as they would be emitted now, with any filtered
    /// aggregation partitioned against the current clauses.
    pub fn aggregations(&self) -> AggregationTree {
        let mut tree = self.aggregations.clone();
        if let Some(request) = &self.filtered {
            tree.insert(request.partition(&self.clauses, &self.config));
        }
        tree
    }

    // ===================================================================
    // Clauses
    // ===================================================================

    /// Add a clause under a role given by name (`must`, `should`, `must_not`).
    pub fn clause(
        &mut self,
        role: &str,
        kind: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        let role: BoolRole = role.parse()?;
        Ok(self.push_clause(role, Clause::new(kind, field, value)))
    }

    pub fn must(
        &mut self,
        kind: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push_clause(BoolRole::Must, Clause::new(kind, field, value))
    }

    pub fn should(
        &mut self,
        kind: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push_clause(BoolRole::Should, Clause::new(kind, field, value))
    }

    pub fn must_not(
        &mut self,
        kind: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push_clause(BoolRole::MustNot, Clause::new(kind, field, value))
    }

    fn push_clause(&mut self, role: BoolRole, clause: Clause) -> &mut Self {
        trace!(%role, kind = %clause.kind, field = %clause.field, "adding clause");
        self.clauses.add(role, clause);
        self
    }

    // ===================================================================
    // Aggregations
    // ===================================================================

    /// Add an aggregation of `kind`.
    ///
    /// ```
    /// use searchbody::QueryBuilder;
    /// use serde_json::json;
    ///
    /// # fn main() -> searchbody::Result<()> {
    /// let mut builder = QueryBuilder::new();
    /// builder
    ///     .aggs("avg", "count")?
    ///     .aggs("terms", ("games", json!({ "exclude": "Call.*" })))?
    ///     .aggs("nested", json!({ "path": "locations" }))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn aggs(&mut self, kind: &str, target: impl Into<AggTarget>) -> Result<&mut Self> {
        let node = Self::resolve_node(kind, target.into())?;
        self.insert_aggregation(node);
        Ok(self)
    }

    /// Add an aggregation whose sub-aggregations are built by `build` on a
    /// fresh child builder.
    ///
    /// ```
    /// use searchbody::QueryBuilder;
    /// use serde_json::json;
    ///
    /// # fn main() -> searchbody::Result<()> {
    /// let mut builder = QueryBuilder::new();
    /// builder.aggs_nested("nested", json!({ "path": "locations" }), |b| {
    ///     b.aggs("terms", "locations.city")
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn aggs_nested<F>(
        &mut self,
        kind: &str,
        target: impl Into<AggTarget>,
        build: F,
    ) -> Result<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> Result<&mut QueryBuilder>,
    {
        let node = Self::resolve_node(kind, target.into())?;

        let mut child = QueryBuilder::with_config(self.config.clone());
        build(&mut child)?;

        self.insert_aggregation(node.with_children(child.aggregations()));
        Ok(self)
    }

    /// Add a filtered aggregation, e.g. `{ "field": "grade", "size": 12 }`.
    ///
    /// The filter is derived from the clauses present when the body is
    /// built, so clauses added after this call are included. Only one
    /// filtered aggregation is kept; a second call replaces the first.
    pub fn filtered_aggs(&mut self, request: Value) -> Result<&mut Self> {
        let request = FilteredAggregation::try_from(request)?;

        if let Some(previous) = self.filtered.take() {
            warn!(
                global = %self.config.global_name,
                previous = %previous.field,
                field = %request.field,
                "replacing previously requested filtered aggregation"
            );
        }

        // Holds the slot under `global_name`; the filter is rebuilt on emit.
        let placeholder = request.partition(&self.clauses, &self.config);
        self.insert_aggregation(placeholder);
        self.filtered = Some(request);
        Ok(self)
    }

    fn resolve_node(kind: &str, target: AggTarget) -> Result<AggregationNode> {
        if kind.is_empty() {
            return Err(Error::invalid("aggregation kind must not be empty"));
        }
        let (name, params) = target.resolve()?;
        Ok(AggregationNode::new(name, kind, params))
    }

    fn insert_aggregation(&mut self, node: AggregationNode) {
        let name = node.name.clone();
        if name == self.config.global_name {
            if let Some(dropped) = self.filtered.take() {
                debug!(
                    aggregation = %name,
                    field = %dropped.field,
                    "plain aggregation replaced filtered aggregation"
                );
            }
        }
        if let Some(previous) = self.aggregations.insert(node) {
            debug!(aggregation = %name, previous = %previous.kind, "overwrote aggregation");
        } else {
            trace!(aggregation = %name, "added aggregation");
        }
    }

    // ===================================================================
    // Document
    // ===================================================================

    /// Set an arbitrary top-level key. Raw keys override `from` and `size`.
    pub fn raw(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.raw.insert(key.into(), value.into());
        self
    }

    /// The `query` part of the document; `match_all` when no clause was added.
    pub fn build_query(&self) -> Value {
        self.clauses
            .to_query()
            .unwrap_or_else(|| json!({ "match_all": {} }))
    }

    /// Build the request body. `aggs` is included only when a filtered
    /// aggregation was requested.
    pub fn build(&self) -> Value {
        self.emit(self.filtered.is_some())
    }

    /// Build the request body including `aggs`.
    pub fn build_aggregation(&self) -> Value {
        self.emit(true)
    }

    fn emit(&self, with_aggs: bool) -> Value {
        let mut doc = Map::new();
        doc.insert("from".to_string(), json!(self.config.from));
        doc.insert("size".to_string(), json!(self.config.size));
        for (key, value) in &self.raw {
            doc.insert(key.clone(), value.clone());
        }
        doc.insert("query".to_string(), self.build_query());
        let aggregations = self.aggregations();
        if with_aggs {
            doc.insert("aggs".to_string(), aggregations.to_json());
        }

        debug!(
            clauses = self.clauses.len(),
            aggregations = aggregations.len(),
            with_aggs,
            "built request body"
        );
        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_build() {
        assert_eq!(
            QueryBuilder::new().build(),
            json!({ "from": 0, "size": 15, "query": { "match_all": {} } })
        );
    }

    #[test]
    fn test_clause_with_unknown_role_does_not_mutate() {
        let mut builder = QueryBuilder::new();
        let err = builder.clause("sometimes", "match", "name", "Kenny").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(builder.clauses().is_empty());
    }

    #[test]
    fn test_clause_by_role_name() {
        let mut builder = QueryBuilder::new();
        builder
            .clause("must_not", "term", "enemy", "Cartman")
            .unwrap()
            .clause("should", "term", "friend", "Kyle")
            .unwrap();
        assert_eq!(builder.clauses().role(BoolRole::MustNot).len(), 1);
        assert_eq!(builder.clauses().role(BoolRole::Should).len(), 1);
    }

    #[test]
    fn test_failed_aggs_does_not_mutate() {
        let mut builder = QueryBuilder::new();
        builder.aggs("avg", "count").unwrap();
        assert!(builder.aggs("terms", json!({})).is_err());
        assert!(builder.aggs("", "price").is_err());
        assert_eq!(builder.aggregations().len(), 1);
    }

    #[test]
    fn test_failed_nested_callback_does_not_mutate() {
        let mut builder = QueryBuilder::new();
        let result = builder.aggs_nested("nested", json!({ "path": "locations" }), |b| {
            b.aggs("terms", json!(42))
        });
        assert!(result.is_err());
        assert!(builder.aggregations().is_empty());
    }

    #[test]
    fn test_nested_builder_inherits_config() {
        let config = BuilderConfig {
            filtered_kind: "significant_terms".to_string(),
            ..BuilderConfig::default()
        };
        let mut builder = QueryBuilder::with_config(config);
        builder
            .aggs_nested("nested", json!({ "path": "students" }), |b| {
                b.filtered_aggs(json!({ "field": "students.grade" }))
            })
            .unwrap();

        let aggs = builder.build_aggregation()["aggs"].clone();
        assert_eq!(
            aggs["students"]["aggs"]["all"]["aggs"]["students.grade"]["aggs"]["students.grade"],
            json!({ "significant_terms": { "field": "students.grade" } })
        );
    }

    #[test]
    fn test_plain_aggregation_under_global_name_drops_filtered() {
        let mut builder = QueryBuilder::new();
        builder
            .filtered_aggs(json!({ "field": "grade" }))
            .unwrap()
            .aggs("terms", "all")
            .unwrap();

        assert!(builder.build().get("aggs").is_none());
        assert_eq!(
            builder.build_aggregation()["aggs"],
            json!({ "all": { "terms": { "field": "all" } } })
        );
    }

    #[test]
    fn test_aggregations_reflect_current_clauses() {
        let mut builder = QueryBuilder::new();
        builder.filtered_aggs(json!({ "field": "grade" })).unwrap();
        builder.must("match", "school", "South Park Elementary");

        let tree = builder.aggregations();
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.get("all").unwrap().to_json()["aggs"]["grade"]["filter"],
            json!({ "bool": { "must": { "match": { "school": "South Park Elementary" } } } })
        );
    }

    #[test]
    fn test_raw_overrides_pagination() {
        let mut builder = QueryBuilder::new();
        builder.raw("size", 100).raw("from", 20);
        assert_eq!(
            builder.build(),
            json!({ "from": 20, "size": 100, "query": { "match_all": {} } })
        );
    }

    #[test]
    fn test_raw_cannot_replace_query() {
        let mut builder = QueryBuilder::new();
        builder.raw("query", json!({ "term": { "x": 1 } }));
        assert_eq!(builder.build()["query"], json!({ "match_all": {} }));
    }

    #[test]
    fn test_build_aggregation_without_aggs_emits_empty_object() {
        assert_eq!(QueryBuilder::new().build_aggregation()["aggs"], json!({}));
    }

    #[test]
    fn test_build_omits_plain_aggs() {
        let mut builder = QueryBuilder::new();
        builder.aggs("avg", "count").unwrap();
        assert!(builder.build().get("aggs").is_none());
    }

    #[test]
    fn test_config_pagination_defaults() {
        let config = BuilderConfig {
            from: 5,
            size: 30,
            ..BuilderConfig::default()
        };
        let doc = QueryBuilder::with_config(config).build();
        assert_eq!(doc["from"], json!(5));
        assert_eq!(doc["size"], json!(30));
    }
}
