//! Fluent builder for Elasticsearch-style request bodies
//!
//! Accumulates `bool` clauses and aggregation requests, then materializes them
//! into a JSON document with `from`, `size`, `query` and optionally `aggs`.
//! Nothing here performs I/O against a search service; the output is a plain
//! [`serde_json::Value`].
//!
//! # Example
//!
//! ```
//! use searchbody::QueryBuilder;
//! use serde_json::json;
//!
//! # fn main() -> searchbody::Result<()> {
//! let mut builder = QueryBuilder::new();
//! builder
//!     .must("match", "school", "South Park Elementary")
//!     .should("match", "gender", "female")
//!     .filtered_aggs(json!({ "field": "grade", "size": 12 }))?;
//!
//! let body = builder.build();
//! assert_eq!(body["size"], json!(15));
//! assert!(body["aggs"]["all"]["global"].is_object());
//! # Ok(())
//! # }
//! ```
//!
//! # Aggregations
//!
//! Aggregation kinds are free-form strings. The target of an `aggs` call can
//! be:
//! - a field name: `aggs("avg", "count")`
//! - a field name with extra params: `aggs("terms", ("games", json!({ "size": 5 })))`
//! - a params object: `aggs("nested", json!({ "path": "locations" }))`
//!
//! Sub-aggregations are built with [`QueryBuilder::aggs_nested`].

pub mod aggregation;
pub mod builder;
pub mod clause;
pub mod config;
pub mod error;
pub mod filtered;
pub mod plan;

pub use aggregation::{AggTarget, AggregationNode, AggregationTree};
pub use builder::QueryBuilder;
pub use clause::{BoolRole, Clause, ClauseList, ClauseStore};
pub use config::BuilderConfig;
pub use error::{Error, Result};
pub use filtered::FilteredAggregation;
pub use plan::{AggStep, BuildPlan};
