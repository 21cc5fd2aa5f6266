use anyhow::{Context, Result};
use searchbody::{BuildPlan, BuilderConfig, QueryBuilder};
use serde_json::Value;
use std::path::Path;

pub fn run(plan_path: &Path, config_path: Option<&Path>, aggregation: bool) -> Result<Value> {
    let config = match config_path {
        Some(path) => BuilderConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BuilderConfig::default(),
    };

    let plan = BuildPlan::load(plan_path)
        .with_context(|| format!("failed to load plan {}", plan_path.display()))?;
    tracing::info!(
        "Applying plan {} ({} must, {} should, {} must_not, {} aggs)",
        plan_path.display(),
        plan.must.len(),
        plan.should.len(),
        plan.must_not.len(),
        plan.aggs.len()
    );

    let mut builder = QueryBuilder::with_config(config);
    plan.apply(&mut builder)
        .with_context(|| format!("invalid plan {}", plan_path.display()))?;

    Ok(if aggregation {
        builder.build_aggregation()
    } else {
        builder.build()
    })
}
