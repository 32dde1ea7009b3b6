//! Action plan compilation
//!
//! Features declare different numbers of steps. The plan lines them up on a
//! shared stage grid: stage `k` holds the `k`-th step of every feature, and a
//! feature with fewer than `k + 1` steps gets an identity step there. Rows are
//! ordered by `(transform_order, feature_order)`.

use crate::config::{validate_features, FeatureConfig, FeatureType};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Key of the step synthesized for missing `(stage, feature)` pairs
const PAD_KEY: &str = "transformation";
/// Value of the step synthesized for missing `(stage, feature)` pairs
const PAD_VALUE: &str = "identity";

/// One `(feature, stage)` cell of the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlanRow {
    pub feature_order: usize,
    pub feature_name: String,
    pub active: bool,
    pub feature_type: FeatureType,
    pub transform_order: usize,
    pub key: String,
    pub value: Value,
}

impl ActionPlanRow {
    /// Whether this row is the padding step
    pub fn is_identity(&self) -> bool {
        self.key == PAD_KEY && self.value.as_str() == Some(PAD_VALUE)
    }
}

/// Stage-aligned execution plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    rows: Vec<ActionPlanRow>,
    n_stages: usize,
}

impl ActionPlan {
    /// Compile a plan from the ordered feature list.
    ///
    /// Fails with a configuration error when a feature name repeats.
    pub fn compile(features: &[FeatureConfig]) -> Result<Self> {
        validate_features(features)?;

        // ragged: one list of steps per feature, then pad to the longest
        let n_stages = features.iter().map(|f| f.steps.len()).max().unwrap_or(0);

        let mut rows = Vec::with_capacity(n_stages * features.len());
        for transform_order in 0..n_stages {
            for (feature_order, feature) in features.iter().enumerate() {
                let (key, value) = match feature.steps.get(transform_order) {
                    Some(step) => (step.key.clone(), step.value.clone()),
                    None => (PAD_KEY.to_string(), Value::from(PAD_VALUE)),
                };

                rows.push(ActionPlanRow {
                    feature_order,
                    feature_name: feature.name.clone(),
                    active: feature.active,
                    feature_type: feature.feature_type,
                    transform_order,
                    key,
                    value,
                });
            }
        }

        tracing::debug!(features = features.len(), stages = n_stages, rows = rows.len(), "Compiled action plan");
        Ok(Self { rows, n_stages })
    }

    pub fn rows(&self) -> &[ActionPlanRow] {
        &self.rows
    }

    pub fn n_stages(&self) -> usize {
        self.n_stages
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows grouped by stage, in ascending stage order
    pub fn stages(&self) -> impl Iterator<Item = &[ActionPlanRow]> {
        self.rows
            .chunk_by(|a, b| a.transform_order == b.transform_order)
    }
}

impl fmt::Display for ActionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "(empty plan)");
        }

        let name_width = self
            .rows
            .iter()
            .map(|r| r.feature_name.len())
            .max()
            .unwrap_or(0)
            .max("feature".len());

        writeln!(
            f,
            "{:>5}  {:<name_width$}  {:<8}  {:<6}  {:<20}  value",
            "stage", "feature", "type", "active", "key"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:>5}  {:<name_width$}  {:<8}  {:<6}  {:<20}  {}",
                row.transform_order,
                row.feature_name,
                row.feature_type.label(),
                row.active,
                row.key,
                row.value
            )?;
        }
        Ok(())
    }
}
