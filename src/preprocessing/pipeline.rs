//! Sequential stage pipeline assembled from an action plan

use super::{
    interpret_step, ActionPlan, ColumnRouter, FeatureTransform, Identity, RoutedTransform,
};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// A stage of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Per-column transforms for one transform order
    Columns(ColumnRouter),
    /// Used when the plan has no stages at all
    Passthrough(Identity),
}

impl FeatureTransform for PipelineStage {
    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        match self {
            PipelineStage::Columns(router) => {
                router.fit(df)?;
            }
            PipelineStage::Passthrough(identity) => {
                identity.fit(df)?;
            }
        }
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        match self {
            PipelineStage::Columns(router) => router.transform(df),
            PipelineStage::Passthrough(identity) => identity.transform(df),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedStage {
    pub name: String,
    pub stage: PipelineStage,
}

/// Ordered stages applied strictly left to right
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    stages: Vec<NamedStage>,
    is_fitted: bool,
}

impl Pipeline {
    /// Build one [`ColumnRouter`] stage per transform order of the plan.
    ///
    /// Only active rows are routed. A plan without stages yields a single
    /// passthrough stage.
    pub fn assemble(plan: &ActionPlan) -> Result<Self> {
        let mut stages = Vec::with_capacity(plan.n_stages().max(1));

        for rows in plan.stages() {
            let Some(first) = rows.first() else {
                continue;
            };

            let mut transforms = Vec::with_capacity(rows.len());
            for row in rows.iter().filter(|r| r.active) {
                let transform = interpret_step(&row.key, &row.value, row.feature_type)?;
                transforms.push(RoutedTransform::new(
                    row.feature_name.as_str(),
                    transform,
                    row.feature_name.as_str(),
                ));
            }

            stages.push(NamedStage {
                name: format!("step_{}", first.transform_order),
                stage: PipelineStage::Columns(ColumnRouter::new(transforms)),
            });
        }

        if stages.is_empty() {
            stages.push(NamedStage {
                name: "step_0".to_string(),
                stage: PipelineStage::Passthrough(Identity),
            });
        }

        Ok(Self {
            stages,
            is_fitted: false,
        })
    }

    pub fn stages(&self) -> &[NamedStage] {
        &self.stages
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

impl FeatureTransform for Pipeline {
    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let mut current = df.clone();
        let last = self.stages.len().saturating_sub(1);

        for (i, named) in self.stages.iter_mut().enumerate() {
            named.stage.fit(&current)?;
            // the last stage's output is not needed during fit
            if i < last {
                current = named.stage.transform(&current)?;
            }
            tracing::debug!(stage = %named.name, columns = current.width(), "Fitted stage");
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }

        self.stages.iter().try_fold(df.clone(), |current, named| {
            let output = named.stage.transform(&current)?;
            tracing::debug!(stage = %named.name, columns = output.width(), rows = output.height(), "Applied stage");
            Ok(output)
        })
    }
}
