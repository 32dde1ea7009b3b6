//! Configuration-driven preprocessor

use super::{map_values, ActionPlan, FeatureTransform, Pipeline};
use crate::config::{validate_features, FeatureConfig, FeatureType};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Builds, fits and applies the preprocessing pipeline described by a
/// per-feature configuration.
///
/// ```no_run
/// use polars::prelude::DataFrame;
/// use serde_json::json;
/// use tabprep::prelude::*;
///
/// let features = vec![
///     FeatureConfig::new("age", FeatureType::Int64)
///         .with_step("imputation_strategy", "median")
///         .with_step("limits", json!([0, 120])),
///     FeatureConfig::new("income", FeatureType::Float64).with_step("scaler", "standard"),
/// ];
///
/// let mut preprocessor = PreProcessor::new(features);
/// # let train = DataFrame::default();
/// let transformed = preprocessor.fit_transform(&train, None)?;
/// # Ok::<(), tabprep::error::PrepError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreProcessor {
    features_config: Vec<FeatureConfig>,
    /// Active feature names, in configuration order
    feature_names: Vec<String>,
    feature_types: HashMap<String, FeatureType>,
    action_plan: Option<ActionPlan>,
    pipeline: Option<Pipeline>,
    /// Seconds spent in the last fit call
    fit_time: Option<f64>,
}

impl PreProcessor {
    pub fn new(features_config: Vec<FeatureConfig>) -> Self {
        Self {
            features_config,
            feature_names: Vec::new(),
            feature_types: HashMap::new(),
            action_plan: None,
            pipeline: None,
            fit_time: None,
        }
    }

    /// Fit the pipeline on `df`.
    ///
    /// `target` is accepted for interface parity with model training code and
    /// is not used by any step.
    pub fn fit(&mut self, df: &DataFrame, target: Option<&Series>) -> Result<&mut Self> {
        let start = Instant::now();

        validate_features(&self.features_config)?;
        self.feature_names = self
            .features_config
            .iter()
            .filter(|f| f.active)
            .map(|f| f.name.clone())
            .collect();
        self.feature_types = self
            .features_config
            .iter()
            .map(|f| (f.name.clone(), f.feature_type))
            .collect();

        if let Some(target) = target {
            tracing::debug!(target = %target.name(), "Target column is ignored by preprocessing");
        }

        let plan = ActionPlan::compile(&self.features_config)?;
        let mut pipeline = Pipeline::assemble(&plan)?;

        let active = self.select_active(df)?;
        pipeline.fit(&active)?;

        tracing::info!(
            features = self.features_config.len(),
            active = self.feature_names.len(),
            stages = plan.n_stages(),
            rows = df.height(),
            "Fitted preprocessor"
        );

        self.action_plan = Some(plan);
        self.pipeline = Some(pipeline);
        self.fit_time = Some(start.elapsed().as_secs_f64());
        Ok(self)
    }

    /// Apply the fitted pipeline and cast every column to its declared type.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let pipeline = self.pipeline.as_ref().ok_or(PrepError::ModelNotFitted)?;

        let active = self.select_active(df)?;
        let output = pipeline.transform(&active)?;
        self.cast_output(&output)
    }

    /// Fit on `df`, then transform it
    pub fn fit_transform(&mut self, df: &DataFrame, target: Option<&Series>) -> Result<DataFrame> {
        self.fit(df, target)?;
        self.transform(df)
    }

    pub fn is_fitted(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn features_config(&self) -> &[FeatureConfig] {
        &self.features_config
    }

    /// Names of the active features, in output order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Plan compiled by the last fit
    pub fn action_plan(&self) -> Option<&ActionPlan> {
        self.action_plan.as_ref()
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    /// Save the preprocessor, fitted state included, as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a preprocessor written by [`PreProcessor::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let preprocessor: Self = serde_json::from_str(&json)?;
        Ok(preprocessor)
    }

    fn select_active(&self, df: &DataFrame) -> Result<DataFrame> {
        if let Some(missing) = self
            .feature_names
            .iter()
            .find(|name| df.column(name.as_str()).is_err())
        {
            return Err(PrepError::FeatureNotFound(missing.clone()));
        }

        Ok(df.select(self.feature_names.iter().map(String::as_str))?)
    }

    fn cast_output(&self, df: &DataFrame) -> Result<DataFrame> {
        let columns = df
            .get_columns()
            .iter()
            .map(|column| {
                let series = column.as_materialized_series();
                let casted = match self.feature_types.get(series.name().as_str()) {
                    Some(&feature_type) => Self::cast_series(series, feature_type),
                    None => Ok(series.clone()),
                };
                casted.map(Column::from).inspect_err(|e| {
                    tracing::error!(column = %series.name(), error = %e, "Failed to cast output column");
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DataFrame::new(columns)?)
    }

    fn cast_series(series: &Series, feature_type: FeatureType) -> Result<Series> {
        let target = feature_type.dtype();
        if series.dtype() == &target {
            return Ok(series.clone());
        }

        let source = if feature_type.is_integer() && series.dtype().is_float() {
            map_values(series, f64::round_ties_even)?
        } else {
            series.clone()
        };

        source.strict_cast(&target).map_err(|e| {
            PrepError::DataError(format!(
                "column '{}' cannot be cast to {}: {}",
                series.name(),
                feature_type,
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clip_scenario() {
        let mut preprocessor = PreProcessor::new(vec![
            FeatureConfig::new("a", FeatureType::Float64).with_step("limits", json!([0, 10])),
        ]);
        let df = df!("a" => &[-5.0, 15.0, 5.0]).unwrap();

        let result = preprocessor.fit_transform(&df, None).unwrap();
        let a: Vec<Option<f64>> = result.column("a").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(0.0), Some(10.0), Some(5.0)]);
    }

    #[test]
    fn test_integer_output_is_rounded() {
        let mut preprocessor = PreProcessor::new(vec![
            FeatureConfig::new("n", FeatureType::Int64).with_step("weight", 0.5),
        ]);
        let df = df!("n" => &[1i64, 3, 5, 6]).unwrap();

        let result = preprocessor.fit_transform(&df, None).unwrap();
        let n = result.column("n").unwrap();
        assert_eq!(n.dtype(), &DataType::Int64);
        // 0.5, 1.5, 2.5, 3.0 with ties to even
        let n: Vec<Option<i64>> = n.i64().unwrap().into_iter().collect();
        assert_eq!(n, vec![Some(0), Some(2), Some(2), Some(3)]);
    }

    #[test]
    fn test_inactive_feature_excluded() {
        let mut preprocessor = PreProcessor::new(vec![
            FeatureConfig::new("a", FeatureType::Float64).with_step("weight", 2.0),
            FeatureConfig::new("b", FeatureType::Float64).inactive(),
        ]);
        let df = df!("a" => &[1.0, 2.0], "b" => &[3.0, 4.0]).unwrap();

        let result = preprocessor.fit_transform(&df, None).unwrap();
        assert_eq!(result.width(), 1);
        assert!(result.column("b").is_err());
        assert_eq!(preprocessor.feature_names(), &["a".to_string()]);
    }

    #[test]
    fn test_missing_feature_column() {
        let mut preprocessor = PreProcessor::new(vec![FeatureConfig::new("z", FeatureType::Float64)]);
        let df = df!("a" => &[1.0]).unwrap();
        assert!(matches!(preprocessor.fit(&df, None), Err(PrepError::FeatureNotFound(name)) if name == "z"));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let preprocessor = PreProcessor::new(vec![FeatureConfig::new("a", FeatureType::Float64)]);
        let df = df!("a" => &[1.0]).unwrap();
        assert!(matches!(preprocessor.transform(&df), Err(PrepError::ModelNotFitted)));
    }

    #[test]
    fn test_failed_cast_is_an_error() {
        let mut preprocessor = PreProcessor::new(vec![FeatureConfig::new("s", FeatureType::Int64)]);
        let df = df!("s" => &["x", "y"]).unwrap();
        let err = preprocessor.fit_transform(&df, None).unwrap_err();
        assert!(matches!(err, PrepError::DataError(_)));
    }

    #[test]
    fn test_target_is_ignored() {
        let mut preprocessor = PreProcessor::new(vec![
            FeatureConfig::new("a", FeatureType::Float64).with_step("scaler", "min_max"),
        ]);
        let df = df!("a" => &[0.0, 5.0, 10.0]).unwrap();
        let target = Series::new("y".into(), &[1, 0, 1]);

        let with_target = preprocessor.fit_transform(&df, Some(&target)).unwrap();
        let without = PreProcessor::new(preprocessor.features_config().to_vec())
            .fit_transform(&df, None)
            .unwrap();
        assert!(with_target.equals(&without));
        assert!(preprocessor.fit_time().is_some());
    }
}
