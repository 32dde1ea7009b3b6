//! Data preprocessing module
//!
//! Turns a per-feature step configuration into a fitted, column-aligned pipeline:
//! - Elementary transforms (re-expression, clipping, imputation, scaling,
//!   discretization, weighting)
//! - Step interpretation from `key: value` declarations
//! - Action plan compilation into a stage grid
//! - Column routing and sequential pipeline assembly
//! - The [`PreProcessor`] facade with fit / transform / persistence

mod action_plan;
mod column_router;
mod discretizer;
mod imputer;
mod pipeline;
mod preprocessor;
mod scaler;
mod step;
pub mod transforms;

pub use action_plan::{ActionPlan, ActionPlanRow};
pub use column_router::{ColumnRouter, RoutedTransform};
pub use discretizer::{Binner, BinningStrategy, ColumnBins};
pub use imputer::{ImputeStrategy, ImputeValue, Imputer};
pub use pipeline::{NamedStage, Pipeline, PipelineStage};
pub use preprocessor::PreProcessor;
pub use scaler::{Scaler, ScalerType};
pub use step::{interpret_step, StepKind, StepTransform};
pub use transforms::{FeatureClipper, FeatureTransformer, FeatureWeigher, Identity, TransformType};

use crate::error::{PrepError, Result};
use polars::prelude::*;

/// Fit / transform contract shared by every transform in the crate.
///
/// `fit` learns state from a table, `transform` applies it to any table with
/// the same columns. Stateless transforms treat `fit` as a no-op.
pub trait FeatureTransform {
    /// Learn transform state from `df`
    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self>;

    /// Apply the transform to `df`
    fn transform(&self, df: &DataFrame) -> Result<DataFrame>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame>
    where
        Self: Sized,
    {
        self.fit(df)?;
        self.transform(df)
    }
}

/// Read a column as `f64`, failing on values that are not numeric.
pub(crate) fn numeric_values(series: &Series) -> Result<Float64Chunked> {
    let casted = series.strict_cast(&DataType::Float64).map_err(|e| {
        PrepError::DataError(format!("column '{}' is not numeric: {}", series.name(), e))
    })?;
    Ok(casted.f64()?.clone())
}

/// Non-missing values of a column; NaN counts as missing.
///
/// Fitted statistics must stay finite, so an infinite value is a data error.
pub(crate) fn observed_values(series: &Series) -> Result<Vec<f64>> {
    let values: Vec<f64> = numeric_values(series)?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();

    if values.iter().any(|v| v.is_infinite()) {
        return Err(PrepError::DataError(format!(
            "column '{}' contains infinite values",
            series.name()
        )));
    }
    Ok(values)
}

/// Rebuild `df` with every column passed through `f`.
pub(crate) fn map_columns<F>(df: &DataFrame, mut f: F) -> Result<DataFrame>
where
    F: FnMut(&Series) -> Result<Series>,
{
    let columns = df
        .get_columns()
        .iter()
        .map(|column| f(column.as_materialized_series()).map(Column::from))
        .collect::<Result<Vec<_>>>()?;

    Ok(DataFrame::new(columns)?)
}

/// Elementwise `f64` map that keeps nulls in place.
pub(crate) fn map_values<F>(series: &Series, f: F) -> Result<Series>
where
    F: Fn(f64) -> f64,
{
    let mapped: Float64Chunked = numeric_values(series)?
        .into_iter()
        .map(|opt| opt.map(&f))
        .collect();

    Ok(mapped.with_name(series.name().clone()).into_series())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values_casts_integers() {
        let series = Series::new("a".into(), &[1i64, 2, 3]);
        let values = numeric_values(&series).unwrap();
        assert_eq!(values.get(2), Some(3.0));
    }

    #[test]
    fn test_numeric_values_rejects_text() {
        let series = Series::new("a".into(), &["x", "y"]);
        let err = numeric_values(&series).unwrap_err();
        assert!(matches!(err, PrepError::DataError(_)));
    }

    #[test]
    fn test_observed_values_skip_missing() {
        let series = Series::new("a".into(), &[Some(1.0), None, Some(f64::NAN), Some(4.0)]);
        assert_eq!(observed_values(&series).unwrap(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_observed_values_reject_infinity() {
        let series = Series::new("a".into(), &[1.0, f64::NEG_INFINITY]);
        let err = observed_values(&series).unwrap_err();
        assert!(matches!(err, PrepError::DataError(msg) if msg.contains("infinite")));
    }

    #[test]
    fn test_map_columns_keeps_names_and_order() {
        let df = df!("b" => &[1.0, 2.0], "a" => &[3.0, 4.0]).unwrap();
        let result = map_columns(&df, |s| map_values(s, |v| v * 10.0)).unwrap();

        let names: Vec<String> = result.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(result.column("a").unwrap().f64().unwrap().get(1), Some(40.0));
    }
}
