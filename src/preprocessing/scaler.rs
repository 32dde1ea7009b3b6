//! Feature scaling implementations

use super::{map_columns, map_values, observed_values, FeatureTransform};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerType {
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Robust scaling using median and IQR
    Robust,
}

impl ScalerType {
    /// Look up a scaler by its configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "min_max" => Some(ScalerType::MinMax),
            "standard" => Some(ScalerType::Standard),
            "robust" => Some(ScalerType::Robust),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalerType::MinMax => "min_max",
            ScalerType::Standard => "standard",
            ScalerType::Robust => "robust",
        }
    }
}

/// Parameters for a fitted scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // min, mean, or median
    scale: f64,  // range, std, or IQR
}

impl ScalerParams {
    const IDENTITY: ScalerParams = ScalerParams {
        center: 0.0,
        scale: 1.0,
    };
}

/// Feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: HashMap::new(),
            is_fitted: false,
        }
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    /// Fitted `(center, scale)` of a column
    pub fn params(&self, column: &str) -> Option<(f64, f64)> {
        self.params.get(column).map(|p| (p.center, p.scale))
    }

    fn compute_params(&self, series: &Series) -> Result<ScalerParams> {
        let ca = Float64Chunked::from_vec(PlSmallStr::EMPTY, observed_values(series)?);
        if ca.is_empty() {
            tracing::warn!(column = %series.name(), "No observed values, scaler left as identity");
            return Ok(ScalerParams::IDENTITY);
        }

        let (center, scale) = match self.scaler_type {
            ScalerType::MinMax => {
                let min = ca.min().unwrap_or(0.0);
                let max = ca.max().unwrap_or(1.0);
                (min, max - min)
            }
            ScalerType::Standard => {
                // population std, as scikit-learn does
                (ca.mean().unwrap_or(0.0), ca.std(0).unwrap_or(1.0))
            }
            ScalerType::Robust => {
                let median = ca.median().unwrap_or(0.0);
                let q1 = ca.quantile(0.25, QuantileMethod::Linear)?.unwrap_or(0.0);
                let q3 = ca.quantile(0.75, QuantileMethod::Linear)?.unwrap_or(1.0);
                (median, q3 - q1)
            }
        };

        if !center.is_finite() || !scale.is_finite() {
            return Err(PrepError::DataError(format!(
                "column '{}' gives non-finite scaler parameters ({center}, {scale})",
                series.name()
            )));
        }

        Ok(ScalerParams {
            center,
            scale: if scale == 0.0 { 1.0 } else { scale },
        })
    }
}

impl FeatureTransform for Scaler {
    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let params = self.compute_params(series)?;
            self.params.insert(series.name().to_string(), params);
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }

        map_columns(df, |series| {
            let params = self.params.get(series.name().as_str()).ok_or_else(|| {
                PrepError::PreprocessingError(format!(
                    "column '{}' was not seen when the scaler was fitted",
                    series.name()
                ))
            })?;
            map_values(series, |v| (v - params.center) / params.scale)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::new(vec![Series::new("a".into(), &[1.0, 2.0, 3.0, 4.0, 5.0]).into()]).unwrap()
    }

    #[test]
    fn test_standard_scaler() {
        let df = sample();
        let mut scaler = Scaler::new(ScalerType::Standard);
        let result = scaler.fit_transform(&df).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        assert!(col.mean().unwrap().abs() < 1e-10); // Mean should be ~0
        assert!((col.std(0).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_minmax_scaler() {
        let df = sample();
        let mut scaler = Scaler::new(ScalerType::MinMax);
        let result = scaler.fit_transform(&df).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        assert!((col.min().unwrap() - 0.0).abs() < 1e-10);
        assert!((col.max().unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_robust_scaler() {
        let df = sample();
        let mut scaler = Scaler::new(ScalerType::Robust);
        let result = scaler.fit_transform(&df).unwrap();

        // median 3, IQR 4 - 2 = 2
        assert_eq!(scaler.params("a"), Some((3.0, 2.0)));
        let col = result.column("a").unwrap().f64().unwrap();
        assert_eq!(col.get(0), Some(-1.0));
        assert_eq!(col.get(4), Some(1.0));
    }

    #[test]
    fn test_constant_column_uses_unit_scale() {
        let df = df!("a" => &[7.0, 7.0, 7.0]).unwrap();
        let mut scaler = Scaler::new(ScalerType::MinMax);
        let result = scaler.fit_transform(&df).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        assert!(col.into_iter().all(|v| v == Some(0.0)));
    }

    #[test]
    fn test_nulls_pass_through() {
        let df = df!("a" => &[Some(0.0), None, Some(10.0)]).unwrap();
        let mut scaler = Scaler::new(ScalerType::MinMax);
        let result = scaler.fit_transform(&df).unwrap();

        let col: Vec<Option<f64>> = result.column("a").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(col, vec![Some(0.0), None, Some(1.0)]);
    }

    #[test]
    fn test_infinite_values_fail_fit() {
        let df = df!("a" => &[1.0, f64::INFINITY, 3.0]).unwrap();
        let mut scaler = Scaler::new(ScalerType::Standard);
        assert!(matches!(scaler.fit(&df), Err(PrepError::DataError(_))));
    }

    #[test]
    fn test_overflowing_range_fails_fit() {
        let df = df!("a" => &[-f64::MAX, f64::MAX]).unwrap();
        let mut scaler = Scaler::new(ScalerType::MinMax);
        assert!(matches!(scaler.fit(&df), Err(PrepError::DataError(_))));
    }

    #[test]
    fn test_scaler_names() {
        assert_eq!(ScalerType::from_name("min_max"), Some(ScalerType::MinMax));
        assert_eq!(ScalerType::from_name("robust"), Some(ScalerType::Robust));
        assert_eq!(ScalerType::from_name("max_abs"), None);
        for scaler_type in [ScalerType::MinMax, ScalerType::Standard, ScalerType::Robust] {
            assert_eq!(ScalerType::from_name(scaler_type.name()), Some(scaler_type));
        }
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let scaler = Scaler::new(ScalerType::Standard);
        assert!(matches!(scaler.transform(&sample()), Err(PrepError::ModelNotFitted)));
    }
}
