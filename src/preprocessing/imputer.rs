//! Missing value imputation strategies

use super::{map_columns, numeric_values, observed_values, FeatureTransform};
use crate::config::FeatureType;
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Constant used to fill missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeValue {
    Numeric(f64),
    Text(String),
}

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the mean of observed values
    Mean,
    /// Replace with the median of observed values
    Median,
    /// Replace with a fixed value
    Constant(ImputeValue),
}

impl ImputeStrategy {
    /// Interpret an `imputation_strategy` declaration such as `"median"` or `"constant:0"`.
    ///
    /// The constant parameter is read as text for textual feature types and as a
    /// number otherwise. Returns `Ok(None)` for strategy names this imputer does
    /// not know.
    pub fn from_declaration(declaration: &str, feature_type: FeatureType) -> Result<Option<Self>> {
        let (name, param) = match declaration.split_once(':') {
            Some((name, param)) => (name, Some(param)),
            None => (declaration, None),
        };

        let strategy = match name {
            "mean" => ImputeStrategy::Mean,
            "median" => ImputeStrategy::Median,
            "constant" => {
                let param = param.ok_or_else(|| {
                    PrepError::invalid_step(
                        "imputation_strategy",
                        declaration,
                        "expected 'constant:<value>'",
                    )
                })?;
                let value = if feature_type.is_textual() {
                    ImputeValue::Text(param.to_string())
                } else {
                    let number = param.trim().parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                        PrepError::invalid_step(
                            "imputation_strategy",
                            declaration,
                            format!("constant '{param}' is not a number for a {feature_type} feature"),
                        )
                    })?;
                    ImputeValue::Numeric(number)
                };
                ImputeStrategy::Constant(value)
            }
            _ => return Ok(None),
        };

        Ok(Some(strategy))
    }
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    /// `None` when the column had nothing to compute a statistic from
    fill_values: HashMap<String, Option<ImputeValue>>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    pub fn strategy(&self) -> &ImputeStrategy {
        &self.strategy
    }

    /// Fill value learned for a column
    pub fn fill_value(&self, column: &str) -> Option<&ImputeValue> {
        self.fill_values.get(column).and_then(Option::as_ref)
    }

    fn compute_fill_value(&self, series: &Series) -> Result<Option<ImputeValue>> {
        let statistic = match &self.strategy {
            ImputeStrategy::Constant(value) => return Ok(Some(value.clone())),
            ImputeStrategy::Mean => {
                let observed = observed_values(series)?;
                (!observed.is_empty())
                    .then(|| observed.iter().sum::<f64>() / observed.len() as f64)
            }
            ImputeStrategy::Median => {
                let observed = Float64Chunked::from_vec(PlSmallStr::EMPTY, observed_values(series)?);
                observed.median()
            }
        };

        if let Some(value) = statistic.filter(|v| !v.is_finite()) {
            return Err(PrepError::DataError(format!(
                "column '{}' gives a non-finite fill value {value}",
                series.name()
            )));
        }
        if statistic.is_none() {
            tracing::warn!(column = %series.name(), strategy = ?self.strategy, "No observed values, missing entries are left as is");
        }
        Ok(statistic.map(ImputeValue::Numeric))
    }

    fn fill_series(series: &Series, fill_value: &ImputeValue) -> Result<Series> {
        match fill_value {
            ImputeValue::Numeric(val) => {
                let filled: Float64Chunked = numeric_values(series)?
                    .into_iter()
                    .map(|opt| match opt {
                        Some(v) if !v.is_nan() => Some(v),
                        _ => Some(*val),
                    })
                    .collect();

                Ok(filled.with_name(series.name().clone()).into_series())
            }
            ImputeValue::Text(val) => {
                let text = series.strict_cast(&DataType::String)?;
                let filled: StringChunked = text
                    .str()?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(val.as_str())))
                    .collect();

                Ok(filled.with_name(series.name().clone()).into_series())
            }
        }
    }
}

impl FeatureTransform for Imputer {
    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let fill_value = self.compute_fill_value(series)?;
            self.fill_values.insert(series.name().to_string(), fill_value);
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }

        map_columns(df, |series| {
            let fill_value = self.fill_values.get(series.name().as_str()).ok_or_else(|| {
                PrepError::PreprocessingError(format!(
                    "column '{}' was not seen when the imputer was fitted",
                    series.name()
                ))
            })?;

            match fill_value {
                Some(value) => Self::fill_series(series, value),
                None => Ok(series.clone()),
            }
        })
    }
}
