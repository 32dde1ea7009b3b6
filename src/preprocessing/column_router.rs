//! Column-wise routing of transforms
//!
//! A [`ColumnRouter`] holds an ordered list of (name, transform, column)
//! entries. Each transform sees only its own column; the outputs are stitched
//! back together in declaration order, one output column per entry.

use super::{FeatureTransform, StepTransform};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One routed entry: `transform` applied to `column`, output named `name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedTransform {
    pub name: String,
    pub transform: StepTransform,
    pub column: String,
}

impl RoutedTransform {
    pub fn new(name: impl Into<String>, transform: StepTransform, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform,
            column: column.into(),
        }
    }
}

/// Applies a heterogeneous set of single-column transforms to a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRouter {
    transforms: Vec<RoutedTransform>,
    is_fitted: bool,
}

impl ColumnRouter {
    pub fn new(transforms: Vec<RoutedTransform>) -> Self {
        Self {
            transforms,
            is_fitted: false,
        }
    }

    pub fn transforms(&self) -> &[RoutedTransform] {
        &self.transforms
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    fn slice(df: &DataFrame, column: &str) -> Result<DataFrame> {
        df.select([column])
            .map_err(|_| PrepError::FeatureNotFound(column.to_string()))
    }
}

impl FeatureTransform for ColumnRouter {
    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        for routed in &mut self.transforms {
            let slice = Self::slice(df, &routed.column)?;
            let fitted = routed.transform.fit(&slice).map(|_| ());
            if let Err(e) = fitted {
                tracing::error!(
                    step = routed.transform.name(),
                    column = %routed.column,
                    error = %e,
                    "Fitting step failed"
                );
                return Err(e);
            }
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }

        let mut columns = Vec::with_capacity(self.transforms.len());
        for routed in &self.transforms {
            let slice = Self::slice(df, &routed.column)?;
            let output = routed.transform.transform(&slice).map_err(|e| {
                tracing::error!(
                    step = routed.transform.name(),
                    column = %routed.column,
                    error = %e,
                    "Applying step failed"
                );
                e
            })?;

            let series = output
                .get_columns()
                .first()
                .map(|c| c.as_materialized_series().clone())
                .ok_or_else(|| {
                    PrepError::PreprocessingError(format!(
                        "transform '{}' produced no column for '{}'",
                        routed.name, routed.column
                    ))
                })?;

            if series.len() != df.height() {
                return Err(PrepError::PreprocessingError(format!(
                    "transform '{}' returned {} rows, expected {}",
                    routed.name,
                    series.len(),
                    df.height()
                )));
            }

            columns.push(Column::from(series.with_name(routed.name.as_str().into())));
        }

        Ok(DataFrame::new(columns)?)
    }
}
