//! Stateless feature transforms
//!
//! Identity, elementwise re-expression (log, sqrt, ...), clipping to fixed
//! limits, and multiplicative weighting. None of these learn anything at fit.

use super::{map_columns, map_values, FeatureTransform};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pass-through transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity;

impl FeatureTransform for Identity {
    fn fit(&mut self, _df: &DataFrame) -> Result<&mut Self> {
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        Ok(df.clone())
    }
}

/// Elementwise re-expression applied by [`FeatureTransformer`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformType {
    /// Natural logarithm: log(x)
    Log,
    /// Log base 10
    Log10,
    /// Log with offset: log(x + 1)
    Log1p,
    /// Exponential: e^x
    Exp,
    /// Square: x^2
    Square,
    /// Square root
    Sqrt,
    /// No transformation
    #[default]
    Identity,
}

impl TransformType {
    pub fn name(&self) -> &'static str {
        match self {
            TransformType::Log => "log",
            TransformType::Log10 => "log10",
            TransformType::Log1p => "log1p",
            TransformType::Exp => "exp",
            TransformType::Square => "square",
            TransformType::Sqrt => "sqrt",
            TransformType::Identity => "identity",
        }
    }

    /// Apply to a single value. Out-of-domain inputs yield NaN.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            TransformType::Log => x.ln(),
            TransformType::Log10 => x.log10(),
            TransformType::Log1p => x.ln_1p(),
            TransformType::Exp => x.exp(),
            TransformType::Square => x * x,
            TransformType::Sqrt => x.sqrt(),
            TransformType::Identity => x,
        }
    }
}

impl FromStr for TransformType {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "log" => Ok(TransformType::Log),
            "log10" => Ok(TransformType::Log10),
            "log1p" => Ok(TransformType::Log1p),
            "exp" => Ok(TransformType::Exp),
            "square" => Ok(TransformType::Square),
            "sqrt" => Ok(TransformType::Sqrt),
            "identity" => Ok(TransformType::Identity),
            other => Err(PrepError::ConfigError(format!(
                "the value '{other}' for 'transformation' is not supported"
            ))),
        }
    }
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Applies a [`TransformType`] to every value of every column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransformer {
    transformation: TransformType,
}

impl FeatureTransformer {
    pub fn new(transformation: TransformType) -> Self {
        Self { transformation }
    }

    /// Build from a transformation name, rejecting unsupported names
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn transformation(&self) -> TransformType {
        self.transformation
    }
}

impl FeatureTransform for FeatureTransformer {
    fn fit(&mut self, _df: &DataFrame) -> Result<&mut Self> {
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if self.transformation == TransformType::Identity {
            return Ok(df.clone());
        }

        let transformation = self.transformation;
        map_columns(df, |series| map_values(series, |x| transformation.apply(x)))
    }
}

/// Clips values into `[low, high]`; a missing bound leaves that side open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureClipper {
    low: Option<f64>,
    high: Option<f64>,
}

impl FeatureClipper {
    pub fn new(low: Option<f64>, high: Option<f64>) -> Result<Self> {
        if let (Some(l), Some(h)) = (low, high) {
            if l > h {
                return Err(PrepError::ConfigError(format!(
                    "clip limits must satisfy low <= high, got [{l}, {h}]"
                )));
            }
        }
        Ok(Self { low, high })
    }

    pub fn limits(&self) -> (Option<f64>, Option<f64>) {
        (self.low, self.high)
    }

    fn clip(&self, x: f64) -> f64 {
        match (self.low, self.high) {
            (Some(l), _) if x < l => l,
            (_, Some(h)) if x > h => h,
            _ => x,
        }
    }
}

impl FeatureTransform for FeatureClipper {
    fn fit(&mut self, _df: &DataFrame) -> Result<&mut Self> {
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        map_columns(df, |series| map_values(series, |x| self.clip(x)))
    }
}

/// Multiplies every value by a fixed weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeigher {
    weight: f64,
}

impl FeatureWeigher {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl FeatureTransform for FeatureWeigher {
    fn fit(&mut self, _df: &DataFrame) -> Result<&mut Self> {
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let weight = self.weight;
        map_columns(df, |series| map_values(series, |x| x * weight))
    }
}
