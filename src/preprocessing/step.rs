//! Step interpretation: `key: value` declarations to concrete transforms

use super::{
    Binner, BinningStrategy, FeatureClipper, FeatureTransform, FeatureTransformer, FeatureWeigher,
    Identity, ImputeStrategy, ImputeValue, Imputer, Scaler, ScalerType, TransformType,
};
use crate::config::FeatureType;
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of step named by a declaration key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepKind {
    Transformation,
    Limits,
    ImputationStrategy,
    Discretizer,
    Scaler,
    Weight,
    /// Any other key; interpreted as identity
    Unknown(String),
}

impl StepKind {
    pub fn from_key(key: &str) -> Self {
        match key {
            "transformation" => StepKind::Transformation,
            "limits" => StepKind::Limits,
            "imputation_strategy" => StepKind::ImputationStrategy,
            "discretizer" => StepKind::Discretizer,
            "scaler" => StepKind::Scaler,
            "weight" => StepKind::Weight,
            other => StepKind::Unknown(other.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            StepKind::Transformation => "transformation",
            StepKind::Limits => "limits",
            StepKind::ImputationStrategy => "imputation_strategy",
            StepKind::Discretizer => "discretizer",
            StepKind::Scaler => "scaler",
            StepKind::Weight => "weight",
            StepKind::Unknown(key) => key,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A concrete column transform produced from one step declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepTransform {
    Identity(Identity),
    Transformation(FeatureTransformer),
    Clip(FeatureClipper),
    Impute(Imputer),
    Scale(Scaler),
    Discretize(Binner),
    Weight(FeatureWeigher),
}

impl StepTransform {
    pub fn is_identity(&self) -> bool {
        matches!(self, StepTransform::Identity(_))
    }

    /// Short name used in logs and plan listings
    pub fn name(&self) -> &'static str {
        match self {
            StepTransform::Identity(_) => "identity",
            StepTransform::Transformation(_) => "transformation",
            StepTransform::Clip(_) => "clip",
            StepTransform::Impute(_) => "impute",
            StepTransform::Scale(_) => "scale",
            StepTransform::Discretize(_) => "discretize",
            StepTransform::Weight(_) => "weight",
        }
    }
}

/// Renders the step with its parameters, e.g. `scale(standard)` or `weight(0.5)`
impl fmt::Display for StepTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<f64>| b.map_or_else(|| "-".to_string(), |v| v.to_string());
        match self {
            StepTransform::Identity(_) => f.write_str(self.name()),
            StepTransform::Transformation(t) => write!(f, "{}({})", self.name(), t.transformation()),
            StepTransform::Clip(c) => {
                let (low, high) = c.limits();
                write!(f, "{}([{}, {}])", self.name(), bound(low), bound(high))
            }
            StepTransform::Impute(i) => match i.strategy() {
                ImputeStrategy::Mean => write!(f, "{}(mean)", self.name()),
                ImputeStrategy::Median => write!(f, "{}(median)", self.name()),
                ImputeStrategy::Constant(ImputeValue::Numeric(v)) => {
                    write!(f, "{}(constant:{v})", self.name())
                }
                ImputeStrategy::Constant(ImputeValue::Text(v)) => {
                    write!(f, "{}(constant:{v})", self.name())
                }
            },
            StepTransform::Scale(s) => write!(f, "{}({})", self.name(), s.scaler_type().name()),
            StepTransform::Discretize(b) => {
                write!(f, "{}({}:{})", self.name(), b.strategy().name(), b.n_bins())
            }
            StepTransform::Weight(w) => write!(f, "{}({})", self.name(), w.weight()),
        }
    }
}

impl FeatureTransform for StepTransform {
    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        match self {
            StepTransform::Identity(t) => {
                t.fit(df)?;
            }
            StepTransform::Transformation(t) => {
                t.fit(df)?;
            }
            StepTransform::Clip(t) => {
                t.fit(df)?;
            }
            StepTransform::Impute(t) => {
                t.fit(df)?;
            }
            StepTransform::Scale(t) => {
                t.fit(df)?;
            }
            StepTransform::Discretize(t) => {
                t.fit(df)?;
            }
            StepTransform::Weight(t) => {
                t.fit(df)?;
            }
        }
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        match self {
            StepTransform::Identity(t) => t.transform(df),
            StepTransform::Transformation(t) => t.transform(df),
            StepTransform::Clip(t) => t.transform(df),
            StepTransform::Impute(t) => t.transform(df),
            StepTransform::Scale(t) => t.transform(df),
            StepTransform::Discretize(t) => t.transform(df),
            StepTransform::Weight(t) => t.transform(df),
        }
    }
}

/// Build the transform for a `key: value` step of a feature with the given type.
///
/// Malformed values for known keys are configuration errors. Unknown keys are
/// logged and become identity; so do unknown imputation and scaler strategies.
pub fn interpret_step(key: &str, value: &Value, feature_type: FeatureType) -> Result<StepTransform> {
    let kind = StepKind::from_key(key);

    let transform = match &kind {
        StepKind::Transformation => {
            let transformer = FeatureTransformer::from_name(expect_str(&kind, value)?)?;
            if transformer.transformation() == TransformType::Identity {
                StepTransform::Identity(Identity)
            } else {
                StepTransform::Transformation(transformer)
            }
        }
        StepKind::Limits => {
            let (low, high) = parse_limits(value)?;
            StepTransform::Clip(FeatureClipper::new(low, high)?)
        }
        StepKind::ImputationStrategy => {
            let declaration = expect_str(&kind, value)?;
            match ImputeStrategy::from_declaration(declaration, feature_type)? {
                Some(strategy) => StepTransform::Impute(Imputer::new(strategy)),
                None => {
                    tracing::warn!(strategy = declaration, "Unknown imputation strategy, using identity");
                    StepTransform::Identity(Identity)
                }
            }
        }
        StepKind::Discretizer => {
            let declaration = expect_str(&kind, value)?;
            let (strategy, n_bins) = declaration.split_once(':').ok_or_else(|| {
                PrepError::invalid_step(key, declaration, "expected '<strategy>:<n_bins>'")
            })?;
            let n_bins = n_bins.trim().parse::<usize>().map_err(|_| {
                PrepError::invalid_step(key, declaration, format!("'{n_bins}' is not a bin count"))
            })?;
            let strategy: BinningStrategy = strategy.parse()?;
            StepTransform::Discretize(Binner::new(strategy, n_bins)?)
        }
        StepKind::Scaler => match value {
            Value::Null => StepTransform::Identity(Identity),
            Value::String(name) => match ScalerType::from_name(name) {
                Some(scaler_type) => StepTransform::Scale(Scaler::new(scaler_type)),
                None => {
                    tracing::warn!(strategy = %name, "Unknown scaler strategy, using identity");
                    StepTransform::Identity(Identity)
                }
            },
            other => {
                tracing::warn!(strategy = %other, "Unknown scaler strategy, using identity");
                StepTransform::Identity(Identity)
            }
        },
        StepKind::Weight => StepTransform::Weight(FeatureWeigher::new(parse_number(&kind, value)?)),
        StepKind::Unknown(unknown) => {
            tracing::error!(key = %unknown, "Step kind not found, using identity");
            StepTransform::Identity(Identity)
        }
    };

    Ok(transform)
}

fn expect_str<'a>(kind: &StepKind, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| PrepError::invalid_step(kind.key(), value, "expected a string"))
}

fn parse_number(kind: &StepKind, value: &Value) -> Result<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| PrepError::invalid_step(kind.key(), value, "expected a finite number"))
}

fn parse_limits(value: &Value) -> Result<(Option<f64>, Option<f64>)> {
    let bound = |v: &Value| -> Result<Option<f64>> {
        match v {
            Value::Null => Ok(None),
            other => parse_number(&StepKind::Limits, other).map(Some),
        }
    };

    match value.as_array().map(Vec::as_slice) {
        Some([low, high]) => Ok((bound(low)?, bound(high)?)),
        _ => Err(PrepError::invalid_step(
            "limits",
            value,
            "expected a two-element array [low, high]",
        )),
    }
}
