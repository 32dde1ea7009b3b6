//! Declared output types of configured features

use crate::error::PrepError;
use polars::prelude::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target type a feature column is cast to after the pipeline runs.
///
/// Parsed case-insensitively from the `type` label of a feature configuration,
/// accepting the common aliases (`int`, `float`, `str`, `object`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FeatureType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Text,
    Bool,
}

impl FeatureType {
    /// Canonical label, the one written back when a configuration is serialized
    pub fn label(&self) -> &'static str {
        match self {
            FeatureType::Int8 => "int8",
            FeatureType::Int16 => "int16",
            FeatureType::Int32 => "int32",
            FeatureType::Int64 => "int64",
            FeatureType::UInt8 => "uint8",
            FeatureType::UInt16 => "uint16",
            FeatureType::UInt32 => "uint32",
            FeatureType::UInt64 => "uint64",
            FeatureType::Float32 => "float32",
            FeatureType::Float64 => "float64",
            FeatureType::Text => "string",
            FeatureType::Bool => "bool",
        }
    }

    /// Integer types are rounded before casting
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FeatureType::Int8
                | FeatureType::Int16
                | FeatureType::Int32
                | FeatureType::Int64
                | FeatureType::UInt8
                | FeatureType::UInt16
                | FeatureType::UInt32
                | FeatureType::UInt64
        )
    }

    /// Textual types take string fill values for constant imputation
    pub fn is_textual(&self) -> bool {
        matches!(self, FeatureType::Text)
    }

    /// Polars data type the output column is cast to
    pub fn dtype(&self) -> DataType {
        match self {
            FeatureType::Int8 => DataType::Int8,
            FeatureType::Int16 => DataType::Int16,
            FeatureType::Int32 => DataType::Int32,
            FeatureType::Int64 => DataType::Int64,
            FeatureType::UInt8 => DataType::UInt8,
            FeatureType::UInt16 => DataType::UInt16,
            FeatureType::UInt32 => DataType::UInt32,
            FeatureType::UInt64 => DataType::UInt64,
            FeatureType::Float32 => DataType::Float32,
            FeatureType::Float64 => DataType::Float64,
            FeatureType::Text => DataType::String,
            FeatureType::Bool => DataType::Boolean,
        }
    }
}

impl FromStr for FeatureType {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "int" | "integer" | "int64" => Ok(FeatureType::Int64),
            "int8" => Ok(FeatureType::Int8),
            "int16" => Ok(FeatureType::Int16),
            "int32" => Ok(FeatureType::Int32),
            "uint8" => Ok(FeatureType::UInt8),
            "uint16" => Ok(FeatureType::UInt16),
            "uint32" => Ok(FeatureType::UInt32),
            "uint64" => Ok(FeatureType::UInt64),
            "float" | "float64" | "double" => Ok(FeatureType::Float64),
            "float32" => Ok(FeatureType::Float32),
            "str" | "string" | "object" | "category" => Ok(FeatureType::Text),
            "bool" | "boolean" => Ok(FeatureType::Bool),
            other => Err(PrepError::ConfigError(format!(
                "unsupported feature type '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for FeatureType {
    type Error = PrepError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FeatureType> for String {
    fn from(value: FeatureType) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
