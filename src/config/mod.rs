//! Per-feature preprocessing configuration
//!
//! A configuration is an ordered list of feature objects. Besides the
//! `name`, `type` and optional `active` attributes, every other key of a
//! feature object is a step declaration, and the order in which the keys
//! appear in the document is the order in which the steps run:
//!
//! ```json
//! [
//!   {"name": "age", "type": "int", "imputation_strategy": "median", "limits": [0, 120]},
//!   {"name": "income", "type": "float", "transformation": "log1p", "scaler": "standard"},
//!   {"name": "notes", "type": "string", "active": false}
//! ]
//! ```

mod feature_type;

pub use feature_type::FeatureType;

use crate::error::{PrepError, Result};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Keys accepted in a feature object that never become pipeline steps
pub const INERT_KEYS: [&str; 2] = ["encode", "polynomial_degree"];

/// A single `key: value` step attached to a feature
#[derive(Debug, Clone, PartialEq)]
pub struct StepDeclaration {
    pub key: String,
    pub value: Value,
}

impl StepDeclaration {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Configuration of one feature column
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    /// Column name, unique across the configuration
    pub name: String,
    /// Type the output column is cast to
    pub feature_type: FeatureType,
    /// Inactive features are dropped from fit and transform
    pub active: bool,
    /// Declared steps, in declaration order
    pub steps: Vec<StepDeclaration>,
    /// Inert keys (`encode`, `polynomial_degree`) carried along untouched
    pub metadata: Vec<StepDeclaration>,
}

impl FeatureConfig {
    /// Create an active feature without steps
    pub fn new(name: impl Into<String>, feature_type: FeatureType) -> Self {
        Self {
            name: name.into(),
            feature_type,
            active: true,
            steps: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Builder method to append a step declaration
    pub fn with_step(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let step = StepDeclaration::new(key, value);
        if INERT_KEYS.contains(&step.key.as_str()) {
            self.metadata.push(step);
        } else {
            self.steps.push(step);
        }
        self
    }

    /// Builder method to set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Builder method to deactivate the feature
    pub fn inactive(self) -> Self {
        self.with_active(false)
    }
}

/// Check that every feature name appears once.
pub fn validate_features(features: &[FeatureConfig]) -> Result<()> {
    let mut seen = HashSet::with_capacity(features.len());
    for feature in features {
        if !seen.insert(feature.name.as_str()) {
            return Err(PrepError::ConfigError(format!(
                "feature '{}' is configured more than once",
                feature.name
            )));
        }
    }
    Ok(())
}

/// Parse a configuration document.
///
/// Accepts either a bare array of feature objects or `{"features": [...]}`.
pub fn parse_features_config(json: &str) -> Result<Vec<FeatureConfig>> {
    let ConfigDocument(features) =
        serde_json::from_str(json).map_err(|e| PrepError::ConfigError(e.to_string()))?;
    validate_features(&features)?;
    Ok(features)
}

/// Load a configuration document from disk.
pub fn load_features_config(path: impl AsRef<Path>) -> Result<Vec<FeatureConfig>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let features = parse_features_config(&json)?;
    tracing::debug!(path = %path.display(), features = features.len(), "Loaded feature configuration");
    Ok(features)
}

impl Serialize for FeatureConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + self.steps.len() + self.metadata.len()))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.feature_type)?;
        map.serialize_entry("active", &self.active)?;
        for step in self.steps.iter().chain(&self.metadata) {
            map.serialize_entry(&step.key, &step.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FeatureConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(FeatureConfigVisitor)
    }
}

// Walks the object key by key so steps keep their document order.
struct FeatureConfigVisitor;

impl<'de> Visitor<'de> for FeatureConfigVisitor {
    type Value = FeatureConfig;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a feature configuration object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<FeatureConfig, A::Error> {
        let mut name: Option<String> = None;
        let mut feature_type: Option<FeatureType> = None;
        let mut active: Option<bool> = None;
        let mut steps: Vec<StepDeclaration> = Vec::new();
        let mut metadata: Vec<StepDeclaration> = Vec::new();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "name" => {
                    if name.is_some() {
                        return Err(de::Error::duplicate_field("name"));
                    }
                    name = Some(map.next_value()?);
                }
                "type" => {
                    if feature_type.is_some() {
                        return Err(de::Error::duplicate_field("type"));
                    }
                    feature_type = Some(map.next_value()?);
                }
                "active" => {
                    if active.is_some() {
                        return Err(de::Error::duplicate_field("active"));
                    }
                    active = Some(map.next_value::<Option<bool>>()?.unwrap_or(true));
                }
                _ => {
                    let target = if INERT_KEYS.contains(&key.as_str()) {
                        &mut metadata
                    } else {
                        &mut steps
                    };
                    if target.iter().any(|step| step.key == key) {
                        return Err(de::Error::custom(format!("duplicate step '{key}'")));
                    }
                    let value: Value = map.next_value()?;
                    target.push(StepDeclaration { key, value });
                }
            }
        }

        Ok(FeatureConfig {
            name: name.ok_or_else(|| de::Error::missing_field("name"))?,
            feature_type: feature_type.ok_or_else(|| de::Error::missing_field("type"))?,
            active: active.unwrap_or(true),
            steps,
            metadata,
        })
    }
}

/// Top-level configuration document, bare or wrapped in `{"features": ...}`
struct ConfigDocument(Vec<FeatureConfig>);

impl<'de> Deserialize<'de> for ConfigDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ConfigDocumentVisitor)
    }
}

// Both shapes are visited directly so a bad feature reports its own error.
struct ConfigDocumentVisitor;

impl<'de> Visitor<'de> for ConfigDocumentVisitor {
    type Value = ConfigDocument;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of feature objects or an object with a \"features\" array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<ConfigDocument, A::Error> {
        let mut features = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(feature) = seq.next_element::<FeatureConfig>()? {
            features.push(feature);
        }
        Ok(ConfigDocument(features))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<ConfigDocument, A::Error> {
        let mut features: Option<Vec<FeatureConfig>> = None;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "features" => {
                    if features.is_some() {
                        return Err(de::Error::duplicate_field("features"));
                    }
                    features = Some(map.next_value()?);
                }
                other => return Err(de::Error::unknown_field(other, &["features"])),
            }
        }
        features
            .map(ConfigDocument)
            .ok_or_else(|| de::Error::missing_field("features"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_steps_keep_document_order() {
        let config: FeatureConfig = serde_json::from_str(
            r#"{"name": "a", "weight": 2.0, "type": "float", "limits": [0, 1], "encode": true, "scaler": "robust"}"#,
        )
        .unwrap();

        let keys: Vec<&str> = config.steps.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["weight", "limits", "scaler"]);
        assert_eq!(config.metadata.len(), 1);
        assert_eq!(config.metadata[0].key, "encode");
        assert_eq!(config.steps[1].value, json!([0, 1]));
    }

    #[test]
    fn test_active_defaults_to_true() {
        let config: FeatureConfig = serde_json::from_str(r#"{"name": "a", "type": "int"}"#).unwrap();
        assert!(config.active);
        assert!(config.steps.is_empty());

        let config: FeatureConfig =
            serde_json::from_str(r#"{"name": "a", "type": "int", "active": false}"#).unwrap();
        assert!(!config.active);
    }

    #[test]
    fn test_missing_name_or_type_fails() {
        assert!(serde_json::from_str::<FeatureConfig>(r#"{"type": "int"}"#).is_err());
        assert!(serde_json::from_str::<FeatureConfig>(r#"{"name": "a"}"#).is_err());
    }

    #[test]
    fn test_duplicate_step_fails() {
        let result = serde_json::from_str::<FeatureConfig>(
            r#"{"name": "a", "type": "int", "scaler": "standard", "scaler": "robust"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_roundtrip_keeps_order() {
        let config = FeatureConfig::new("x", FeatureType::Float64)
            .with_step("scaler", "min_max")
            .with_step("limits", json!([0.0, 1.0]))
            .with_step("polynomial_degree", 2)
            .inactive();

        let json = serde_json::to_string(&config).unwrap();
        let restored: FeatureConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_parse_wrapped_document() {
        let features = parse_features_config(
            r#"{"features": [{"name": "a", "type": "int"}, {"name": "b", "type": "str"}]}"#,
        )
        .unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[1].feature_type, FeatureType::Text);
    }

    #[test]
    fn test_document_errors_name_the_problem() {
        let cases = [
            (r#"[{"name": "a", "type": "decimal"}]"#, "decimal"),
            (r#"[{"name": "a"}]"#, "missing field `type`"),
            (r#"{"features": [{"type": "int"}]}"#, "missing field `name`"),
            (r#"{"feature": []}"#, "unknown field `feature`"),
            (r#"{}"#, "missing field `features`"),
            (r#""features""#, "an array of feature objects"),
        ];
        for (json, expected) in cases {
            let err = parse_features_config(json).unwrap_err();
            assert!(matches!(err, PrepError::ConfigError(_)), "{json}: {err}");
            assert!(err.to_string().contains(expected), "{json}: {err}");
        }
    }

    #[test]
    fn test_duplicate_feature_names_rejected() {
        let err = parse_features_config(
            r#"[{"name": "a", "type": "int"}, {"name": "a", "type": "float"}]"#,
        )
        .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"[{{"name": "a", "type": "float", "limits": [0, 10]}}]"#).unwrap();
        tmp.flush().unwrap();

        let features = load_features_config(tmp.path()).unwrap();
        assert_eq!(features[0].steps[0].key, "limits");
    }
}
