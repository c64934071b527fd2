//! Transformation options and target capability flags.
//!
//! Options are known before any output target is chosen and gate the
//! pre-target passes. [`TargetFeatures`] arrives once the target is known
//! and drives the second pass of each transformer.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Toggles for the model transformation passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelTransformOptions {
    /// Hoist properties shared by all subtypes into their supertype.
    pub elevate_properties: bool,
    /// Replace sibling types that differ per property type with a generic supertype.
    pub generify_types: bool,
    /// Collapse nullable unions and redundant intersection members.
    pub simplify_type_hierarchy: bool,
    /// Allow primitives that need boxing to become generic arguments.
    pub generification_box_allowed: bool,
    /// Upper bound (exclusive) on distinct literal types folded into a union.
    pub literal_union_max_count: usize,
}

impl ModelTransformOptions {
    pub fn new() -> Self {
        Self {
            elevate_properties: true,
            generify_types: true,
            simplify_type_hierarchy: true,
            generification_box_allowed: true,
            literal_union_max_count: 5,
        }
    }

    /// Options with every pass switched off.
    pub fn disabled() -> Self {
        Self {
            elevate_properties: false,
            generify_types: false,
            simplify_type_hierarchy: false,
            ..Self::new()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, CoreError> {
        toml::from_str(source).map_err(|e| CoreError::Config(e.to_string()))
    }
}

impl Default for ModelTransformOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// What the output target can express natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetFeatures {
    pub primitive_generics: bool,
    pub literal_types: bool,
    pub primitive_inheritance: bool,
}

impl TargetFeatures {
    /// The least capable target; used before a target is known.
    pub const GENERIC: TargetFeatures = TargetFeatures {
        primitive_generics: false,
        literal_types: false,
        primitive_inheritance: false,
    };

    pub fn from_toml_str(source: &str) -> Result<Self, CoreError> {
        toml::from_str(source).map_err(|e| CoreError::Config(e.to_string()))
    }
}

impl Default for TargetFeatures {
    fn default() -> Self {
        Self::GENERIC
    }
}

/// Combined configuration document with `[options]` and `[features]` tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub options: ModelTransformOptions,
    pub features: TargetFeatures,
}

impl TransformConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, CoreError> {
        toml::from_str(source).map_err(|e| CoreError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_every_pass() {
        let options = ModelTransformOptions::default();
        assert!(options.elevate_properties);
        assert!(options.generify_types);
        assert!(options.simplify_type_hierarchy);
        assert!(options.generification_box_allowed);
        assert_eq!(options.literal_union_max_count, 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options = ModelTransformOptions::from_toml_str("generifyTypes = false\n").unwrap();
        assert!(!options.generify_types);
        assert!(options.elevate_properties);
    }

    #[test]
    fn test_combined_config() {
        let config = TransformConfig::from_toml_str(
            r#"
            [options]
            literalUnionMaxCount = 3

            [features]
            literalTypes = true
            "#,
        )
        .unwrap();
        assert_eq!(config.options.literal_union_max_count, 3);
        assert!(config.features.literal_types);
        assert!(!config.features.primitive_generics);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = TargetFeatures::from_toml_str("literalTypes = 3").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
