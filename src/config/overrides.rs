//! Per-build feature overrides
//!
//! Overrides are fragments keyed by a prefixed option name, e.g.
//! `"custom_feature.TMC_UART" = "TMCStepper@0.8.0"`. They are merged after
//! the `[features]` table.

use indexmap::IndexMap;

use super::ConfigError;

/// Option prefix marking a feature override
pub const OVERRIDE_PREFIX: &str = "custom_feature";

/// One override fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOverride {
    /// Feature name as written (normalized during ingestion)
    pub feature: String,
    /// Raw fragment text
    pub fragment: String,
}

impl FeatureOverride {
    pub fn new(feature: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            fragment: fragment.into(),
        }
    }
}

/// Collect overrides from the unrecognized keys of `[env]`.
///
/// Both spellings are accepted: a quoted `"custom_feature.NAME"` key and a
/// `[env.custom_feature]` sub-table. Empty values are skipped.
pub fn collect_env_overrides(
    extra: &IndexMap<String, toml::Value>,
) -> Result<Vec<FeatureOverride>, ConfigError> {
    let mut overrides = Vec::new();

    for (key, value) in extra {
        if key == OVERRIDE_PREFIX {
            let toml::Value::Table(table) = value else {
                return Err(ConfigError::Validation(format!(
                    "'{}' must be a table of feature fragments",
                    OVERRIDE_PREFIX
                )));
            };
            for (feature, fragment) in table {
                push_override(&mut overrides, feature, fragment)?;
            }
        } else if let Some(feature) = key
            .strip_prefix(OVERRIDE_PREFIX)
            .and_then(|rest| rest.strip_prefix('.'))
        {
            push_override(&mut overrides, feature, value)?;
        } else {
            log::debug!("Ignoring unknown env option '{}'", key);
        }
    }

    Ok(overrides)
}

fn push_override(
    overrides: &mut Vec<FeatureOverride>,
    feature: &str,
    value: &toml::Value,
) -> Result<(), ConfigError> {
    if feature.is_empty() {
        return Err(ConfigError::Validation(format!(
            "'{}.' override is missing a feature name",
            OVERRIDE_PREFIX
        )));
    }
    let Some(fragment) = value.as_str() else {
        return Err(ConfigError::Validation(format!(
            "{}.{} must be a string, got {}",
            OVERRIDE_PREFIX,
            feature,
            value.type_str()
        )));
    };
    if fragment.trim().is_empty() {
        return Ok(());
    }
    log::info!("{}.{} = '{}'", OVERRIDE_PREFIX, feature.to_uppercase(), fragment);
    overrides.push(FeatureOverride::new(feature, fragment));
    Ok(())
}

/// Parse a `NAME=FRAGMENT` command-line override
pub fn parse_cli_override(arg: &str) -> Result<FeatureOverride, ConfigError> {
    match arg.split_once('=') {
        Some((feature, fragment)) if !feature.trim().is_empty() => {
            Ok(FeatureOverride::new(feature.trim(), fragment))
        }
        _ => Err(ConfigError::Validation(format!(
            "override '{}' must have the form NAME=FRAGMENT",
            arg
        ))),
    }
}
