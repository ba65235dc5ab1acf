//! Project configuration
//!
//! Feature fragments and the build environment are read from a TOML
//! project file in three layers, later layers winning per package name:
//! 1. `[features]` table
//! 2. `custom_feature.<NAME>` keys in `[env]`
//! 3. `--set NAME=FRAGMENT` on the command line

mod overrides;
mod project;

use std::io;
use std::path::PathBuf;

pub use overrides::{collect_env_overrides, parse_cli_override, FeatureOverride, OVERRIDE_PREFIX};
pub use project::{EnvSection, ProjectConfig, DEFAULT_CONFIG_PATH};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),
}
